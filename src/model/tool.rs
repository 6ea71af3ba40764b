// src/model/tool.rs
// Tool schema the parser and prompt builder both consume.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(
        mut self,
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.params.push(ToolParam {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required,
        });
        self
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ToolParam> {
        self.params.iter().filter(|p| p.required)
    }

    /// Returns the names of required parameters missing from `provided`.
    pub fn missing_required(&self, provided: &HashMap<String, String>) -> Vec<String> {
        self.required_params()
            .filter(|p| !provided.contains_key(&p.name))
            .map(|p| p.name.clone())
            .collect()
    }
}
