// src/model/loop_config.rs

use serde::{Deserialize, Serialize};

use super::message::ChatMessage;
use super::step::AgentStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub max_iterations: usize,
    pub max_tokens: usize,
    pub temperature: f32,
    pub tool_names: Vec<String>,
    pub base_role_prompt: String,
    pub language: Language,
}

impl LoopConfig {
    pub fn new(base_role_prompt: impl Into<String>) -> Self {
        Self {
            max_iterations: 10,
            max_tokens: 4096,
            temperature: 0.7,
            tool_names: Vec::new(),
            base_role_prompt: base_role_prompt.into(),
            language: Language::En,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoopResult {
    pub final_answer: String,
    pub steps: Vec<AgentStep>,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub iterations_used: usize,
    pub history: Vec<ChatMessage>,
}
