// src/model/step.rs
// Step events published by the engine to the injected step sink.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Thinking,
    Acting,
    Observing,
    Done,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentStep {
    pub index: usize,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
}

impl Default for StepStatus {
    fn default() -> Self {
        StepStatus::Thinking
    }
}

impl AgentStep {
    pub fn thinking(index: usize, reasoning: Option<String>) -> Self {
        Self {
            index,
            status: StepStatus::Thinking,
            reasoning,
            ..Default::default()
        }
    }

    pub fn acting(index: usize, tool_name: impl Into<String>, tool_input: Value) -> Self {
        Self {
            index,
            status: StepStatus::Acting,
            tool_name: Some(tool_name.into()),
            tool_input: Some(tool_input),
            ..Default::default()
        }
    }

    pub fn observing(index: usize, tool_name: impl Into<String>, observation: impl Into<String>) -> Self {
        Self {
            index,
            status: StepStatus::Observing,
            tool_name: Some(tool_name.into()),
            observation: Some(observation.into()),
            ..Default::default()
        }
    }

    pub fn done(index: usize, final_answer: impl Into<String>) -> Self {
        Self {
            index,
            status: StepStatus::Done,
            final_answer: Some(final_answer.into()),
            ..Default::default()
        }
    }

    pub fn error(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            status: StepStatus::Error,
            observation: Some(message.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_step_carries_final_answer() {
        let step = AgentStep::done(3, "42");
        assert_eq!(step.status, StepStatus::Done);
        assert_eq!(step.final_answer.as_deref(), Some("42"));
    }
}
