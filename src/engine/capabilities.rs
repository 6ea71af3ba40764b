// src/engine/capabilities.rs
// Capability interfaces injected into the engine: the LLM invoker, the
// tool invoker, the optional follow-up prompter, and the step sink. The
// core makes no assumption about their internals beyond these contracts.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::model::message::ChatMessage;
use crate::model::step::AgentStep;

#[derive(Debug, Clone)]
pub struct LlmCallOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub tokens: u64,
    pub cost_usd: f64,
}

#[async_trait]
pub trait LlmInvoker: Send + Sync {
    async fn invoke(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        options: &LlmCallOptions,
    ) -> anyhow::Result<LlmResponse>;
}

#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(
        &self,
        tool_name: &str,
        input: &HashMap<String, String>,
    ) -> anyhow::Result<String>;
}

#[async_trait]
pub trait FollowupPrompter: Send + Sync {
    async fn ask(
        &self,
        run_id: &str,
        question: &str,
        options: Option<&[String]>,
    ) -> anyhow::Result<String>;
}

#[async_trait]
pub trait StepSink: Send + Sync {
    async fn emit(&self, run_id: &str, step: AgentStep);
}
