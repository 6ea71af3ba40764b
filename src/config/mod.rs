// src/config/mod.rs

pub mod helpers;

use helpers::{env_f64, env_u64, env_usize};
use lazy_static::lazy_static;

use crate::model::loop_config::Language;

lazy_static! {
    pub static ref CONFIG: RuntimeConfig = RuntimeConfig::from_env();
}

/// Runtime tunables for the agent loop, overridable via environment variables.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub forced_completion_max_attempts: usize,
    pub forced_completion_base_delay_ms: u64,
    pub soft_budget_ratio: f64,
    pub quarter_severity_multiplier: f64,
    pub token_chars_per_token: usize,
    pub mistake_threshold: usize,
    pub default_language: Language,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            retry_max_attempts: env_usize("AGENT_RETRY_MAX_ATTEMPTS", 3),
            retry_base_delay_ms: env_u64("AGENT_RETRY_BASE_DELAY_MS", 2_000),
            forced_completion_max_attempts: env_usize("AGENT_FORCED_COMPLETION_MAX_ATTEMPTS", 2),
            forced_completion_base_delay_ms: env_u64(
                "AGENT_FORCED_COMPLETION_BASE_DELAY_MS",
                1_000,
            ),
            soft_budget_ratio: env_f64("AGENT_SOFT_BUDGET_RATIO", 0.8),
            quarter_severity_multiplier: env_f64("AGENT_QUARTER_SEVERITY_MULTIPLIER", 2.0),
            token_chars_per_token: env_usize("AGENT_TOKEN_CHARS_PER_TOKEN", 4),
            mistake_threshold: env_usize("AGENT_MISTAKE_THRESHOLD", 3),
            default_language: match helpers::env_or("AGENT_DEFAULT_LANGUAGE", "en").as_str() {
                "zh" => Language::Zh,
                _ => Language::En,
            },
        }
    }
}
