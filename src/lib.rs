// src/lib.rs

pub mod cancellation;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod retry;
pub mod session;
pub mod telemetry;

pub use config::CONFIG;
pub use engine::{AgentLoopEngine, EngineInput};
pub use error::EngineError;
pub use model::loop_config::{Language, LoopConfig, LoopResult};
pub use model::message::{ChatMessage, Content, Part, Role};
pub use model::step::{AgentStep, StepStatus};
pub use model::tool::ToolSchema;
pub use telemetry::init_tracing;
