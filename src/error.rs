// src/error.rs
// Terminal error taxonomy for the agent loop runtime.
//
// Everything recoverable (tool failure, format violation, missing
// parameter, cancellation, max-iteration exhaustion) is modelled as
// control flow inside the engine, never as an `Err` here. Internal
// fallible helpers that aren't part of the public contract use
// `anyhow::Result` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("LLM call failed after retries: {0}")]
    LlmFailed(#[source] anyhow::Error),

    #[error("session memory lock was poisoned for session {session_id}")]
    SessionLockPoisoned { session_id: String },

    #[error("a run is already active for session {session_id}")]
    SessionBusy { session_id: String },
}
