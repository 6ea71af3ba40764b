// src/telemetry.rs
// Wires up the tracing subscriber, with verbosity selected from RUST_LOG.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber. Safe to call more than once
/// (from tests, for example) — later calls are ignored rather than
/// panicking.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
