//! # Observability & Tracing
//!
//! Structured logging for the whole engine. Workspace and session
//! operations carry `#[instrument]` spans; the backend stores log with a
//! `record_type` field instead of module paths, which keeps lines short.
//!
//! ```bash
//! # Compact operational logs
//! RUST_LOG=info cargo test
//!
//! # Full payloads (patches, scopes) at operation entry points
//! RUST_LOG=debug cargo run
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // record_type fields replace module paths
        .compact()
        .init();
}
