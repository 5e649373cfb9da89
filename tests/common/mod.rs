//! Shared helpers for integration tests.
//!
//! - `fixtures`: provider response bodies, config files and a sandboxed home
//! - `logger`: per-test structured output with phases and timing
//! - `log_capture`: tracing layer for asserting on emitted logs

pub mod fixtures;
pub mod log_capture;
pub mod logger;
