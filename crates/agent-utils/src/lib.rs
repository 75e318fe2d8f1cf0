//! Shared utilities
//!
//! Tracing subscriber setup and small helpers for reading configuration
//! from the process environment.

pub mod config;
pub mod logging;

pub use config::{EnvError, env_parse, env_var, missing_vars};
pub use logging::{LogFormat, init_tracing};
