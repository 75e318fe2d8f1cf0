//! Environment configuration helpers

use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading configuration from the environment
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EnvError {
    /// A variable is set but does not parse
    #[error("{name}={value:?} is invalid: {reason}")]
    Invalid {
        /// Variable name
        name: String,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },
}

/// Read a variable, treating unset and blank values alike
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse a variable; `Ok(None)` when it is unset or blank
pub fn env_parse<T>(name: &str) -> Result<Option<T>, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(name)
        .map(|value| {
            value.parse::<T>().map_err(|e| EnvError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

/// Names from `required` that are unset or blank, in the given order
pub fn missing_vars(required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| env_var(name).is_none())
        .map(|name| (*name).to_string())
        .collect()
}
