//! The [`ActionHandler`] trait and parameter helpers.

use serde_json::Value;
use thiserror::Error;
use voxbot_types::{ActionResult, Params};

/// Errors a handler may return.  The registry turns each one into a failed
/// [`ActionResult`] whose `error` is the `Display` text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter '{name}': expected {expected}")]
    InvalidParameter { name: String, expected: &'static str },

    #[error("{0}")]
    Internal(String),
}

/// A handler that satisfies one action type in-process.
///
/// Implementations are constructed once at startup and shared, so they must
/// be `Send + Sync` and take `&self`.
pub trait ActionHandler: Send + Sync {
    /// The action type this handler answers to (e.g. `"search"`).
    fn action_type(&self) -> &str;

    /// Execute the action with `params`.
    fn handle(&self, params: &Params) -> Result<ActionResult, HandlerError>;
}

/// Fetch a required string parameter.  Absent, `null` and empty strings all
/// count as missing.
pub fn required_str<'a>(params: &'a Params, name: &str) -> Result<&'a str, HandlerError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(HandlerError::MissingParameter(name.to_string())),
        Some(Value::String(s)) if s.is_empty() => {
            Err(HandlerError::MissingParameter(name.to_string()))
        }
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(HandlerError::InvalidParameter {
            name: name.to_string(),
            expected: "a string",
        }),
    }
}

/// Fetch an optional non-negative integer parameter.
pub fn optional_u64(params: &Params, name: &str) -> Result<Option<u64>, HandlerError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| HandlerError::InvalidParameter {
            name: name.to_string(),
            expected: "a non-negative integer",
        }),
    }
}
