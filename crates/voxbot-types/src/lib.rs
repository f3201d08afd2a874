//! `voxbot-types` – shared vocabulary for the voxbot workspace.
//!
//! Every crate speaks in terms of [`Action`] (a typed unit of work) and
//! [`ActionResult`] (its normalised outcome).  The wire envelopes used by the
//! remote execution service and the workspace-wide [`VoxError`] also live
//! here.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Parameter mapping carried by an [`Action`] and the `data` of an
/// [`ActionResult`].
pub type Params = Map<String, Value>;

/// Error message used when a remote peer reports `success: false` without an
/// `error` string.
pub const DEFAULT_REMOTE_ERROR: &str = "Remote action failed";

// ─────────────────────────────────────────────────────────────────────────────
// Action
// ─────────────────────────────────────────────────────────────────────────────

/// A typed unit of work: a string type and a parameter mapping.
///
/// Actions are immutable once submitted; executors only ever borrow them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub parameters: Params,
}

impl Action {
    /// Create an action with an empty parameter mapping.
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            parameters: Params::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ActionResult
// ─────────────────────────────────────────────────────────────────────────────

/// Normalised outcome of executing an [`Action`].
///
/// `success == false` always carries an `error`.  The constructors enforce
/// this, and deserialisation fills [`DEFAULT_REMOTE_ERROR`] when a peer
/// omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireResult")]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Params>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    /// A successful result carrying `data`.
    pub fn ok(data: Params) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed result carrying `error`.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Look up a field of `data`.
    pub fn data_field(&self, name: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(name))
    }
}

impl From<VoxError> for ActionResult {
    fn from(err: VoxError) -> Self {
        Self::failure(err.to_string())
    }
}

#[derive(Deserialize)]
struct WireResult {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Params>,
    #[serde(default)]
    error: Option<String>,
}

impl From<WireResult> for ActionResult {
    fn from(w: WireResult) -> Self {
        let error = match (w.success, w.error) {
            (false, None) => Some(DEFAULT_REMOTE_ERROR.to_string()),
            (_, e) => e,
        };
        Self {
            success: w.success,
            data: w.data,
            error,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// Outbound request body.  `id` is present only on the duplex transport.
#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub action: &'a str,
    pub parameters: &'a Params,
}

impl<'a> RequestEnvelope<'a> {
    /// Envelope for the stateless HTTP transport (no correlation id).
    pub fn http(action: &'a Action) -> Self {
        Self {
            id: None,
            action: &action.action_type,
            parameters: &action.parameters,
        }
    }

    /// Envelope for the duplex transport, tagged with correlation `id`.
    pub fn duplex(id: u64, action: &'a Action) -> Self {
        Self {
            id: Some(id),
            action: &action.action_type,
            parameters: &action.parameters,
        }
    }
}

/// Inbound response frame: an echoed correlation id plus an [`ActionResult`].
#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub result: ActionResult,
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection state / transport kind
// ─────────────────────────────────────────────────────────────────────────────

/// State of the persistent duplex connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Which delivery mechanism reaches the remote execution service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Persistent WebSocket connection (`ws://`, `wss://`).
    Duplex,
    /// Stateless HTTP POST.
    Http,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Duplex => write!(f, "websocket"),
            TransportKind::Http => write!(f, "http"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Emotion
// ─────────────────────────────────────────────────────────────────────────────

/// Emotional colouring applied to synthesised speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Surprised,
    Concerned,
}

impl Emotion {
    /// Parse a label, falling back to [`Emotion::Neutral`] for anything
    /// unrecognised.  Agent-state aliases (`greeting`, `error`, …) map to the
    /// emotion they are voiced with.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "happy" | "greeting" | "success" => Emotion::Happy,
            "sad" | "apology" => Emotion::Sad,
            "angry" => Emotion::Angry,
            "surprised" => Emotion::Surprised,
            "concerned" | "error" | "warning" => Emotion::Concerned,
            _ => Emotion::Neutral,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Surprised => "surprised",
            Emotion::Concerned => "concerned",
        };
        f.write_str(s)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Workspace-wide error type.  Nothing of this type crosses an `execute()`
/// boundary; it is converted into a failed [`ActionResult`] first.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoxError {
    #[error("Missing action type")]
    MissingActionType,

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Unsupported action type: {0}")]
    UnsupportedAction(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Language oracle error: {0}")]
    Oracle(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for VoxError {
    fn from(e: serde_json::Error) -> Self {
        VoxError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_serializes_type_field() {
        let action = Action::new("search").with_param("query", "rust");
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "search");
        assert_eq!(value["parameters"]["query"], "rust");
    }

    #[test]
    fn action_without_parameters_deserializes_to_empty_map() {
        let action: Action = serde_json::from_str(r#"{"type":"execute_task"}"#).unwrap();
        assert_eq!(action.action_type, "execute_task");
        assert!(action.parameters.is_empty());
    }

    #[test]
    fn failed_result_without_error_gets_default_message() {
        let result: ActionResult = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(DEFAULT_REMOTE_ERROR));
    }

    #[test]
    fn successful_result_keeps_data_verbatim() {
        let result: ActionResult =
            serde_json::from_str(r#"{"success":true,"data":{"x":1}}"#).unwrap();
        assert!(result.success);
        assert_eq!(result.data_field("x"), Some(&json!(1)));
        assert!(result.error.is_none());
    }

    #[test]
    fn failure_constructor_always_carries_error() {
        let result = ActionResult::failure("boom");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(result.data.is_none());
    }

    #[test]
    fn duplex_envelope_includes_id_http_envelope_does_not() {
        let action = Action::new("search").with_param("query", "weather");
        let duplex = serde_json::to_value(RequestEnvelope::duplex(7, &action)).unwrap();
        assert_eq!(duplex, json!({"id": 7, "action": "search", "parameters": {"query": "weather"}}));

        let http = serde_json::to_value(RequestEnvelope::http(&action)).unwrap();
        assert!(http.get("id").is_none());
        assert_eq!(http["action"], "search");
    }

    #[test]
    fn response_envelope_extracts_id_and_result() {
        let frame = r#"{"id":3,"success":true,"data":{"x":1}}"#;
        let env: ResponseEnvelope = serde_json::from_str(frame).unwrap();
        assert_eq!(env.id, Some(3));
        assert!(env.result.success);
        assert_eq!(env.result.data_field("x"), Some(&json!(1)));
    }

    #[test]
    fn response_envelope_rejects_non_integer_id() {
        let frame = r#"{"id":"abc","success":true}"#;
        assert!(serde_json::from_str::<ResponseEnvelope>(frame).is_err());
    }

    #[test]
    fn vox_error_converts_to_failed_result() {
        let result: ActionResult = VoxError::MissingParameter("query".into()).into();
        assert_eq!(result.error.as_deref(), Some("Missing required parameter: query"));
    }

    #[test]
    fn emotion_from_label_maps_aliases() {
        assert_eq!(Emotion::from_label("greeting"), Emotion::Happy);
        assert_eq!(Emotion::from_label("ERROR"), Emotion::Concerned);
        assert_eq!(Emotion::from_label("whatever"), Emotion::Neutral);
        assert_eq!(Emotion::Surprised.to_string(), "surprised");
    }
}
