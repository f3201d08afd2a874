//! [`HandlerRegistry`] – local handler lookup and invocation boundary.
//!
//! The registry is an explicit object built once at startup and passed by
//! reference to the execution client, so tests can build isolated registries
//! holding exactly the handlers they need.
//!
//! [`HandlerRegistry::invoke`] is the failure boundary: a handler returning
//! [`HandlerError`][crate::HandlerError] or panicking produces a failed
//! [`ActionResult`]; nothing escapes to the caller.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, info};
use voxbot_types::{Action, ActionResult};

use crate::builtin::{ExecuteTaskHandler, FetchInformationHandler, SearchHandler, SendMessageHandler};
use crate::handler::ActionHandler;

/// Action-type → local handler map.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the four built-in handlers.
    pub fn with_builtin_handlers() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(FetchInformationHandler));
        registry.register(Box::new(SendMessageHandler));
        registry.register(Box::new(ExecuteTaskHandler));
        registry.register(Box::new(SearchHandler));
        registry
    }

    /// Register a handler under its [`ActionHandler::action_type`].  Any
    /// previously registered handler for the same type is replaced.
    pub fn register(&mut self, handler: Box<dyn ActionHandler>) {
        self.handlers.insert(handler.action_type().to_string(), handler);
    }

    /// Return the handler for `action_type`, if any.
    pub fn lookup(&self, action_type: &str) -> Option<&dyn ActionHandler> {
        self.handlers.get(action_type).map(|h| h.as_ref())
    }

    /// `true` when a handler exists for `action_type`.
    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// Registered action types, sorted.
    pub fn action_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the local handler for `action`.
    ///
    /// Returns `None` when no handler is registered for the action type, so
    /// the caller can fall through to a remote transport.
    pub fn invoke(&self, action: &Action) -> Option<ActionResult> {
        let handler = self.lookup(&action.action_type)?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&action.parameters)));
        let result = match outcome {
            Ok(Ok(result)) => {
                info!(action = %action.action_type, success = result.success, "action executed locally");
                result
            }
            Ok(Err(e)) => {
                info!(action = %action.action_type, error = %e, "local handler rejected action");
                ActionResult::failure(e.to_string())
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!(action = %action.action_type, panic = %msg, "local handler panicked");
                ActionResult::failure(format!("Handler for '{}' failed: {msg}", action.action_type))
            }
        };
        Some(result)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use serde_json::json;
    use voxbot_types::Params;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    struct FixedHandler {
        kind: &'static str,
        tag: &'static str,
    }
    impl ActionHandler for FixedHandler {
        fn action_type(&self) -> &str {
            self.kind
        }
        fn handle(&self, _params: &Params) -> Result<ActionResult, HandlerError> {
            let mut data = Params::new();
            data.insert("tag".into(), json!(self.tag));
            Ok(ActionResult::ok(data))
        }
    }

    struct FailingHandler;
    impl ActionHandler for FailingHandler {
        fn action_type(&self) -> &str {
            "failing"
        }
        fn handle(&self, _params: &Params) -> Result<ActionResult, HandlerError> {
            Err(HandlerError::Internal("database offline".into()))
        }
    }

    struct PanickingHandler;
    impl ActionHandler for PanickingHandler {
        fn action_type(&self) -> &str {
            "panicking"
        }
        fn handle(&self, _params: &Params) -> Result<ActionResult, HandlerError> {
            panic!("index out of range")
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn builtin_registry_has_four_handlers() {
        let registry = HandlerRegistry::with_builtin_handlers();
        assert_eq!(
            registry.action_types(),
            vec!["execute_task", "fetch_information", "search", "send_message"]
        );
    }

    #[test]
    fn lookup_unknown_type_returns_none() {
        let registry = HandlerRegistry::new();
        assert!(registry.lookup("teleport").is_none());
        assert!(registry.invoke(&Action::new("teleport")).is_none());
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register(Box::new(FixedHandler { kind: "greet", tag: "first" }));
        registry.register(Box::new(FixedHandler { kind: "greet", tag: "second" }));
        assert_eq!(registry.len(), 1);

        let result = registry.invoke(&Action::new("greet")).unwrap();
        assert_eq!(result.data_field("tag"), Some(&json!("second")));
    }

    #[test]
    fn handler_error_becomes_failed_result() {
        let mut registry = HandlerRegistry::new();
        registry.register(Box::new(FailingHandler));
        let result = registry.invoke(&Action::new("failing")).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("database offline"));
    }

    #[test]
    fn handler_panic_is_caught_at_boundary() {
        let mut registry = HandlerRegistry::new();
        registry.register(Box::new(PanickingHandler));
        let result = registry.invoke(&Action::new("panicking")).unwrap();
        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("panicking"));
        assert!(error.contains("index out of range"));
    }

    #[test]
    fn search_without_query_fails_with_descriptive_error() {
        let registry = HandlerRegistry::with_builtin_handlers();
        let result = registry.invoke(&Action::new("search")).unwrap();
        assert_eq!(result, ActionResult::failure("Missing required parameter: query"));
    }
}
