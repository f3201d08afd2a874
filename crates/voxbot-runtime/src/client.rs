//! [`ActionExecutionClient`] – the facade every action goes through.
//!
//! ```text
//!  execute(action)
//!     │
//!     ├── type empty?            → failure("Missing action type")
//!     ├── local handler exists?  → HandlerRegistry::invoke
//!     └── otherwise              → Transport::execute (ws/wss → duplex, else HTTP)
//! ```
//!
//! `execute` never returns an error or panics; the outcome is always an
//! [`ActionResult`].

use std::sync::Arc;

use tracing::{debug, info};
use voxbot_handlers::HandlerRegistry;
use voxbot_transport::{Transport, TransportConfig, transport_for};
use voxbot_types::{Action, ActionResult, ConnectionState, TransportKind, VoxError};

pub struct ActionExecutionClient {
    registry: HandlerRegistry,
    transport: Arc<dyn Transport>,
}

impl ActionExecutionClient {
    /// Build a client whose remote transport is chosen from
    /// `config.endpoint`.
    ///
    /// Nothing is connected here; the duplex transport starts its worker on
    /// the first remote call.
    ///
    /// # Errors
    ///
    /// Returns [`VoxError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: TransportConfig, registry: HandlerRegistry) -> Result<Self, VoxError> {
        info!(
            endpoint = %config.endpoint,
            local_handlers = registry.len(),
            "action execution client configured"
        );
        let transport = transport_for(config)?;
        Ok(Self::with_transport(registry, transport))
    }

    /// Build a client around an existing transport.
    pub fn with_transport(registry: HandlerRegistry, transport: Arc<dyn Transport>) -> Self {
        Self { registry, transport }
    }

    /// Execute `action` locally if a handler is registered for its type,
    /// otherwise remotely.
    pub async fn execute(&self, action: &Action) -> ActionResult {
        if action.action_type.trim().is_empty() {
            return VoxError::MissingActionType.into();
        }

        if let Some(result) = self.registry.invoke(action) {
            debug!(action = %action.action_type, success = result.success, "handled locally");
            return result;
        }

        debug!(
            action = %action.action_type,
            transport = %self.transport.kind(),
            "no local handler; delegating to transport"
        );
        self.transport.execute(action).await
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// State of the persistent connection; `None` for HTTP.
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.transport.connection_state()
    }

    /// Release transport resources.  Local handlers keep working.
    pub async fn close(&self) {
        self.transport.close().await;
    }
}
