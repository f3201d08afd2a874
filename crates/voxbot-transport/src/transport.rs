//! The [`Transport`] trait and endpoint-scheme selection.

use std::sync::Arc;

use async_trait::async_trait;
use voxbot_types::{Action, ActionResult, ConnectionState, TransportKind, VoxError};

use crate::config::TransportConfig;
use crate::duplex::DuplexTransport;
use crate::http::HttpTransport;

/// A delivery mechanism for actions that have no local handler.
///
/// # Contract
///
/// * `execute` is total: every failure (unreachable endpoint, timeout,
///   malformed reply) comes back as a failed [`ActionResult`], never as a
///   panic or error.
///
/// * `connection_state` is `None` for stateless transports.
///
/// * `close` releases background resources.  It is idempotent.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Which delivery mechanism this is.
    fn kind(&self) -> TransportKind;

    /// Deliver `action` and return the remote outcome.
    async fn execute(&self, action: &Action) -> ActionResult;

    /// Current state of a persistent connection, if the transport has one.
    fn connection_state(&self) -> Option<ConnectionState> {
        None
    }

    /// Shut down background work.
    async fn close(&self) {}
}

/// Pick the transport kind for `endpoint` from its URI scheme.
///
/// `ws` and `wss` (case-insensitive) select the duplex transport; every other
/// scheme, or no scheme at all, selects HTTP.
pub fn kind_for_endpoint(endpoint: &str) -> TransportKind {
    let scheme = endpoint
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase());
    match scheme.as_deref() {
        Some("ws") | Some("wss") => TransportKind::Duplex,
        _ => TransportKind::Http,
    }
}

/// Build the transport that `config.endpoint` calls for.
///
/// # Errors
///
/// Returns [`VoxError::Transport`] if the HTTP client cannot be constructed.
pub fn transport_for(config: TransportConfig) -> Result<Arc<dyn Transport>, VoxError> {
    match kind_for_endpoint(&config.endpoint) {
        TransportKind::Duplex => Ok(Arc::new(DuplexTransport::new(config))),
        TransportKind::Http => Ok(Arc::new(HttpTransport::new(config)?)),
    }
}
