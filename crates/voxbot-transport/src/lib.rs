//! `voxbot-transport` – delivery of actions to the remote execution service.
//!
//! Two transports implement the [`Transport`] trait; the endpoint scheme picks
//! one (see [`transport_for`]):
//!
//! | Scheme | Transport | Semantics |
//! |---|---|---|
//! | `ws://`, `wss://` | [`DuplexTransport`] | persistent auto-reconnecting WebSocket, correlated responses |
//! | anything else | [`HttpTransport`] | stateless JSON POST with bounded retries |
//!
//! # Modules
//!
//! - [`config`] – [`TransportConfig`]: endpoint, timeouts, retry and
//!   reconnect tuning.
//! - [`transport`] – the [`Transport`] trait and scheme-based selection.
//! - [`http`] – [`HttpTransport`].
//! - [`duplex`] – [`DuplexTransport`]: connection-state machine, outbound
//!   queue and inbound demultiplexer driven by one supervisor task.
//! - [`pending`] – [`PendingRequestTable`]: in-flight duplex requests keyed by
//!   correlation id.
//! - [`backoff`] – [`Backoff`] (reconnect delays) and [`CoolDownGuard`]
//!   (fail-fast window after a failed connect).

pub mod backoff;
pub mod config;
pub mod duplex;
pub mod http;
pub mod pending;
pub mod transport;

pub use backoff::{Backoff, CoolDownGuard};
pub use config::TransportConfig;
pub use duplex::DuplexTransport;
pub use http::HttpTransport;
pub use pending::{PendingRequestTable, PendingSlot};
pub use transport::{Transport, kind_for_endpoint, transport_for};
