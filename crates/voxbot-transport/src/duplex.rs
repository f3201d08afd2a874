//! [`DuplexTransport`] – persistent, auto-reconnecting WebSocket transport.
//!
//! One supervisor task owns the connection.  Callers never touch the socket;
//! they talk to the supervisor through two shared structures:
//!
//! * an **outbound queue** (`mpsc`): callers push serialised requests, the
//!   supervisor's send path writes them in FIFO order;
//! * the [`PendingRequestTable`]: callers wait on a slot, the supervisor's
//!   receive path resolves it when a response with the matching `id` arrives.
//!
//! ```text
//!  caller ──execute()──▶ outbound queue ──▶ ┌──────────────┐ ──▶ remote
//!     ▲                                     │  supervisor  │
//!     └──── PendingRequestTable ◀────────── └──────────────┘ ◀── remote
//! ```
//!
//! # Connection lifecycle
//!
//! `Disconnected → Connecting → Connected → (drop) → Disconnected → …`
//!
//! The supervisor connects, then runs the send and receive paths inside one
//! `select!`; whichever finishes first tears both down.  It then sleeps an
//! exponential [`Backoff`] delay (reset after every successful connect) and
//! reconnects, until [`Transport::close`] stops it.  A caller waiting for a
//! connection wakes the supervisor out of its backoff sleep.
//!
//! # Delivery
//!
//! At-most-once.  A request already taken off the queue when the connection
//! drops is lost; its caller times out.  Responses for unknown or
//! already-resolved ids are logged and dropped.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};
use voxbot_types::{
    Action, ActionResult, ConnectionState, RequestEnvelope, ResponseEnvelope, TransportKind,
    VoxError,
};

use crate::backoff::{Backoff, CoolDownGuard};
use crate::config::TransportConfig;
use crate::pending::PendingRequestTable;
use crate::transport::Transport;

/// Returned while the cool-down window after a failed connect is open.
pub const COOL_DOWN_ERROR: &str = "WebSocket connection unavailable (skipping retry)";
/// Returned when no connection came up within the connect wait.
pub const CONNECT_FAILED_ERROR: &str = "Failed to establish WebSocket connection";
/// Returned when a sent request got no response within the overall timeout.
pub const TIMEOUT_ERROR: &str = "Timeout waiting for response";
/// Returned by `execute` after `close`.
pub const CLOSED_ERROR: &str = "WebSocket transport closed";

/// How long teardown waits for a close frame to go out.
const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_millis(500);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ─────────────────────────────────────────────────────────────────────────────
// Shared state
// ─────────────────────────────────────────────────────────────────────────────

/// Everything touched by both callers and the supervisor.
struct Shared {
    config: TransportConfig,
    pending: PendingRequestTable,
    outbound_tx: mpsc::UnboundedSender<String>,
    /// Held by the running supervisor for its whole lifetime.
    outbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    state: watch::Sender<ConnectionState>,
    stop: watch::Sender<bool>,
    connect_now: Notify,
    cool_down: Mutex<CoolDownGuard>,
    closed: AtomicBool,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn cool_down(&self) -> MutexGuard<'_, CoolDownGuard> {
        self.cool_down.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DuplexTransport
// ─────────────────────────────────────────────────────────────────────────────

/// WebSocket transport with request/response correlation.
///
/// Construction is cheap and does not need a Tokio runtime; the supervisor
/// task is spawned on the first [`execute`][Transport::execute] (or an
/// explicit [`start`][DuplexTransport::start]).
pub struct DuplexTransport {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DuplexTransport {
    pub fn new(config: TransportConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (stop, _) = watch::channel(false);
        let cool_down = CoolDownGuard::new(config.cool_down);
        Self {
            shared: Arc::new(Shared {
                config,
                pending: PendingRequestTable::new(),
                outbound_tx,
                outbound_rx: tokio::sync::Mutex::new(outbound_rx),
                state,
                stop,
                connect_now: Notify::new(),
                cool_down: Mutex::new(cool_down),
                closed: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.config.endpoint
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Observe connection-state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Number of requests still awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.len()
    }

    /// Spawn the supervisor if it is not running, or wake it out of its
    /// backoff sleep if it is.
    ///
    /// Must be called from within a Tokio runtime.  No-op after `close`.
    pub fn start(&self) {
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        let spawned = {
            let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            let running = worker.as_ref().is_some_and(|h| !h.is_finished());
            if !running {
                info!(endpoint = %self.shared.config.endpoint, "starting websocket connection worker");
                *worker = Some(tokio::spawn(run_supervisor(Arc::clone(&self.shared))));
            }
            !running
        };
        // A fresh worker connects straight away; a connecting or connected
        // one must not be left holding a wake-up permit.
        if !spawned && self.state() == ConnectionState::Disconnected {
            self.shared.connect_now.notify_one();
        }
    }

    async fn wait_for_connection(&self) -> bool {
        let mut state = self.shared.state.subscribe();
        let connected = state.wait_for(|s| s.is_connected());
        matches!(
            tokio::time::timeout(self.shared.config.connect_wait, connected).await,
            Ok(Ok(_))
        )
    }
}

#[async_trait]
impl Transport for DuplexTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Duplex
    }

    async fn execute(&self, action: &Action) -> ActionResult {
        if self.shared.closed.load(Ordering::SeqCst) {
            return ActionResult::failure(CLOSED_ERROR);
        }

        let now = Instant::now();
        if self.shared.cool_down().should_skip(now) {
            info!(action = %action.action_type, "skipping websocket connection attempt due to recent failure");
            return ActionResult::failure(COOL_DOWN_ERROR);
        }

        if !self.state().is_connected() {
            self.shared.cool_down().record_attempt(now);
            self.start();
            if !self.wait_for_connection().await {
                self.shared.cool_down().trip();
                warn!(
                    endpoint = %self.shared.config.endpoint,
                    waited_ms = self.shared.config.connect_wait.as_millis() as u64,
                    "websocket connection not established"
                );
                return ActionResult::failure(CONNECT_FAILED_ERROR);
            }
        }
        self.shared.cool_down().clear();

        let slot = self.shared.pending.register();
        let id = slot.id();
        let frame = match serde_json::to_string(&RequestEnvelope::duplex(id, action)) {
            Ok(frame) => frame,
            Err(e) => return VoxError::from(e).into(),
        };
        if self.shared.outbound_tx.send(frame).is_err() {
            return ActionResult::failure(CLOSED_ERROR);
        }
        debug!(id, action = %action.action_type, "request enqueued");

        match slot.wait(self.shared.config.timeout).await {
            Some(result) => result,
            None => {
                error!(
                    id,
                    action = %action.action_type,
                    still_pending = self.shared.pending.len(),
                    oldest_pending_ms = self.shared.pending.oldest_age().map(|age| age.as_millis() as u64),
                    "timeout waiting for response"
                );
                ActionResult::failure(TIMEOUT_ERROR)
            }
        }
    }

    fn connection_state(&self) -> Option<ConnectionState> {
        Some(self.state())
    }

    async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.stop.send_replace(true);

        let handle = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(mut handle) = handle {
            if tokio::time::timeout(self.shared.config.close_timeout, &mut handle)
                .await
                .is_err()
            {
                warn!("connection worker did not stop in time; aborting");
                handle.abort();
            }
        }

        self.shared.set_state(ConnectionState::Disconnected);
        info!(endpoint = %self.shared.config.endpoint, "websocket transport closed");
    }
}

impl Drop for DuplexTransport {
    fn drop(&mut self) {
        self.shared.stop.send_replace(true);
        let worker = self.worker.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = worker.take() {
            handle.abort();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Supervisor
// ─────────────────────────────────────────────────────────────────────────────

async fn run_supervisor(shared: Arc<Shared>) {
    let endpoint = shared.config.endpoint.clone();
    let mut stop = shared.stop.subscribe();
    let mut outbound = shared.outbound_rx.lock().await;
    let mut backoff = Backoff::new(
        shared.config.reconnect_initial_delay,
        shared.config.reconnect_max_delay,
    );

    loop {
        if *stop.borrow_and_update() {
            break;
        }

        shared.set_state(ConnectionState::Connecting);
        let attempt = tokio::select! {
            result = connect(&shared.config) => result,
            _ = stop.changed() => break,
        };

        match attempt {
            Ok(ws) => {
                backoff.reset();
                // Drop a wake-up that raced with this connect.
                let _ = shared.connect_now.notified().now_or_never();
                shared.set_state(ConnectionState::Connected);
                info!(%endpoint, "websocket connection established");

                let session = AssertUnwindSafe(run_session(ws, &shared, &mut outbound, &mut stop))
                    .catch_unwind()
                    .await;
                shared.set_state(ConnectionState::Disconnected);
                match session {
                    Ok(reason) => info!(%endpoint, reason, "websocket connection closed"),
                    Err(_) => error!(%endpoint, "websocket session panicked; treating as disconnect"),
                }
            }
            Err(e) => {
                shared.set_state(ConnectionState::Disconnected);
                warn!(%endpoint, error = %e, "websocket connection error");
            }
        }

        if *stop.borrow() {
            break;
        }

        let delay = backoff.next_delay();
        debug!(
            delay_ms = delay.as_millis() as u64,
            attempt = backoff.attempt(),
            "waiting before reconnect"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shared.connect_now.notified() => debug!("reconnect requested by caller"),
            _ = stop.changed() => {}
        }
    }

    shared.set_state(ConnectionState::Disconnected);
    debug!(%endpoint, "connection worker stopped");
}

async fn connect(config: &TransportConfig) -> Result<WsStream, VoxError> {
    match tokio::time::timeout(config.connect_timeout, connect_async(config.endpoint.as_str())).await {
        Ok(Ok((ws, _response))) => Ok(ws),
        Ok(Err(e)) => Err(VoxError::Transport(e.to_string())),
        Err(_) => Err(VoxError::Transport(format!(
            "handshake timed out after {:?}",
            config.connect_timeout
        ))),
    }
}

/// Run one connection until either path ends or a stop is requested.
/// Returns a short reason for the log line.
async fn run_session(
    ws: WsStream,
    shared: &Shared,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    stop: &mut watch::Receiver<bool>,
) -> &'static str {
    let (mut sink, mut stream) = ws.split();

    let reason = tokio::select! {
        reason = send_loop(&mut sink, outbound) => reason,
        reason = receive_loop(&mut stream, &shared.pending) => reason,
        _ = stop.changed() => "transport stopped",
    };

    let _ = tokio::time::timeout(CLOSE_FRAME_TIMEOUT, sink.close()).await;
    reason
}

async fn send_loop(
    sink: &mut SplitSink<WsStream, Message>,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> &'static str {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = sink.send(Message::Text(frame.into())).await {
            warn!(error = %e, "send failed; dequeued request dropped");
            return "send failed";
        }
    }
    "outbound queue closed"
}

async fn receive_loop(stream: &mut SplitStream<WsStream>, pending: &PendingRequestTable) -> &'static str {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                dispatch_inbound(text.as_str(), pending);
            }
            Ok(Message::Close(_)) => return "closed by peer",
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "receive failed");
                return "receive failed";
            }
        }
    }
    "stream ended"
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound demultiplexing
// ─────────────────────────────────────────────────────────────────────────────

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// A waiting caller received the result.
    Resolved(u64),
    /// No caller is waiting on this id (unknown, late, or duplicate).
    Unmatched(u64),
    /// Valid JSON without a correlation id.
    MissingId,
    /// Not a response envelope.
    Malformed,
}

/// Parse `text` as a response envelope and resolve its pending request.
///
/// Never fails: anything that cannot be matched is logged and dropped.
pub fn dispatch_inbound(text: &str, pending: &PendingRequestTable) -> InboundOutcome {
    let envelope: ResponseEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, frame_len = text.len(), "dropping malformed inbound frame");
            return InboundOutcome::Malformed;
        }
    };

    let Some(id) = envelope.id else {
        warn!("dropping inbound frame without correlation id");
        return InboundOutcome::MissingId;
    };

    if pending.resolve(id, envelope.result) {
        debug!(id, "response delivered");
        InboundOutcome::Resolved(id)
    } else {
        debug!(id, "no pending request for response; dropped");
        InboundOutcome::Unmatched(id)
    }
}
