//! [`TransportConfig`] – endpoint plus timing knobs for both transports.

use std::time::Duration;

/// Default remote execution endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8765";

/// Configuration shared by [`HttpTransport`][crate::HttpTransport] and
/// [`DuplexTransport`][crate::DuplexTransport].
///
/// Fields that only one transport reads are documented as such.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Remote endpoint URI.  The scheme selects the transport.
    pub endpoint: String,
    /// End-to-end bound on one remote call (HTTP: per attempt).
    pub timeout: Duration,
    /// HTTP only: total number of attempts.
    pub retry_attempts: u32,
    /// HTTP only: fixed pause between attempts.
    pub retry_delay: Duration,
    /// Duplex only: how long a caller waits for `Connected` before giving up.
    pub connect_wait: Duration,
    /// Duplex only: fail-fast window after a failed connect.
    pub cool_down: Duration,
    /// Duplex only: bound on a single WebSocket handshake.
    pub connect_timeout: Duration,
    /// Duplex only: first reconnect delay.
    pub reconnect_initial_delay: Duration,
    /// Duplex only: reconnect delay ceiling.
    pub reconnect_max_delay: Duration,
    /// Duplex only: how long `close()` waits for the worker to finish.
    pub close_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
            connect_wait: Duration::from_secs(5),
            cool_down: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            reconnect_initial_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(30),
            close_timeout: Duration::from_secs(2),
        }
    }
}

impl TransportConfig {
    /// Default configuration pointed at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    pub fn with_connect_wait(mut self, wait: Duration) -> Self {
        self.connect_wait = wait;
        self
    }

    pub fn with_cool_down(mut self, window: Duration) -> Self {
        self.cool_down = window;
        self
    }

    pub fn with_reconnect_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_initial_delay = initial;
        self.reconnect_max_delay = max;
        self
    }
}
