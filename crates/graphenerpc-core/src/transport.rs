//! The `NodeTransport` trait — the seam between sessions and the socket.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RpcError;

/// Lifecycle of a single transport.
///
/// There is no way back from `Closed`; reconnecting means building a new
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Handshake in progress.
    Connecting,
    /// Socket is open; calls go straight out.
    Open,
    /// Socket is gone, by explicit close, timeout, error or remote closure.
    Closed,
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Connection status reported to an optional caller-installed callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Open,
    Closed,
    Error,
}

/// One logical connection to a node, multiplexing concurrent calls.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; a single transport is shared by
/// every session negotiated on it.
///
/// # Object Safety
/// The trait is object-safe and is held as `Arc<dyn NodeTransport>`.
#[async_trait]
pub trait NodeTransport: Send + Sync + 'static {
    /// Issue `[api_id, method, params]` and await the matching response.
    ///
    /// Responses are correlated by call id, never by send order; concurrent
    /// calls resolve independently as their own responses arrive.
    async fn call(
        &self,
        api_id: u64,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, RpcError>;

    /// Close the socket. Idempotent; outstanding calls fail with
    /// [`RpcError::ConnectionClosed`].
    async fn close(&self);

    /// Current lifecycle state.
    fn state(&self) -> TransportState;

    /// The node URL this transport was built for.
    fn url(&self) -> &str;
}
