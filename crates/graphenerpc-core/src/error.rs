//! Connection and call error types.

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by transports, sessions and the connection manager.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Caller-supplied configuration was rejected before any network I/O
    /// (empty node URL, no capability enabled).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The WebSocket handshake did not complete within the connect timeout.
    #[error("connection to {url} timed out after {ms}ms")]
    ConnectTimeout { url: String, ms: u64 },

    /// Socket construction failed (DNS, TCP, TLS or the HTTP upgrade).
    #[error("websocket connection failed: {0}")]
    Construction(String),

    /// A sub-API negotiation (or the follow-up chain-id fetch) failed.
    /// Fatal to the whole connection: the manager tears itself down.
    #[error("negotiation of \"{api}\" failed: {source}")]
    Negotiation {
        api: String,
        #[source]
        source: Box<RpcError>,
    },

    /// An accessor was used for a capability that was not enabled at
    /// connect time. Raised synchronously, no network round trip.
    #[error("api \"{0}\" was not enabled for this connection")]
    UnsupportedApi(&'static str),

    /// The node answered a specific call with an `error` member. Local to
    /// that call; sibling in-flight calls are unaffected.
    #[error("node returned error: {0}")]
    Protocol(Value),

    /// The socket closed while this call was in flight.
    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    /// The connection manager was used before `init()` completed.
    #[error("connection is not initialized yet")]
    NotReady,

    /// The connection manager was used after `close()`.
    #[error("connection manager is closed")]
    Closed,

    /// A payload could not be deserialized into the expected shape.
    #[error("malformed payload: {0}")]
    Deserialization(#[from] serde_json::Error),
}

impl RpcError {
    /// Returns `true` for node-side per-call errors, which never affect
    /// the connection or sibling calls.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// Returns `true` if the connection itself is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. }
                | Self::Construction(_)
                | Self::Negotiation { .. }
                | Self::ConnectionClosed
                | Self::Closed
        )
    }
}
