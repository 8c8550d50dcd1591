//! graphenerpc-ws — WebSocket connection layer for Graphene-style nodes.
//!
//! # Features
//! - One persistent WebSocket per node, multiplexing every call
//! - Request/response correlation by strictly-increasing call id
//! - Concurrent negotiation of independently enabled sub-APIs
//! - Typed per-API accessors plus a generic by-capability accessor
//!
//! # Quick start
//! ```rust,no_run
//! use std::time::Duration;
//! use graphenerpc_core::{ApiFlags, Capability};
//!
//! # async fn run() -> Result<(), graphenerpc_core::RpcError> {
//! let manager = graphenerpc_ws::connect(
//!     "wss://node.example.org",
//!     Duration::from_secs(5),
//!     ApiFlags::only(Capability::Database),
//!     None,
//! )
//! .await?;
//! println!("chain: {}", manager.chain_id()?);
//! # Ok(())
//! # }
//! ```

pub mod apis;
pub mod manager;
pub mod session;
pub mod transport;

pub use apis::{CryptoApi, DatabaseApi, HistoryApi, NetworkBroadcastApi, OrdersApi};
pub use manager::{connect, ConnectionManager, StatusCallback};
pub use session::ApiSession;
pub use transport::WsTransport;
