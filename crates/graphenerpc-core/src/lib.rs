//! graphenerpc-core — foundation types for GrapheneRPC.
//!
//! # Overview
//!
//! GrapheneRPC is a client for Graphene-style blockchain full nodes
//! (BitShares and friends): one persistent WebSocket connection carries every
//! JSON-RPC call, and named sub-APIs are negotiated over that socket before
//! use. The core crate defines:
//!
//! - [`CallRequest`] / [`CallResponse`] — the node's wire types
//! - [`RpcError`] — structured error type shared by every layer
//! - [`Capability`] / [`ApiFlags`] — the sub-API capability model
//! - [`NodeTransport`] — the async trait every transport implements
//! - [`TransportState`] / [`ConnectionStatus`] — connection lifecycle states

pub mod capability;
pub mod error;
pub mod request;
pub mod transport;

pub use capability::{ApiFlags, Capability};
pub use error::RpcError;
pub use request::{CallRequest, CallResponse, NEGOTIATION_API_ID};
pub use transport::{ConnectionStatus, NodeTransport, TransportState};
