//! Graphene JSON-RPC wire types.
//!
//! Graphene nodes speak a pre-2.0 JSON-RPC dialect: there is no `jsonrpc`
//! version member, the method is always the literal `"call"`, and the real
//! target is the params triple `[api_id, method_name, method_params]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The reserved api-id used for sub-API negotiation.
///
/// Calling `[1, api_name, []]` returns the numeric session api-id under
/// which all further calls to that sub-API must be issued.
pub const NEGOTIATION_API_ID: u64 = 1;

/// An outbound call frame.
///
/// Member order matters for byte-compatibility with the node:
/// `{"method":"call","params":[api_id,method,params],"id":N}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    pub method: String,
    pub params: (u64, String, Vec<Value>),
    pub id: u64,
}

impl CallRequest {
    /// Build a call frame addressed to `api_id`.
    pub fn new(id: u64, api_id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: "call".into(),
            params: (api_id, method.into(), params),
            id,
        }
    }

    /// Build the negotiation frame `[1, api_name, []]` for a named sub-API.
    pub fn negotiate(id: u64, api_name: impl Into<String>) -> Self {
        Self::new(id, NEGOTIATION_API_ID, api_name, Vec::new())
    }
}

/// An inbound response frame: `{"id":N,"result":...}` or `{"id":N,"error":...}`.
///
/// The error payload is node-defined and carried opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResponse {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl CallResponse {
    /// Returns `true` if this is a successful response.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Unwrap the result value or return the node's error payload.
    pub fn into_result(self) -> Result<Value, Value> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
