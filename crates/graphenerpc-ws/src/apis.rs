//! Typed wrappers over negotiated sessions.
//!
//! Each wrapper borrows an [`ApiSession`] and offers typed methods for the
//! common node calls plus a generic `call` passthrough, so any method the
//! node exposes stays reachable by name.

use serde_json::{json, Value};

use graphenerpc_core::error::RpcError;

use crate::session::ApiSession;

/// The `database` sub-API: chain state queries.
#[derive(Debug)]
pub struct DatabaseApi<'a> {
    session: &'a ApiSession,
}

impl<'a> DatabaseApi<'a> {
    pub(crate) fn new(session: &'a ApiSession) -> Self {
        Self { session }
    }

    /// Call any database method by name.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.session.exec(method, params).await
    }

    /// The chain identifier this node serves.
    pub async fn get_chain_id(&self) -> Result<String, RpcError> {
        let value = self.session.exec("get_chain_id", Vec::new()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch objects by id (e.g. `"2.1.0"` for dynamic global properties).
    pub async fn get_objects(&self, ids: &[&str]) -> Result<Value, RpcError> {
        self.session.exec("get_objects", vec![json!(ids)]).await
    }

    pub async fn get_dynamic_global_properties(&self) -> Result<Value, RpcError> {
        self.session
            .exec("get_dynamic_global_properties", Vec::new())
            .await
    }

    pub async fn lookup_asset_symbols(&self, symbols: &[&str]) -> Result<Value, RpcError> {
        self.session
            .exec("lookup_asset_symbols", vec![json!(symbols)])
            .await
    }

    pub fn session(&self) -> &ApiSession {
        self.session
    }
}

/// The `history` sub-API: per-account operation history.
#[derive(Debug)]
pub struct HistoryApi<'a> {
    session: &'a ApiSession,
}

impl<'a> HistoryApi<'a> {
    pub(crate) fn new(session: &'a ApiSession) -> Self {
        Self { session }
    }

    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.session.exec(method, params).await
    }

    /// Operations for `account`, walking backwards from `start` to `stop`.
    pub async fn get_account_history(
        &self,
        account: &str,
        stop: &str,
        limit: u32,
        start: &str,
    ) -> Result<Value, RpcError> {
        self.session
            .exec(
                "get_account_history",
                vec![json!(account), json!(stop), json!(limit), json!(start)],
            )
            .await
    }

    pub fn session(&self) -> &ApiSession {
        self.session
    }
}

/// The `network_broadcast` sub-API: push signed transactions.
#[derive(Debug)]
pub struct NetworkBroadcastApi<'a> {
    session: &'a ApiSession,
}

impl<'a> NetworkBroadcastApi<'a> {
    pub(crate) fn new(session: &'a ApiSession) -> Self {
        Self { session }
    }

    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.session.exec(method, params).await
    }

    /// Broadcast an externally signed transaction. Signing itself is out of
    /// scope for this client.
    pub async fn broadcast_transaction(&self, tx: Value) -> Result<Value, RpcError> {
        self.session.exec("broadcast_transaction", vec![tx]).await
    }

    pub fn session(&self) -> &ApiSession {
        self.session
    }
}

/// The `orders` sub-API: order-book queries.
#[derive(Debug)]
pub struct OrdersApi<'a> {
    session: &'a ApiSession,
}

impl<'a> OrdersApi<'a> {
    pub(crate) fn new(session: &'a ApiSession) -> Self {
        Self { session }
    }

    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.session.exec(method, params).await
    }

    pub async fn get_grouped_limit_orders(
        &self,
        base: &str,
        quote: &str,
        group: u32,
        start: Option<&str>,
        limit: u32,
    ) -> Result<Value, RpcError> {
        self.session
            .exec(
                "get_grouped_limit_orders",
                vec![
                    json!(base),
                    json!(quote),
                    json!(group),
                    json!(start),
                    json!(limit),
                ],
            )
            .await
    }

    pub fn session(&self) -> &ApiSession {
        self.session
    }
}

/// The `crypto` sub-API. No typed methods; call by name.
#[derive(Debug)]
pub struct CryptoApi<'a> {
    session: &'a ApiSession,
}

impl<'a> CryptoApi<'a> {
    pub(crate) fn new(session: &'a ApiSession) -> Self {
        Self { session }
    }

    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.session.exec(method, params).await
    }

    pub fn session(&self) -> &ApiSession {
        self.session
    }
}
