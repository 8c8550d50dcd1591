//! Connection manager: negotiate enabled sub-APIs over one transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future;

use graphenerpc_core::capability::{ApiFlags, Capability};
use graphenerpc_core::error::RpcError;
use graphenerpc_core::transport::{ConnectionStatus, NodeTransport};

use crate::apis::{CryptoApi, DatabaseApi, HistoryApi, NetworkBroadcastApi, OrdersApi};
use crate::session::ApiSession;
use crate::transport::WsTransport;

/// Caller-installed connection status observer.
pub type StatusCallback = Box<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Manager lifecycle. `Closed` is terminal: reconnecting requires a new
/// manager. (The transient connecting/initializing phases live inside the
/// `connect`/`init` futures and are not observable.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManagerState {
    /// Transport is open; no sub-API negotiated yet.
    Connected,
    /// Every enabled sub-API negotiated; accessors are usable.
    Ready,
    /// Torn down, by explicit `close()` or by a failed `init()`.
    Closed,
}

/// One logical connection to a Graphene node.
///
/// Owns a single [`WsTransport`] and one [`ApiSession`] per capability the
/// caller enabled. Built in two steps, [`ConnectionManager::connect`] then
/// [`ConnectionManager::init`]; the [`connect`] factory does both.
pub struct ConnectionManager {
    transport: Option<Arc<dyn NodeTransport>>,
    sessions: HashMap<Capability, ApiSession>,
    chain_id: Option<String>,
    flags: ApiFlags,
    state: ManagerState,
    status_callback: Option<StatusCallback>,
    auto_reconnect: bool,
}

impl ConnectionManager {
    /// Open the transport. Rejects with [`RpcError::Configuration`] before
    /// any I/O if `url` is blank or `flags` enables nothing.
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        flags: ApiFlags,
    ) -> Result<Self, RpcError> {
        if url.trim().is_empty() {
            return Err(RpcError::Configuration("node url is empty".into()));
        }
        if flags.is_empty() {
            return Err(RpcError::Configuration(
                "at least one sub-api must be enabled".into(),
            ));
        }

        let transport = WsTransport::connect(url, connect_timeout).await?;
        Ok(Self::from_transport(Arc::new(transport), flags))
    }

    fn from_transport(transport: Arc<dyn NodeTransport>, flags: ApiFlags) -> Self {
        Self {
            transport: Some(transport),
            sessions: HashMap::new(),
            chain_id: None,
            flags,
            state: ManagerState::Connected,
            status_callback: None,
            auto_reconnect: false,
        }
    }

    /// Negotiate every enabled sub-API, all concurrently.
    ///
    /// The database session additionally fetches and caches the chain id
    /// right after negotiating. If anything fails the manager tears itself
    /// down completely before returning the first error, wrapped as
    /// [`RpcError::Negotiation`] — a half-initialized manager is never
    /// observable.
    pub async fn init(&mut self) -> Result<(), RpcError> {
        match self.state {
            ManagerState::Closed => return Err(RpcError::Closed),
            ManagerState::Ready => return Ok(()),
            ManagerState::Connected => {}
        }
        let transport = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => return Err(RpcError::Closed),
        };

        let negotiations = self.flags.enabled().into_iter().map(|capability| {
            let transport = Arc::clone(&transport);
            async move { init_capability(capability, transport).await }
        });

        match future::try_join_all(negotiations).await {
            Ok(ready) => {
                for (capability, session, chain_id) in ready {
                    if let Some(chain_id) = chain_id {
                        self.chain_id = Some(chain_id);
                    }
                    self.sessions.insert(capability, session);
                }
                self.state = ManagerState::Ready;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "init failed, tearing connection down");
                self.close().await;
                Err(err)
            }
        }
    }

    /// Generic by-capability accessor; the call-by-name surface is
    /// [`ApiSession::exec`].
    pub fn api(&self, capability: Capability) -> Result<&ApiSession, RpcError> {
        self.session(capability)
    }

    pub fn database(&self) -> Result<DatabaseApi<'_>, RpcError> {
        Ok(DatabaseApi::new(self.session(Capability::Database)?))
    }

    pub fn history(&self) -> Result<HistoryApi<'_>, RpcError> {
        Ok(HistoryApi::new(self.session(Capability::History)?))
    }

    pub fn network_broadcast(&self) -> Result<NetworkBroadcastApi<'_>, RpcError> {
        Ok(NetworkBroadcastApi::new(
            self.session(Capability::NetworkBroadcast)?,
        ))
    }

    pub fn orders(&self) -> Result<OrdersApi<'_>, RpcError> {
        Ok(OrdersApi::new(self.session(Capability::Orders)?))
    }

    pub fn crypto(&self) -> Result<CryptoApi<'_>, RpcError> {
        Ok(CryptoApi::new(self.session(Capability::Crypto)?))
    }

    /// The chain identifier fetched during `init()`.
    ///
    /// Requires the database capability and a completed `init()`.
    pub fn chain_id(&self) -> Result<&str, RpcError> {
        match self.state {
            ManagerState::Closed => Err(RpcError::Closed),
            ManagerState::Connected => Err(RpcError::NotReady),
            ManagerState::Ready => {
                if !self.flags.database {
                    return Err(RpcError::UnsupportedApi("database"));
                }
                self.chain_id.as_deref().ok_or(RpcError::NotReady)
            }
        }
    }

    /// The capability flags this connection was created with.
    pub fn flags(&self) -> ApiFlags {
        self.flags
    }

    /// Tear everything down. Idempotent; afterwards every accessor returns
    /// [`RpcError::Closed`] and the manager cannot be revived.
    pub async fn close(&mut self) {
        self.sessions.clear();
        self.chain_id = None;
        self.status_callback = None;
        if let Some(transport) = self.transport.take() {
            transport.close().await;
        }
        self.state = ManagerState::Closed;
    }

    /// Install a status observer.
    ///
    /// Stored for callers that poll it back out; no internal logic invokes
    /// it. Cleared by `close()`.
    pub fn set_status_callback(&mut self, callback: StatusCallback) {
        self.status_callback = Some(callback);
    }

    pub fn status_callback(&self) -> Option<&(dyn Fn(ConnectionStatus) + Send + Sync)> {
        self.status_callback.as_deref()
    }

    /// Stored only; this layer never reconnects on its own. Callers that
    /// want retry wrap `connect` + `init` themselves.
    pub fn set_auto_reconnect(&mut self, auto_reconnect: bool) {
        self.auto_reconnect = auto_reconnect;
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    fn session(&self, capability: Capability) -> Result<&ApiSession, RpcError> {
        match self.state {
            ManagerState::Closed => Err(RpcError::Closed),
            ManagerState::Connected => Err(RpcError::NotReady),
            ManagerState::Ready => self
                .sessions
                .get(&capability)
                .ok_or(RpcError::UnsupportedApi(capability.wire_name())),
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state)
            .field("flags", &self.flags)
            .field("sessions", &self.sessions)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

/// Negotiate one capability; the database session also fetches the chain id
/// as part of its init so the whole fan-out stays concurrent.
async fn init_capability(
    capability: Capability,
    transport: Arc<dyn NodeTransport>,
) -> Result<(Capability, ApiSession, Option<String>), RpcError> {
    let session = ApiSession::negotiate(capability, transport)
        .await
        .map_err(|e| negotiation_failed(capability, e))?;

    let chain_id = if capability == Capability::Database {
        let value = session
            .exec("get_chain_id", Vec::new())
            .await
            .map_err(|e| negotiation_failed(capability, e))?;
        let chain_id: String = serde_json::from_value(value)
            .map_err(|e| negotiation_failed(capability, RpcError::from(e)))?;
        tracing::info!(chain_id = %chain_id, "database api ready");
        Some(chain_id)
    } else {
        None
    };

    Ok((capability, session, chain_id))
}

fn negotiation_failed(capability: Capability, source: RpcError) -> RpcError {
    RpcError::Negotiation {
        api: capability.wire_name().into(),
        source: Box::new(source),
    }
}

/// Connect and initialize in one step (the usual entry point).
///
/// Returns a manager in the ready state, with every enabled sub-API
/// negotiated and, if the database capability is on, the chain id cached.
pub async fn connect(
    url: &str,
    connect_timeout: Duration,
    flags: ApiFlags,
    on_status: Option<StatusCallback>,
) -> Result<ConnectionManager, RpcError> {
    let mut manager = ConnectionManager::connect(url, connect_timeout, flags).await?;
    if let Some(callback) = on_status {
        manager.set_status_callback(callback);
    }
    manager.init().await?;
    Ok(manager)
}
