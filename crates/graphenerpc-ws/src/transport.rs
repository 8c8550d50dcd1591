//! WebSocket transport: one socket, many concurrent calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use graphenerpc_core::error::RpcError;
use graphenerpc_core::request::{CallRequest, CallResponse};
use graphenerpc_core::transport::{NodeTransport, TransportState};

/// Command sent from callers to the socket task. The unbounded channel
/// doubles as the outbound queue: commands enqueued while the task is busy
/// are drained strictly FIFO.
enum Command {
    Call {
        req: CallRequest,
        reply: oneshot::Sender<Result<Value, RpcError>>,
    },
    Close,
}

/// WebSocket transport to a single Graphene node.
///
/// A background task owns the socket and the pending-call table; callers
/// talk to it over channels, so concurrent calls need no locking. Call ids
/// are per-transport, strictly increasing and never reused.
///
/// The transport is single-shot: once its socket closes (explicitly or not)
/// it stays [`TransportState::Closed`] and every call fails with
/// [`RpcError::ConnectionClosed`]. Reconnecting means building a new one.
pub struct WsTransport {
    url: String,
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<TransportState>,
    next_id: AtomicU64,
}

impl WsTransport {
    /// Open a socket to `url`, bounding the handshake by `connect_timeout`.
    ///
    /// Resolves only once the socket is open. Rejects with
    /// [`RpcError::Configuration`] on a blank URL before any I/O,
    /// [`RpcError::ConnectTimeout`] if the handshake outlives the timeout,
    /// and [`RpcError::Construction`] if it fails outright.
    pub async fn connect(
        url: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, RpcError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(RpcError::Configuration("node url is empty".into()));
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(TransportState::Connecting);
        let (ready_tx, ready_rx) = oneshot::channel();
        let url_clone = url.clone();

        tokio::spawn(async move {
            socket_task(url_clone, connect_timeout, cmd_rx, state_tx, ready_tx).await;
        });

        ready_rx
            .await
            .map_err(|_| RpcError::Construction("connection task terminated".into()))??;

        Ok(Self {
            url,
            cmd_tx,
            state_rx,
            next_id: AtomicU64::new(1),
        })
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("url", &self.url)
            .field("state", &*self.state_rx.borrow())
            .finish_non_exhaustive()
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Close);
    }
}

#[async_trait]
impl NodeTransport for WsTransport {
    async fn call(
        &self,
        api_id: u64,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = CallRequest::new(id, api_id, method, params);
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(Command::Call {
                req,
                reply: reply_tx,
            })
            .map_err(|_| RpcError::ConnectionClosed)?;

        reply_rx.await.map_err(|_| RpcError::ConnectionClosed)?
    }

    async fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close);
        let mut state_rx = self.state_rx.clone();
        let _ = state_rx
            .wait_for(|state| *state == TransportState::Closed)
            .await;
    }

    fn state(&self) -> TransportState {
        *self.state_rx.borrow()
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Background task that owns the socket and the pending-call table.
async fn socket_task(
    url: String,
    connect_timeout: Duration,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<TransportState>,
    ready_tx: oneshot::Sender<Result<(), RpcError>>,
) {
    tracing::info!(url = %url, "connecting to node");

    let handshake = time::timeout(connect_timeout, connect_async(&url)).await;
    let ws_stream = match handshake {
        Err(_) => {
            tracing::warn!(url = %url, timeout_ms = connect_timeout.as_millis() as u64, "connect timed out");
            let _ = state_tx.send(TransportState::Closed);
            let _ = ready_tx.send(Err(RpcError::ConnectTimeout {
                url,
                ms: connect_timeout.as_millis() as u64,
            }));
            return;
        }
        Ok(Err(e)) => {
            tracing::warn!(url = %url, error = %e, "websocket handshake failed");
            let _ = state_tx.send(TransportState::Closed);
            let _ = ready_tx.send(Err(RpcError::Construction(e.to_string())));
            return;
        }
        Ok(Ok((ws_stream, _))) => ws_stream,
    };

    let _ = state_tx.send(TransportState::Open);
    let _ = ready_tx.send(Ok(()));

    let (mut sink, mut stream) = ws_stream.split();
    let mut pending: HashMap<u64, oneshot::Sender<Result<Value, RpcError>>> = HashMap::new();

    loop {
        tokio::select! {
            // Outbound calls, in the order they were enqueued.
            cmd = cmd_rx.recv() => match cmd {
                None | Some(Command::Close) => break,
                Some(Command::Call { req, reply }) => {
                    let text = match serde_json::to_string(&req) {
                        Ok(text) => text,
                        Err(e) => {
                            let _ = reply.send(Err(e.into()));
                            continue;
                        }
                    };
                    let id = req.id;
                    pending.insert(id, reply);
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        tracing::warn!(url = %url, id, "send failed, socket gone");
                        break;
                    }
                }
            },
            // Inbound responses, matched by id only.
            msg = stream.next() => match msg {
                None | Some(Ok(Message::Close(_))) => break,
                Some(Err(e)) => {
                    tracing::warn!(url = %url, error = %e, "websocket receive error");
                    break;
                }
                Some(Ok(Message::Text(text))) => {
                    dispatch_response(text.as_str(), &mut pending);
                }
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sink.send(Message::Close(None)).await;

    // Calls still in flight would otherwise never settle.
    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(RpcError::ConnectionClosed));
    }
    let _ = state_tx.send(TransportState::Closed);
    tracing::info!(url = %url, "connection closed");
}

/// Settle the pending call a response frame belongs to.
///
/// Frames that do not parse, and ids with no pending call, are dropped;
/// neither is an error condition for the transport.
fn dispatch_response(
    text: &str,
    pending: &mut HashMap<u64, oneshot::Sender<Result<Value, RpcError>>>,
) {
    let resp: CallResponse = match serde_json::from_str(text) {
        Ok(resp) => resp,
        Err(_) => {
            tracing::debug!("unparseable frame from node");
            return;
        }
    };

    let Some(reply) = pending.remove(&resp.id) else {
        tracing::trace!(id = resp.id, "response for unknown call id");
        return;
    };

    let outcome = resp.into_result().map_err(RpcError::Protocol);
    let _ = reply.send(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending_with(id: u64) -> (
        HashMap<u64, oneshot::Sender<Result<Value, RpcError>>>,
        oneshot::Receiver<Result<Value, RpcError>>,
    ) {
        let (tx, rx) = oneshot::channel();
        let mut pending = HashMap::new();
        pending.insert(id, tx);
        (pending, rx)
    }

    #[test]
    fn dispatch_resolves_matching_id() {
        let (mut pending, mut rx) = pending_with(4);
        dispatch_response(r#"{"id":4,"result":"ok"}"#, &mut pending);
        assert!(pending.is_empty());
        assert_eq!(rx.try_recv().unwrap().unwrap(), json!("ok"));
    }

    #[test]
    fn dispatch_rejects_on_error_member() {
        let (mut pending, mut rx) = pending_with(4);
        dispatch_response(r#"{"id":4,"error":{"code":10}}"#, &mut pending);
        let err = rx.try_recv().unwrap().unwrap_err();
        assert!(matches!(err, RpcError::Protocol(_)));
    }

    #[test]
    fn dispatch_drops_unknown_ids() {
        let (mut pending, mut rx) = pending_with(4);
        dispatch_response(r#"{"id":99,"result":true}"#, &mut pending);
        assert_eq!(pending.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dispatch_ignores_garbage_frames() {
        let (mut pending, _rx) = pending_with(4);
        dispatch_response("not json", &mut pending);
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn blank_url_is_rejected_before_io() {
        let err = WsTransport::connect("  ", Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Configuration(_)));
    }
}
