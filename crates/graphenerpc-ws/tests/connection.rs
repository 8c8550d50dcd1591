//! End-to-end tests against an in-process mock Graphene node.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use graphenerpc_core::{ApiFlags, Capability, RpcError};
use graphenerpc_ws::ConnectionManager;

const CHAIN_ID: &str = "4018d7844c78f6a6c41c6a552b898022310fc5dec06da467ee7905a8dad512c8";
const TIMEOUT: Duration = Duration::from_secs(5);

/// Scripted reply logic: given a parsed request frame, produce the frames
/// to send back. Returning a `Close` frame shuts the connection down.
type Responder = Box<dyn FnMut(Value) -> Vec<Message> + Send>;

/// Spawn a single-connection mock node; returns its URL and the log of
/// every request frame it received.
async fn spawn_node(mut responder: Responder) -> (String, Arc<Mutex<Vec<Value>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let log = Arc::new(Mutex::new(Vec::new()));
    let task_log = Arc::clone(&log);

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut sink, mut stream) = ws.split();

        'conn: while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Text(text) => {
                    let req: Value = serde_json::from_str(text.as_str()).unwrap();
                    task_log.lock().unwrap().push(req.clone());
                    for reply in responder(req) {
                        let closing = matches!(reply, Message::Close(_));
                        let _ = sink.send(reply).await;
                        if closing {
                            break 'conn;
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    (url, log)
}

fn result_frame(req: &Value, result: Value) -> Message {
    Message::Text(json!({ "id": req["id"], "result": result }).to_string().into())
}

/// Default node behavior: negotiations get sequential api-ids from 2,
/// `get_chain_id` answers the fixture chain, everything else echoes its
/// method name as the result.
fn graphene_responder() -> Responder {
    let mut next_api_id = 2u64;
    Box::new(move |req: Value| {
        let api_id = req["params"][0].as_u64().unwrap();
        let method = req["params"][1].as_str().unwrap();
        let result = if api_id == 1 {
            let granted = json!(next_api_id);
            next_api_id += 1;
            granted
        } else if method == "get_chain_id" {
            json!(CHAIN_ID)
        } else {
            json!(method)
        };
        vec![result_frame(&req, result)]
    })
}

fn all_flags() -> ApiFlags {
    Capability::ALL
        .into_iter()
        .fold(ApiFlags::default(), ApiFlags::with)
}

#[tokio::test]
async fn full_capability_set_connects_and_serves_every_api() {
    let (url, _log) = spawn_node(graphene_responder()).await;
    let manager = graphenerpc_ws::connect(&url, TIMEOUT, all_flags(), None)
        .await
        .unwrap();

    assert_eq!(manager.chain_id().unwrap(), CHAIN_ID);
    assert_eq!(
        manager.database().unwrap().call("stub", vec![]).await.unwrap(),
        json!("stub")
    );
    assert_eq!(
        manager.history().unwrap().call("stub", vec![]).await.unwrap(),
        json!("stub")
    );
    assert_eq!(
        manager
            .network_broadcast()
            .unwrap()
            .call("stub", vec![])
            .await
            .unwrap(),
        json!("stub")
    );
    assert_eq!(
        manager.orders().unwrap().call("stub", vec![]).await.unwrap(),
        json!("stub")
    );
    assert_eq!(
        manager.crypto().unwrap().call("stub", vec![]).await.unwrap(),
        json!("stub")
    );
}

#[tokio::test]
async fn blank_url_and_empty_flags_are_configuration_errors() {
    let err = ConnectionManager::connect("", Duration::from_secs(1), ApiFlags::only(Capability::Database))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Configuration(_)));

    let err = ConnectionManager::connect("ws://127.0.0.1:1", Duration::from_secs(1), ApiFlags::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Configuration(_)));
}

#[tokio::test]
async fn responses_are_matched_by_id_not_arrival_order() {
    // Hold the three data calls and answer them in reverse order.
    let mut base = graphene_responder();
    let mut held: Vec<Value> = Vec::new();
    let responder: Responder = Box::new(move |req: Value| {
        let api_id = req["params"][0].as_u64().unwrap();
        let method = req["params"][1].as_str().unwrap();
        if api_id == 1 || method == "get_chain_id" {
            return base(req);
        }
        held.push(req);
        if held.len() < 3 {
            return Vec::new();
        }
        held.drain(..)
            .rev()
            .map(|req| {
                let method = req["params"][1].clone();
                result_frame(&req, method)
            })
            .collect()
    });

    let (url, _log) = spawn_node(responder).await;
    let manager = graphenerpc_ws::connect(&url, TIMEOUT, ApiFlags::only(Capability::Database), None)
        .await
        .unwrap();
    let db = manager.api(Capability::Database).unwrap();

    let (m1, m2, m3) = tokio::join!(
        db.exec("m1", vec![]),
        db.exec("m2", vec![]),
        db.exec("m3", vec![]),
    );
    assert_eq!(m1.unwrap(), json!("m1"));
    assert_eq!(m2.unwrap(), json!("m2"));
    assert_eq!(m3.unwrap(), json!("m3"));
}

#[tokio::test]
async fn node_errors_reject_only_their_own_call() {
    let mut base = graphene_responder();
    let responder: Responder = Box::new(move |req: Value| {
        if req["params"][1] == "bad" {
            let frame = json!({ "id": req["id"], "error": { "code": 10, "message": "assert" } });
            return vec![Message::Text(frame.to_string().into())];
        }
        base(req)
    });

    let (url, _log) = spawn_node(responder).await;
    let manager = graphenerpc_ws::connect(&url, TIMEOUT, ApiFlags::only(Capability::Database), None)
        .await
        .unwrap();
    let db = manager.api(Capability::Database).unwrap();

    let (bad, good) = tokio::join!(db.exec("bad", vec![]), db.exec("good", vec![]));
    match bad.unwrap_err() {
        RpcError::Protocol(payload) => assert_eq!(payload["message"], "assert"),
        other => panic!("expected protocol error, got {other}"),
    }
    assert_eq!(good.unwrap(), json!("good"));
}

#[tokio::test]
async fn close_is_idempotent_over_a_live_socket() {
    let (url, _log) = spawn_node(graphene_responder()).await;
    let mut manager = graphenerpc_ws::connect(&url, TIMEOUT, ApiFlags::only(Capability::Database), None)
        .await
        .unwrap();

    manager.close().await;
    manager.close().await;
    assert!(matches!(manager.database().unwrap_err(), RpcError::Closed));
    assert!(matches!(manager.chain_id().unwrap_err(), RpcError::Closed));
}

#[tokio::test]
async fn disabled_capabilities_are_never_negotiated() {
    let (url, log) = spawn_node(graphene_responder()).await;
    let manager = graphenerpc_ws::connect(&url, TIMEOUT, ApiFlags::only(Capability::Database), None)
        .await
        .unwrap();

    assert!(matches!(
        manager.history().unwrap_err(),
        RpcError::UnsupportedApi("history")
    ));

    let log = log.lock().unwrap();
    let negotiations: Vec<&str> = log
        .iter()
        .filter(|req| req["params"][0] == 1)
        .map(|req| req["params"][1].as_str().unwrap())
        .collect();
    assert_eq!(negotiations, ["database"]);
}

#[tokio::test]
async fn handshake_timeout_rejects_promptly() {
    // Accept at the TCP level (kernel backlog) but never answer the upgrade.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let start = Instant::now();
    let err = ConnectionManager::connect(&url, Duration::from_millis(50), ApiFlags::only(Capability::Database))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::ConnectTimeout { ms: 50, .. }));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn unparseable_url_is_a_construction_error() {
    let err = ConnectionManager::connect("not a url", Duration::from_secs(1), ApiFlags::only(Capability::Database))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Construction(_)));
}

#[tokio::test]
async fn chain_id_is_cached_once_and_stable() {
    let (url, log) = spawn_node(graphene_responder()).await;
    let manager = graphenerpc_ws::connect(&url, TIMEOUT, ApiFlags::only(Capability::Database), None)
        .await
        .unwrap();

    assert_eq!(manager.chain_id().unwrap(), CHAIN_ID);

    manager
        .database()
        .unwrap()
        .get_objects(&["2.1.0"])
        .await
        .unwrap();
    assert_eq!(manager.chain_id().unwrap(), CHAIN_ID);

    // Exactly one chain-id fetch, during init.
    let log = log.lock().unwrap();
    let fetches = log
        .iter()
        .filter(|req| req["params"][1] == "get_chain_id")
        .count();
    assert_eq!(fetches, 1);
}

#[tokio::test]
async fn calls_in_flight_fail_when_the_node_drops_the_socket() {
    let mut base = graphene_responder();
    let responder: Responder = Box::new(move |req: Value| {
        if req["params"][1] == "never_answered" {
            return vec![Message::Close(None)];
        }
        base(req)
    });

    let (url, _log) = spawn_node(responder).await;
    let manager = graphenerpc_ws::connect(&url, TIMEOUT, ApiFlags::only(Capability::Database), None)
        .await
        .unwrap();
    let db = manager.api(Capability::Database).unwrap();

    let err = db.exec("never_answered", vec![]).await.unwrap_err();
    assert!(matches!(err, RpcError::ConnectionClosed));

    // The transport stays closed; later calls fail the same way.
    let err = db.exec("anything", vec![]).await.unwrap_err();
    assert!(matches!(err, RpcError::ConnectionClosed));
}

#[tokio::test]
async fn call_ids_start_at_one_and_strictly_increase() {
    let (url, log) = spawn_node(graphene_responder()).await;
    let manager = graphenerpc_ws::connect(&url, TIMEOUT, ApiFlags::only(Capability::Database), None)
        .await
        .unwrap();
    let db = manager.api(Capability::Database).unwrap();

    db.exec("a", vec![]).await.unwrap();
    db.exec("b", vec![]).await.unwrap();
    db.exec("c", vec![]).await.unwrap();

    let ids: Vec<u64> = log
        .lock()
        .unwrap()
        .iter()
        .map(|req| req["id"].as_u64().unwrap())
        .collect();
    // Negotiation, chain-id fetch, then the three data calls.
    assert_eq!(ids, [1, 2, 3, 4, 5]);
}
