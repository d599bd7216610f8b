//! Tests for the HTTP problem endpoint and the WebSocket duel endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tower::ServiceExt;

use two_duel::{
    AppState, Backends, ChannelGateway, DuelService, MatchmakingConfig, MemoryQueue, MemoryStore,
    check, router, serve_listener,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

fn app() -> axum::Router {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(ChannelGateway::new());
    let service = DuelService::new(
        Backends {
            rooms: store.clone(),
            users: store,
            queue: Arc::new(MemoryQueue::new()),
            gateway: gateway.clone(),
        },
        MatchmakingConfig::default(),
    );
    router(AppState::new(Arc::new(service), gateway))
}

async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app()
        .oneshot(Request::get(uri).body(Body::empty()).expect("Bad request"))
        .await
        .expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Body failed")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).expect("Body is not JSON");
    (status, json)
}

fn terms(json: &serde_json::Value) -> Vec<i64> {
    json["problem"]
        .as_array()
        .expect("problem is an array")
        .iter()
        .map(|v| v.as_i64().expect("term is an integer"))
        .collect()
}

#[tokio::test]
async fn test_problem_defaults_to_three_terms() {
    let (status, json) = get("/problem").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(terms(&json).len(), 3);
}

#[tokio::test]
async fn test_problem_with_length() {
    let (status, json) = get("/problem?num=7").await;
    assert_eq!(status, StatusCode::OK);
    let problem = terms(&json);
    assert_eq!(problem.len(), 7);
    assert!(problem[1..].iter().all(|t| (0..10).contains(t)));
}

#[tokio::test]
async fn test_single_term_problem_is_the_target() {
    let (status, json) = get("/problem?num=1").await;
    assert_eq!(status, StatusCode::OK);
    let problem = terms(&json);
    assert_eq!(problem, vec![2]);
    assert!(check(&problem, &[] as &[&str]));
}

#[tokio::test]
async fn test_problem_rejects_bad_lengths() {
    for uri in [
        "/problem?num=0",
        "/problem?num=11",
        "/problem?num=-4",
        "/problem?num=abc",
    ] {
        let (status, json) = get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json["message"], "invalid parameter!");
    }
}

/// Starts a server on an ephemeral port, returning its address and store.
async fn start_server() -> (SocketAddr, Arc<MemoryStore>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Bind failed");
    let addr = listener.local_addr().expect("No local address");

    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(ChannelGateway::new());
    let service = DuelService::new(
        Backends {
            rooms: store.clone(),
            users: store.clone(),
            queue: Arc::new(MemoryQueue::new()),
            gateway: gateway.clone(),
        },
        MatchmakingConfig::new(30, 0, 3),
    );
    let state = AppState::new(Arc::new(service), gateway);
    tokio::spawn(async move { serve_listener(listener, state).await });

    (addr, store)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("Connect failed");
    client
}

async fn send(client: &mut Client, body: &str) {
    client.send(Message::text(body)).await.expect("Send failed");
}

/// Next text frame as JSON, skipping control frames.
async fn next_json(client: &mut Client) -> serde_json::Value {
    loop {
        let frame = timeout(FRAME_TIMEOUT, client.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Socket ended")
            .expect("Socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("Frame is not JSON");
        }
    }
}

/// Waits for the server to close the socket.
async fn expect_closed(client: &mut Client) {
    loop {
        match timeout(FRAME_TIMEOUT, client.next())
            .await
            .expect("Timed out waiting for close")
        {
            None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return,
            Some(Ok(Message::Text(text))) => panic!("Unexpected frame {}", text.as_str()),
            Some(Ok(_)) => continue,
        }
    }
}

fn solve(problem: &[i64]) -> Vec<String> {
    let n = problem.len() - 1;
    (0..1u32 << n)
        .map(|mask| {
            (0..n)
                .map(|i| if mask & (1 << i) != 0 { "p" } else { "m" }.to_string())
                .collect::<Vec<_>>()
        })
        .find(|answers| check(problem, answers))
        .expect("Generated problems are solvable")
}

#[tokio::test]
async fn test_duel_over_websocket() {
    let (addr, store) = start_server().await;

    let mut alice = connect(addr).await;
    send(&mut alice, r#"{"level": 3}"#).await;
    assert_eq!(next_json(&mut alice).await["message"], "PLEASE_WAIT");

    let mut bob = connect(addr).await;
    send(&mut bob, r#"{"level": 3}"#).await;
    let alice_start = next_json(&mut alice).await;
    let bob_start = next_json(&mut bob).await;
    assert_eq!(alice_start["message"], "START_GAME");
    assert_eq!(alice_start, bob_start);

    send(&mut bob, "not json").await;
    let reply = next_json(&mut bob).await;
    assert_eq!(reply["error"], "MALFORMED_MESSAGE");

    let problem: Vec<i64> =
        serde_json::from_value(alice_start["data"].clone()).expect("data is a problem");
    let answer = serde_json::json!({ "answer": solve(&problem) }).to_string();
    send(&mut alice, &answer).await;
    assert_eq!(next_json(&mut alice).await["message"], "YOU_WIN");
    assert_eq!(next_json(&mut bob).await["message"], "YOU_LOSE");

    alice.close(None).await.expect("Close failed");
    expect_closed(&mut bob).await;

    for _ in 0..50 {
        if store.room_count().await == 0 && store.user_count().await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Room was not torn down");
}

#[tokio::test]
async fn test_lone_client_close_removes_waiting_room() {
    let (addr, store) = start_server().await;

    let mut alice = connect(addr).await;
    send(&mut alice, r#"{"level": 3}"#).await;
    assert_eq!(next_json(&mut alice).await["message"], "PLEASE_WAIT");
    assert_eq!(store.room_count().await, 1);

    alice.close(None).await.expect("Close failed");

    for _ in 0..50 {
        if store.room_count().await == 0 && store.user_count().await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Waiting room was not torn down");
}
