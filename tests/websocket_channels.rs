mod common;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;

use finagent::api::{create_router, AppState};
use finagent::config::SequencerSettings;
use finagent::domain::ChatEvent;
use finagent::{AgentApiClient, CancelFlag, ChatSocket, DryRunGateway, StrategyKind};

async fn chat_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(chat_session)
}

/// Answers one user message with a tool call, a junk frame, then the echo,
/// and closes.
async fn chat_session(mut socket: WebSocket) {
    let Some(Ok(Message::Text(text))) = socket.recv().await else {
        return;
    };
    let incoming: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    let content = incoming["content"].as_str().unwrap_or_default().to_string();
    let role = incoming["role"].as_str().unwrap_or_default().to_string();

    let frames = [
        json!({"type": "tool_call", "data": {"name": "get_pools"}}).to_string(),
        "not json".to_string(),
        json!({"type": "content", "data": format!("{role} said: {content}")}).to_string(),
    ];
    for frame in frames {
        if socket.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

#[tokio::test]
async fn chat_socket_round_trip() {
    let app = Router::new().route("/ws/chat", get(chat_handler));
    let addr = common::spawn_server(app).await;

    let mut socket = ChatSocket::connect(&common::ws_url(addr, "/ws/chat"))
        .await
        .unwrap();
    socket.send_user("what is my APY?").await.unwrap();

    match socket.next_event().await.unwrap() {
        Some(ChatEvent::ToolCall(call)) => assert_eq!(call["name"], "get_pools"),
        other => panic!("expected tool call, got {other:?}"),
    }
    assert_eq!(
        socket.next_event().await.unwrap(),
        Some(ChatEvent::Content("user said: what is my APY?".to_string()))
    );
    assert_eq!(socket.next_event().await.unwrap(), None);
}

#[tokio::test]
async fn chat_socket_rejects_bad_url() {
    let err = ChatSocket::connect("not a url").await.err().unwrap();
    assert!(err.is_validation());
}

#[tokio::test]
async fn strategy_stream_sends_snapshots() {
    let settings = SequencerSettings {
        step_delay_ms: 0,
        cooldown_ms: 3_600_000,
        ..Default::default()
    };
    let state = AppState::new(
        Arc::new(DryRunGateway::new()),
        AgentApiClient::new("http://127.0.0.1:9/rep", "http://127.0.0.1:9/cred").unwrap(),
        &settings,
        "https://sepolia.etherscan.io",
    );
    let sequencer = state.sequencers[&StrategyKind::Buffet].clone();
    let addr = common::spawn_server(create_router(state)).await;

    let (mut stream, _) =
        tokio_tungstenite::connect_async(common::ws_url(addr, "/ws/strategies/buffet"))
            .await
            .unwrap();

    let first = next_json(&mut stream).await;
    assert_eq!(first["phase"], "idle");
    assert_eq!(first["strategy"], "buffet");

    sequencer.run(Some("25"), CancelFlag::new()).await.unwrap();

    // The stream coalesces updates; it must eventually show the finished run
    loop {
        let snapshot = next_json(&mut stream).await;
        if snapshot["phase"] == "succeeded" {
            assert_eq!(snapshot["steps"][0]["status"], "complete");
            break;
        }
    }
}

async fn next_json<S>(stream: &mut S) -> Value
where
    S: futures_util::Stream<
            Item = Result<
                tokio_tungstenite::tungstenite::Message,
                tokio_tungstenite::tungstenite::Error,
            >,
        > + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(tokio_tungstenite::tungstenite::Message::Text(text))) => {
                return serde_json::from_str(&text).unwrap();
            }
            Some(Ok(_)) => continue,
            other => panic!("stream ended: {other:?}"),
        }
    }
}
