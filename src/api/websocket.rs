use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::api::{state::AppState, types::ApiResult};
use crate::sequencer::StrategyRun;

/// GET /ws/strategies/:kind -- stream run snapshots as they change
pub async fn strategy_stream_handler(
    ws: WebSocketUpgrade,
    Path(kind): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let rx = state.sequencer(&kind)?.subscribe();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, rx)))
}

async fn handle_socket(socket: WebSocket, mut rx: watch::Receiver<StrategyRun>) {
    let (mut sender, mut receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        loop {
            let json = {
                let run = rx.borrow_and_update();
                match serde_json::to_string(&*run) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize run snapshot: {}", e);
                        break;
                    }
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Close(_) = msg {
            break;
        }
        debug!("Ignoring client frame on strategy stream");
    }

    send_task.abort();
    info!("Strategy stream closed");
}
