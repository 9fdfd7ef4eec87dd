//! Real-time chat channel client.
//!
//! The channel speaks JSON text frames: user messages go out as
//! `{"role":"user","content":..}`, assistant output comes back as
//! `{"type":"content","data":..}` or `{"type":"tool_call","data":..}`.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::{ChatEvent, ChatOutbound};
use crate::error::{FinAgentError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ChatSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: Url,
}

impl ChatSocket {
    /// Open the chat channel
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let url = Url::parse(ws_url)
            .map_err(|e| FinAgentError::Validation(format!("Invalid WebSocket URL: {}", e)))?;

        info!("Connecting to chat channel: {}", url);

        let (stream, _) = timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| FinAgentError::Internal("WebSocket connection timeout".to_string()))?
            .map_err(FinAgentError::WebSocket)?;

        info!("Chat channel connected");

        Ok(Self { stream, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send a user message
    pub async fn send_user(&mut self, content: &str) -> Result<()> {
        let msg = serde_json::to_string(&ChatOutbound::user(content))?;
        self.stream.send(Message::Text(msg)).await?;
        Ok(())
    }

    /// Wait for the next assistant event.
    ///
    /// Returns `Ok(None)` once the server closes the channel. Frames that are
    /// not chat events are skipped.
    pub async fn next_event(&mut self) -> Result<Option<ChatEvent>> {
        while let Some(msg) = self.stream.next().await {
            match msg? {
                Message::Text(text) => match serde_json::from_str::<ChatEvent>(&text) {
                    Ok(event) => return Ok(Some(event)),
                    Err(_) => {
                        let preview: String = text.chars().take(200).collect();
                        warn!("Unknown chat frame: {}", preview);
                    }
                },
                Message::Ping(data) => {
                    self.stream.send(Message::Pong(data)).await?;
                }
                Message::Close(_) => {
                    info!("Chat channel closed by server");
                    return Ok(None);
                }
                other => debug!("Ignoring chat frame: {:?}", other),
            }
        }

        Ok(None)
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
