use crate::weather::{types::WeatherReading, WeatherService};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("JSON encoding failed: {0}")]
    JsonEncoding(#[from] serde_json::Error),
}

/// Why a push session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Cancelled,
    Disconnected,
    SendFailed,
}

/// Client side of a push session.
#[async_trait]
pub trait ReadingSink: Send {
    async fn push(&mut self, reading: &WeatherReading) -> Result<(), BroadcastError>;

    /// Resolves once the peer has gone away. Must be safe to drop while pending.
    async fn closed(&mut self);

    async fn close(&mut self);
}

pub struct WebSocketSink {
    socket: WebSocket,
}

impl WebSocketSink {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl ReadingSink for WebSocketSink {
    async fn push(&mut self, reading: &WeatherReading) -> Result<(), BroadcastError> {
        let text = serde_json::to_string(reading)?;
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| BroadcastError::SendFailed(e.to_string()))
    }

    async fn closed(&mut self) {
        // Client messages carry nothing; they are read only to notice the close.
        loop {
            match self.socket.recv().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.send(Message::Close(None)).await {
            tracing::debug!("WebSocket close frame not delivered: {}", e);
        }
    }
}

/// Periodically pushes the default city's reading to one client.
pub struct Broadcaster {
    weather: Arc<WeatherService>,
    interval: Duration,
}

impl Broadcaster {
    pub fn new(weather: Arc<WeatherService>, interval: Duration) -> Self {
        Self { weather, interval }
    }

    /// Fetch, push, wait; repeat until the sink fails, the client leaves, or
    /// `cancel` fires. The sink is closed before returning.
    pub async fn run<S: ReadingSink>(&self, sink: &mut S, cancel: CancellationToken) -> SessionEnd {
        let end = self.push_until_closed(sink, &cancel).await;
        cancel.cancel();
        sink.close().await;
        tracing::info!("WebSocket session ended: {:?}", end);
        end
    }

    async fn push_until_closed<S: ReadingSink>(
        &self,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        loop {
            let reading = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                reading = self.weather.current_default() => reading,
            };

            if let Err(e) = sink.push(&reading).await {
                tracing::warn!("WebSocket push failed: {}", e);
                return SessionEnd::SendFailed;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                _ = sink.closed() => return SessionEnd::Disconnected,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
