use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use system::{ClientEvent, Envelope};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::{Inbound, Transport, INBOUND_BUFFER};
use crate::error::{ClientError, Result};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Persistent WebSocket connection to `/ws`.
pub struct PushTransport {
    sink: Mutex<WsSink>,
    cancel: CancellationToken,
}

impl PushTransport {
    pub async fn connect(url: &str) -> Result<(Self, Inbound)> {
        let (ws, _) = connect_async(url).await?;
        log::info!("Connected to {}", url);
        let (sink, mut stream) = ws.split();
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = token.cancelled() => break,
                    message = stream.next() => message,
                };
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<Envelope>(text.as_str()) {
                            Ok(envelope) => {
                                if tx.send(envelope).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => log::warn!("Dropped malformed frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("WebSocket receive failed: {}", e);
                        break;
                    }
                }
            }
            log::debug!("push receive loop - terminated");
        });

        Ok((
            Self {
                sink: Mutex::new(sink),
                cancel,
            },
            rx,
        ))
    }
}

#[async_trait]
impl Transport for PushTransport {
    async fn emit(&self, event: &ClientEvent) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ClientError::Closed);
        }
        let frame = serde_json::to_string(&event.to_envelope()?)?;
        self.sink.lock().await.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    async fn close(&self) {
        self.cancel.cancel();
        if let Err(e) = self.sink.lock().await.close().await {
            log::debug!("WebSocket close failed: {}", e);
        }
    }
}
