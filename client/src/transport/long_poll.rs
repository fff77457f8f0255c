use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use system::{ClientEvent, Envelope};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Inbound, Transport, INBOUND_BUFFER};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
struct Ack {
    message: String,
}

/// Emulates a push channel with `POST /emit` and a `GET /poll` loop that is
/// reissued as soon as each response arrives.
pub struct LongPollTransport {
    http: reqwest::Client,
    emit_url: String,
    cancel: CancellationToken,
}

impl LongPollTransport {
    pub fn connect(config: &ClientConfig) -> (Self, Inbound) {
        let http = reqwest::Client::new();
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let cancel = CancellationToken::new();

        tokio::spawn(poll_loop(
            http.clone(),
            config.url("/poll"),
            tx,
            cancel.clone(),
        ));

        (
            Self {
                http,
                emit_url: config.url("/emit"),
                cancel,
            },
            rx,
        )
    }
}

async fn poll_loop(
    http: reqwest::Client,
    poll_url: String,
    tx: mpsc::Sender<Envelope>,
    cancel: CancellationToken,
) {
    log::debug!("poll loop - started");
    loop {
        let polled = tokio::select! {
            _ = cancel.cancelled() => break,
            polled = poll_once(&http, &poll_url) => polled,
        };
        match polled {
            Ok(Some(envelope)) => {
                if tx.send(envelope).await.is_err() {
                    break;
                }
            }
            // Keepalive; poll again.
            Ok(None) => {}
            Err(e) => {
                log::warn!("Poll failed: {}", e);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }
    log::debug!("poll loop - terminated");
}

async fn poll_once(http: &reqwest::Client, poll_url: &str) -> Result<Option<Envelope>> {
    let response = http.get(poll_url).send().await?.error_for_status()?;
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(None);
    }
    Ok(Some(response.json::<Envelope>().await?))
}

#[async_trait]
impl Transport for LongPollTransport {
    async fn emit(&self, event: &ClientEvent) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ClientError::Closed);
        }
        let ack = self
            .http
            .post(&self.emit_url)
            .json(&event.to_envelope()?)
            .send()
            .await?
            .error_for_status()?
            .json::<Ack>()
            .await?;
        log::trace!("{} acknowledged: {}", event.name(), ack.message);
        Ok(())
    }

    async fn close(&self) {
        self.cancel.cancel();
    }
}
