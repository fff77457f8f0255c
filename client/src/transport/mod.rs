use async_trait::async_trait;
use system::ClientEvent;

use crate::error::Result;

mod long_poll;
mod push;

pub use long_poll::LongPollTransport;
pub use push::PushTransport;

/// Inbound side of a transport: every envelope the server broadcast to us.
pub type Inbound = tokio::sync::mpsc::Receiver<system::Envelope>;

const INBOUND_BUFFER: usize = 256;

/// Client end of a channel. Implementations deliver server broadcasts to
/// the [`Inbound`] receiver returned when they connect.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn emit(&self, event: &ClientEvent) -> Result<()>;

    /// Stops receiving. Further emits may fail.
    async fn close(&self);
}
