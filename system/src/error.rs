use crate::types::Username;
use thiserror::Error;

/// Reasons an inbound event is dropped instead of applied.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed `{event}` payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no handler registered for event `{0}`")]
    UnknownEvent(String),

    #[error("no pencil for user `{0}`")]
    UnknownPencil(Username),

    #[error("failed to encode `{event}`: {source}")]
    Encode {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}
