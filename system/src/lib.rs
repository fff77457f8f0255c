pub extern crate serde;
pub extern crate serde_json;

mod channel;
mod client_replica;
mod error;
mod hub;
mod message;
mod router;
mod session_state;
mod types;

pub use channel::{Channel, Handler, HandlerTable};
pub use client_replica::ClientReplica;
pub use error::EventError;
pub use hub::Hub;
pub use message::{
    decode, event, ClientEvent, Delta, DownPayload, Envelope, MovePayload, ServerEvent, Snapshot,
    UserPayload,
};
pub use router::EventRouter;
pub use session_state::SessionState;
pub use types::{Pencil, Pencils, Point, Stroke, StrokeId, Username};
