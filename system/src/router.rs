use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::channel::Channel;
use crate::error::EventError;
use crate::message::{decode, event, DownPayload, Envelope, MovePayload, UserPayload};
use crate::session_state::SessionState;

/// Maps inbound event names onto [`SessionState`] mutations.
pub struct EventRouter;

impl EventRouter {
    /// Registers the five drawing events on `channel`.
    pub fn install<C: Channel<SessionState> + ?Sized>(channel: &mut C) {
        channel.on(event::MOVE, Arc::new(on_move));
        channel.on(event::DOWN, Arc::new(on_down));
        channel.on(event::UP, Arc::new(on_up));
        channel.on(event::CLEAR, Arc::new(on_clear));
        channel.on(event::LEAVE, Arc::new(on_leave));
    }
}

fn on_move(state: &mut SessionState, data: Value) -> Result<Option<Envelope>, EventError> {
    let MovePayload { position, username } = decode(event::MOVE, data)?;
    let delta = state.move_pencil(&username, position);
    encode(event::UPDATE, &delta).map(Some)
}

fn on_down(state: &mut SessionState, data: Value) -> Result<Option<Envelope>, EventError> {
    let DownPayload {
        position,
        color,
        username,
    } = decode(event::DOWN, data)?;
    let delta = state.start_stroke(&username, position, color)?;
    encode(event::UPDATE, &delta).map(Some)
}

fn on_up(state: &mut SessionState, data: Value) -> Result<Option<Envelope>, EventError> {
    let UserPayload { username } = decode(event::UP, data)?;
    state.end_stroke(&username)?;
    Ok(None)
}

fn on_clear(state: &mut SessionState, _data: Value) -> Result<Option<Envelope>, EventError> {
    state.clear();
    Ok(Some(Envelope::empty(event::CLEAR)))
}

fn on_leave(state: &mut SessionState, data: Value) -> Result<Option<Envelope>, EventError> {
    let UserPayload { username } = decode(event::LEAVE, data)?;
    let delta = state.leave(&username);
    encode(event::UPDATE, &delta).map(Some)
}

fn encode<T: Serialize>(name: &str, data: &T) -> Result<Envelope, EventError> {
    Envelope::new(name, data).map_err(|source| EventError::Encode {
        event: name.to_owned(),
        source,
    })
}
