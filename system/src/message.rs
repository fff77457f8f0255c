use std::convert::TryFrom;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventError;
use crate::types::{Pencils, Point, Stroke, Username};

/// Event names shared by both transports.
pub mod event {
    pub const MOVE: &str = "move";
    pub const DOWN: &str = "down";
    pub const UP: &str = "up";
    pub const CLEAR: &str = "clear";
    pub const LEAVE: &str = "leave";
    pub const UPDATE: &str = "update";
}

/// The unit every transport carries: a named event and its JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl Envelope {
    pub fn new<T: Serialize>(event: &str, data: &T) -> serde_json::Result<Self> {
        Ok(Self {
            event: event.to_owned(),
            data: serde_json::to_value(data)?,
        })
    }

    pub fn empty(event: &str) -> Self {
        Self {
            event: event.to_owned(),
            data: empty_object(),
        }
    }
}

/// Decodes the payload of `event`, mapping failures to [`EventError::Malformed`].
pub fn decode<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, EventError> {
    serde_json::from_value(data).map_err(|source| EventError::Malformed {
        event: event.to_owned(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovePayload {
    pub position: Point,
    pub username: Username,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownPayload {
    pub position: Point,
    pub color: String,
    pub username: Username,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    pub username: Username,
}

/// Partial update: new or appended-to strokes plus every pencil.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub strokes: Vec<Stroke>,
    pub pencils: Pencils,
}

impl Delta {
    /// Folds a newer delta into this one: its strokes supersede ours by id
    /// and its pencil snapshot replaces ours.
    pub fn merge(&mut self, newer: Delta) {
        self.strokes
            .retain(|stroke| newer.strokes.iter().all(|fresh| fresh.id != stroke.id));
        self.strokes.extend(newer.strokes);
        self.pencils = newer.pencils;
    }
}

/// Full board state served for the initial sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub lines: Vec<Stroke>,
    pub pencils: Pencils,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Move(MovePayload),
    Down(DownPayload),
    Up(UserPayload),
    Clear,
    Leave(UserPayload),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Move(_) => event::MOVE,
            ClientEvent::Down(_) => event::DOWN,
            ClientEvent::Up(_) => event::UP,
            ClientEvent::Clear => event::CLEAR,
            ClientEvent::Leave(_) => event::LEAVE,
        }
    }

    pub fn to_envelope(&self) -> serde_json::Result<Envelope> {
        match self {
            ClientEvent::Move(payload) => Envelope::new(self.name(), payload),
            ClientEvent::Down(payload) => Envelope::new(self.name(), payload),
            ClientEvent::Up(payload) | ClientEvent::Leave(payload) => {
                Envelope::new(self.name(), payload)
            }
            ClientEvent::Clear => Ok(Envelope::empty(self.name())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Update(Delta),
    Clear,
}

impl ServerEvent {
    pub fn to_envelope(&self) -> serde_json::Result<Envelope> {
        match self {
            ServerEvent::Update(delta) => Envelope::new(event::UPDATE, delta),
            ServerEvent::Clear => Ok(Envelope::empty(event::CLEAR)),
        }
    }
}

impl TryFrom<Envelope> for ServerEvent {
    type Error = EventError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.event.as_str() {
            event::UPDATE => decode(event::UPDATE, envelope.data).map(ServerEvent::Update),
            event::CLEAR => Ok(ServerEvent::Clear),
            _ => Err(EventError::UnknownEvent(envelope.event)),
        }
    }
}
