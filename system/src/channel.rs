use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::EventError;
use crate::message::Envelope;

/// Applies one inbound event to the state it is given and returns the
/// envelope to broadcast, if any.
pub type Handler<S> =
    Arc<dyn Fn(&mut S, Value) -> Result<Option<Envelope>, EventError> + Send + Sync>;

/// One handler per event name. The last registration for a name wins.
pub struct HandlerTable<S> {
    handlers: HashMap<String, Handler<S>>,
}

impl<S> HandlerTable<S> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn on(&mut self, event: &str, handler: Handler<S>) {
        if self.handlers.insert(event.to_owned(), handler).is_some() {
            log::debug!("Replaced handler for `{}`", event);
        }
    }

    pub fn get(&self, event: &str) -> Option<&Handler<S>> {
        self.handlers.get(event)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Handler<S>)> {
        self.handlers
            .iter()
            .map(|(event, handler)| (event.as_str(), handler))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn dispatch(
        &self,
        state: &mut S,
        envelope: Envelope,
    ) -> Result<Option<Envelope>, EventError> {
        let handler = self
            .handlers
            .get(&envelope.event)
            .ok_or_else(|| EventError::UnknownEvent(envelope.event.clone()))?;
        handler(state, envelope.data)
    }
}

impl<S> Default for HandlerTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for HandlerTable<S> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<S> fmt::Debug for HandlerTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<_> = self.handlers.keys().collect();
        events.sort();
        f.debug_struct("HandlerTable")
            .field("events", &events)
            .finish()
    }
}

/// A transport as seen by the event router: register handlers, broadcast events.
pub trait Channel<S>: Send {
    fn on(&mut self, event: &str, handler: Handler<S>);

    /// Delivers `data` to every interested peer, eventually.
    fn emit(&mut self, event: &str, data: &Value);

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn install(&mut self, registry: &HandlerTable<S>) {
        for (event, handler) in registry.iter() {
            self.on(event, handler.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counter(step: i64) -> Handler<i64> {
        Arc::new(
            move |state: &mut i64, _data: Value| -> Result<Option<Envelope>, EventError> {
                *state += step;
                Ok(None)
            },
        )
    }

    #[test]
    fn last_registration_wins() {
        let mut table = HandlerTable::new();
        table.on("bump", counter(1));
        table.on("bump", counter(10));

        let mut state = 0;
        table.dispatch(&mut state, Envelope::empty("bump")).unwrap();
        assert_eq!(state, 10);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unknown_event_is_an_error() {
        let table = HandlerTable::<i64>::new();
        let mut state = 0;
        let result = table.dispatch(&mut state, Envelope::empty("nope"));
        assert!(matches!(result, Err(EventError::UnknownEvent(_))));
    }

    #[test]
    fn handler_receives_payload_and_may_reply() {
        let mut table = HandlerTable::new();
        table.on(
            "echo",
            Arc::new(
                |state: &mut i64, data: Value| -> Result<Option<Envelope>, EventError> {
                    *state = data["n"].as_i64().unwrap_or_default();
                    Ok(Some(Envelope::empty("echoed")))
                },
            ),
        );

        let mut state = 0;
        let reply = table
            .dispatch(
                &mut state,
                Envelope {
                    event: "echo".into(),
                    data: json!({ "n": 42 }),
                },
            )
            .unwrap();
        assert_eq!(state, 42);
        assert_eq!(reply, Some(Envelope::empty("echoed")));
    }
}
