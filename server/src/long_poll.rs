use std::any::Any;
use std::collections::VecDeque;

use system::serde_json::Value;
use system::{Channel, Envelope, Handler, HandlerTable, SessionState};
use tokio::sync::oneshot;

/// Response slot of one suspended `GET /poll`.
pub type PollSlot = oneshot::Sender<Envelope>;

/// HTTP long-poll side of the hub.
///
/// An emit resolves exactly one pending slot, the oldest one still waiting.
/// With nobody polling the event is dropped rather than queued.
pub struct LongPollChannel {
    handlers: HandlerTable<SessionState>,
    pending: VecDeque<PollSlot>,
}

impl LongPollChannel {
    pub fn new() -> Self {
        Self {
            handlers: HandlerTable::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn handlers(&self) -> &HandlerTable<SessionState> {
        &self.handlers
    }

    pub fn push_slot(&mut self, slot: PollSlot) {
        // Pollers that timed out or went away.
        self.pending.retain(|pending| !pending.is_closed());
        self.pending.push_back(slot);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Default for LongPollChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel<SessionState> for LongPollChannel {
    fn on(&mut self, event: &str, handler: Handler<SessionState>) {
        self.handlers.on(event, handler);
    }

    fn emit(&mut self, event: &str, data: &Value) {
        let mut envelope = Envelope {
            event: event.to_owned(),
            data: data.clone(),
        };

        while let Some(slot) = self.pending.pop_front() {
            match slot.send(envelope) {
                Ok(()) => return,
                // Poller went away; try the next one.
                Err(returned) => envelope = returned,
            }
        }
        log::debug!("Dropped `{}`: no pending poll", event);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
