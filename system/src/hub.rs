use std::any::Any;

use serde_json::Value;

use crate::channel::{Channel, Handler, HandlerTable};

/// Presents several transports as one logical channel.
///
/// The hub's registry is the single source of truth for handlers: every
/// channel added later, and every peer a channel accepts later, is populated
/// from it.
pub struct Hub<S: 'static> {
    registry: HandlerTable<S>,
    channels: Vec<Box<dyn Channel<S>>>,
}

impl<S: 'static> Hub<S> {
    pub fn new() -> Self {
        Self {
            registry: HandlerTable::new(),
            channels: Vec::new(),
        }
    }

    pub fn add_channel<C: Channel<S> + 'static>(&mut self, mut channel: C) {
        channel.install(&self.registry);
        self.channels.push(Box::new(channel));
    }

    pub fn registry(&self) -> &HandlerTable<S> {
        &self.registry
    }

    pub fn channel_mut<C: Channel<S> + 'static>(&mut self) -> Option<&mut C> {
        self.channels
            .iter_mut()
            .find_map(|channel| channel.as_any_mut().downcast_mut::<C>())
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl<S: 'static> Default for Hub<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static> Channel<S> for Hub<S> {
    fn on(&mut self, event: &str, handler: Handler<S>) {
        self.registry.on(event, handler.clone());
        for channel in self.channels.iter_mut() {
            channel.on(event, handler.clone());
        }
    }

    fn emit(&mut self, event: &str, data: &Value) {
        for channel in self.channels.iter_mut() {
            channel.emit(event, data);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
