use std::any::Any;
use std::collections::HashMap;

use system::serde_json::{self, Value};
use system::{Channel, Envelope, Handler, HandlerTable, SessionState};
use tokio::sync::mpsc::error::TrySendError;

use crate::connection::ConnectionEvent;

pub type ConnectionId = u32;
pub type ConnectionTx = tokio::sync::mpsc::Sender<ConnectionEvent>;

struct Peer {
    tx: ConnectionTx,
    handlers: HandlerTable<SessionState>,
}

/// WebSocket side of the hub: one outbound queue and one handler table per peer.
pub struct PushChannel {
    peers: HashMap<ConnectionId, Peer>,
}

impl PushChannel {
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    pub fn connect(
        &mut self,
        connection_id: ConnectionId,
        tx: ConnectionTx,
        handlers: HandlerTable<SessionState>,
    ) {
        log::info!("Connection {} opened", connection_id);
        self.peers.insert(connection_id, Peer { tx, handlers });
    }

    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> bool {
        let removed = self.peers.remove(connection_id).is_some();
        if removed {
            log::info!("Connection {} closed", connection_id);
        }
        removed
    }

    pub fn handlers(&self, connection_id: &ConnectionId) -> Option<&HandlerTable<SessionState>> {
        self.peers.get(connection_id).map(|peer| &peer.handlers)
    }

    pub fn send(&mut self, connection_id: &ConnectionId, event: ConnectionEvent) {
        if let Some(peer) = self.peers.get(connection_id) {
            if let Err(e) = peer.tx.try_send(event) {
                log::warn!("Failed to reach connection {}: {}", connection_id, e);
            }
        } else {
            log::warn!("No connection {}", connection_id);
        }
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.peers.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Default for PushChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel<SessionState> for PushChannel {
    fn on(&mut self, event: &str, handler: Handler<SessionState>) {
        for peer in self.peers.values_mut() {
            peer.handlers.on(event, handler.clone());
        }
    }

    fn emit(&mut self, event: &str, data: &Value) {
        let frame = match serde_json::to_string(&Envelope {
            event: event.to_owned(),
            data: data.clone(),
        }) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Failed to encode `{}`: {}", event, e);
                return;
            }
        };

        let mut closed = Vec::new();
        for (connection_id, peer) in self.peers.iter() {
            match peer.tx.try_send(ConnectionEvent::Frame(frame.clone())) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!("Connection {} is lagging; dropped `{}`", connection_id, event)
                }
                Err(TrySendError::Closed(_)) => closed.push(*connection_id),
            }
        }
        for connection_id in closed {
            self.disconnect(&connection_id);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use system::serde_json::json;
    use system::EventRouter;
    use tokio::sync::mpsc;

    fn frame_of(event: ConnectionEvent) -> Envelope {
        match event {
            ConnectionEvent::Frame(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn emit_fans_out_to_every_peer() {
        let mut push = PushChannel::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        push.connect(1, tx1, HandlerTable::new());
        push.connect(2, tx2, HandlerTable::new());

        push.emit("clear", &json!({}));

        assert_eq!(frame_of(rx1.try_recv().unwrap()), Envelope::empty("clear"));
        assert_eq!(frame_of(rx2.try_recv().unwrap()), Envelope::empty("clear"));
    }

    #[test]
    fn closed_peers_are_forgotten() {
        let mut push = PushChannel::new();
        let (tx, rx) = mpsc::channel(4);
        push.connect(1, tx, HandlerTable::new());
        drop(rx);

        push.emit("clear", &json!({}));

        assert!(push.is_empty());
    }

    #[test]
    fn lagging_peer_loses_frames_but_stays_connected() {
        let mut push = PushChannel::new();
        let (tx, mut rx) = mpsc::channel(1);
        push.connect(1, tx, HandlerTable::new());

        push.emit("update", &json!({ "n": 1 }));
        push.emit("update", &json!({ "n": 2 }));

        assert_eq!(push.len(), 1);
        assert_eq!(frame_of(rx.try_recv().unwrap()).data, json!({ "n": 1 }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn each_connection_owns_its_handler_table() {
        let mut push = PushChannel::new();
        let (tx, _rx) = mpsc::channel(1);
        push.connect(7, tx, HandlerTable::new());

        EventRouter::install(&mut push);

        assert_eq!(push.handlers(&7).map(HandlerTable::len), Some(5));
        assert!(push.handlers(&8).is_none());
    }
}
