use std::num::Wrapping;

use system::{Channel, Envelope, EventError, EventRouter, Hub, SessionState, Snapshot};
use tokio::sync::mpsc::{channel, Sender};
use tokio::sync::oneshot;

use crate::config::Config;
use crate::connection::ConnectionEvent;
use crate::long_poll::{LongPollChannel, PollSlot};
use crate::push::{ConnectionId, ConnectionTx, PushChannel};

pub type ServerTx = Sender<ServerCommand>;

/// Which transport an inbound event arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Push(ConnectionId),
    LongPoll,
}

#[derive(Debug)]
pub enum ServerCommand {
    Connect {
        tx: ConnectionTx,
    },
    Disconnect {
        from: ConnectionId,
    },
    Inbound {
        origin: Origin,
        envelope: Envelope,
        /// Resolved once the event has been applied.
        ack: Option<oneshot::Sender<()>>,
    },
    Poll {
        slot: PollSlot,
    },
    Snapshot {
        tx: oneshot::Sender<Snapshot>,
    },
}

/// Sole owner of the session state. Commands are applied one at a time.
struct Server {
    state: SessionState,
    hub: Hub<SessionState>,
    connection_id_source: Wrapping<ConnectionId>,
}

impl Server {
    fn new() -> Self {
        let mut hub = Hub::new();
        hub.add_channel(PushChannel::new());
        hub.add_channel(LongPollChannel::new());
        EventRouter::install(&mut hub);

        Self {
            state: SessionState::new(),
            hub,
            connection_id_source: Wrapping(0),
        }
    }

    fn handle_command(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::Connect { tx } => {
                let connection_id = self.new_connection_id();
                let handlers = self.hub.registry().clone();
                let push = self.push();
                push.connect(connection_id, tx, handlers);
                push.send(&connection_id, ConnectionEvent::Connected { connection_id });
            }
            ServerCommand::Disconnect { from } => {
                // Pencils are only removed by an explicit `leave`.
                self.push().disconnect(&from);
            }
            ServerCommand::Inbound {
                origin,
                envelope,
                ack,
            } => {
                self.handle_inbound(origin, envelope);
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
            ServerCommand::Poll { slot } => self.long_poll().push_slot(slot),
            ServerCommand::Snapshot { tx } => {
                let _ = tx.send(self.state.snapshot());
            }
        }
    }

    fn handle_inbound(&mut self, origin: Origin, envelope: Envelope) {
        log::debug!("Ingress {:?} {:?}", origin, envelope);
        let handlers = match origin {
            Origin::Push(connection_id) => match self.push().handlers(&connection_id) {
                Some(handlers) => handlers,
                None => {
                    log::warn!(
                        "Dropped `{}` from unknown connection {}",
                        envelope.event,
                        connection_id
                    );
                    return;
                }
            },
            Origin::LongPoll => self.long_poll().handlers(),
        };
        let handler = handlers.get(&envelope.event).cloned();

        let dispatched = match handler {
            Some(handler) => handler(&mut self.state, envelope.data),
            None => Err(EventError::UnknownEvent(envelope.event)),
        };
        match dispatched {
            Ok(Some(reply)) => {
                log::debug!("Egress {:?}", reply);
                self.hub.emit(&reply.event, &reply.data);
            }
            Ok(None) => {}
            Err(e @ EventError::Encode { .. }) => log::error!("{}", e),
            Err(e) => log::warn!("Dropped event from {:?}: {}", origin, e),
        }
    }

    fn push(&mut self) -> &mut PushChannel {
        self.hub
            .channel_mut::<PushChannel>()
            .expect("push channel is registered in Server::new")
    }

    fn long_poll(&mut self) -> &mut LongPollChannel {
        self.hub
            .channel_mut::<LongPollChannel>()
            .expect("long-poll channel is registered in Server::new")
    }

    fn new_connection_id(&mut self) -> ConnectionId {
        // After wrapping around, ids still held by open connections are skipped.
        loop {
            self.connection_id_source += Wrapping(1);
            let connection_id = self.connection_id_source.0;
            if !self.push().contains(&connection_id) {
                return connection_id;
            }
        }
    }
}

pub fn spawn_server(config: &Config) -> ServerTx {
    let (srv_tx, mut srv_rx) = channel::<ServerCommand>(config.command_buffer);

    tokio::spawn(async move {
        let mut server = Box::new(Server::new());
        log::info!("server task - started");

        while let Some(command) = srv_rx.recv().await {
            server.handle_command(command);
        }
        log::info!("server task - terminated");
    });

    srv_tx
}
