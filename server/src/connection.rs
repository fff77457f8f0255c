use actix::fut::{wrap_future, ActorFutureExt};
use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use system::serde_json;
use system::Envelope;
use tokio::sync::mpsc::error::SendError;

use crate::config::Config;
use crate::push::ConnectionId;
use crate::server::{Origin, ServerCommand, ServerTx};

#[derive(Debug)]
pub enum ConnectionEvent {
    Connected { connection_id: ConnectionId },
    /// Serialized envelope, written as one text frame.
    Frame(String),
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ConnectionEvent);

enum ConnectionState {
    Idle,
    Connected(ConnectionId),
}

struct ConnectionActor {
    state: ConnectionState,
    srv_tx: ServerTx,
    peer_buffer: usize,
    /// Envelopes that arrived before the server assigned an id.
    early: Vec<Envelope>,
}

impl ConnectionActor {
    /// Hands `commands` to the server in order. The actor processes nothing
    /// else, inbound frames included, until the server queue accepted them all.
    fn send_to_server(&self, ctx: &mut ws::WebsocketContext<Self>, commands: Vec<ServerCommand>) {
        let srv_tx = self.srv_tx.clone();
        let sent = async move {
            for command in commands {
                srv_tx.send(command).await?;
            }
            Ok::<(), SendError<ServerCommand>>(())
        };
        ctx.wait(wrap_future::<_, Self>(sent).map(|result, _, ctx| {
            if result.is_err() {
                log::warn!("Server task is gone; closing connection");
                ctx.stop();
            }
        }));
    }

    fn forward(
        &self,
        ctx: &mut ws::WebsocketContext<Self>,
        from: ConnectionId,
        envelopes: Vec<Envelope>,
    ) {
        let commands = envelopes
            .into_iter()
            .map(|envelope| {
                log::debug!("Ingress {:?}", envelope);
                ServerCommand::Inbound {
                    origin: Origin::Push(from),
                    envelope,
                    ack: None,
                }
            })
            .collect();
        self.send_to_server(ctx, commands);
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<ConnectionEvent>(self.peer_buffer);

        self.send_to_server(ctx, vec![ServerCommand::Connect { tx }]);

        let addr = ctx.address().recipient();

        tokio::spawn(async move {
            log::debug!("connection green thread - started");
            while let Some(event) = rx.recv().await {
                if addr.send(ConnectionActorMessage(event)).await.is_err() {
                    break;
                }
            }
            log::debug!("connection green thread - terminated");
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        if let ConnectionState::Connected(id) = self.state {
            let srv_tx = self.srv_tx.clone();
            tokio::spawn(async move {
                if srv_tx.send(ServerCommand::Disconnect { from: id }).await.is_err() {
                    log::debug!("Server task gone before disconnect of {}", id);
                }
            });
        }

        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<Envelope>(&text) {
                Ok(envelope) => match self.state {
                    ConnectionState::Connected(from) => self.forward(ctx, from, vec![envelope]),
                    ConnectionState::Idle => self.early.push(envelope),
                },
                Err(e) => log::warn!("Dropped malformed frame: {}", e),
            },
            Ok(ws::Message::Binary(bin)) => {
                log::warn!("Dropped binary frame ({} bytes)", bin.len());
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                log::warn!("WebSocket protocol error: {}", e);
                ctx.stop();
            }
            _ => (),
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        match msg.0 {
            ConnectionEvent::Connected { connection_id } => {
                self.state = ConnectionState::Connected(connection_id);
                let early = std::mem::take(&mut self.early);
                if !early.is_empty() {
                    self.forward(ctx, connection_id, early);
                }
            }
            ConnectionEvent::Frame(frame) => ctx.text(frame),
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: web::Data<ServerTx>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    ws::start(
        ConnectionActor {
            srv_tx: srv_tx.get_ref().clone(),
            state: ConnectionState::Idle,
            peer_buffer: config.peer_buffer,
            early: Vec::new(),
        },
        &req,
        stream,
    )
}
