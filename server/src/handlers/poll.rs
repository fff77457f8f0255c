use actix_web::{web, Error, HttpResponse};
use serde::Serialize;
use system::Envelope;
use tokio::sync::oneshot;

use super::{send, server_gone};
use crate::config::Config;
use crate::server::{Origin, ServerCommand, ServerTx};

pub fn configure_poll_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/poll").route(web::get().to(poll)))
        .service(web::resource("/emit").route(web::post().to(emit)));
}

#[derive(Serialize)]
struct Ack {
    message: &'static str,
}

/// Suspends until the next broadcast, or answers 204 once the poll timeout
/// elapses so the client can reissue.
async fn poll(
    srv_tx: web::Data<ServerTx>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    let (slot, rx) = oneshot::channel();
    send(&srv_tx, ServerCommand::Poll { slot }).await?;

    match tokio::time::timeout(config.poll_timeout(), rx).await {
        Ok(Ok(envelope)) => Ok(HttpResponse::Ok().json(envelope)),
        Ok(Err(_)) => Err(server_gone()),
        Err(_) => Ok(HttpResponse::NoContent().finish()),
    }
}

async fn emit(
    srv_tx: web::Data<ServerTx>,
    envelope: web::Json<Envelope>,
) -> Result<HttpResponse, Error> {
    let (ack, acked) = oneshot::channel();
    send(
        &srv_tx,
        ServerCommand::Inbound {
            origin: Origin::LongPoll,
            envelope: envelope.into_inner(),
            ack: Some(ack),
        },
    )
    .await?;
    acked.await.map_err(|_| server_gone())?;

    Ok(HttpResponse::Ok().json(Ack { message: "ok" }))
}
