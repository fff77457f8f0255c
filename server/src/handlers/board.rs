use actix_web::{web, Error, HttpResponse};
use tokio::sync::oneshot;

use super::{send, server_gone};
use crate::server::{ServerCommand, ServerTx};

pub fn configure_board_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(get)));
}

/// Full snapshot for the initial sync.
async fn get(srv_tx: web::Data<ServerTx>) -> Result<HttpResponse, Error> {
    let (tx, rx) = oneshot::channel();
    send(&srv_tx, ServerCommand::Snapshot { tx }).await?;
    let snapshot = rx.await.map_err(|_| server_gone())?;
    Ok(HttpResponse::Ok().json(snapshot))
}
