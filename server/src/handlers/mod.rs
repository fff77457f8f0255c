use actix_web::error::ErrorServiceUnavailable;
use actix_web::{web, Error};

use crate::connection::ws_index;
use crate::handlers::board::configure_board_handlers;
use crate::handlers::poll::configure_poll_handlers;
use crate::server::{ServerCommand, ServerTx};

mod board;
mod poll;

pub fn root(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(ws_index)));

    configure_board_handlers(cfg);
    configure_poll_handlers(cfg);
}

async fn send(srv_tx: &ServerTx, command: ServerCommand) -> Result<(), Error> {
    srv_tx.send(command).await.map_err(|_| server_gone())
}

fn server_gone() -> Error {
    ErrorServiceUnavailable("server task is not running")
}
