pub extern crate actix_web;

use std::net::SocketAddr;

use actix_cors::Cors;
use actix_web::dev::Server as HttpServerHandle;
use actix_web::{middleware, web, App, HttpServer};

pub mod config;
pub mod connection;
pub mod handlers;
pub mod long_poll;
pub mod push;
pub mod server;

use crate::config::Config;
use crate::server::spawn_server;

/// Binds the HTTP server and spawns the server task. Must be called from
/// within an actix runtime; the returned handle drives the server.
pub fn start(config: Config) -> std::io::Result<(HttpServerHandle, SocketAddr)> {
    let srv_tx = spawn_server(&config);
    let bind = config.bind.clone();
    let srv_tx = web::Data::new(srv_tx);
    let config = web::Data::new(config);

    let http = HttpServer::new(move || {
        App::new()
            .app_data(srv_tx.clone())
            .app_data(config.clone())
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .configure(handlers::root)
    })
    .bind(bind)?;

    let addr = http.addrs().first().copied().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no address bound")
    })?;
    log::info!("Listening on {}", addr);

    Ok((http.run(), addr))
}
