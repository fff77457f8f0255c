use clap::Parser;

use server::config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let (http, _addr) = server::start(config)?;
    http.await
}
