// Web server entry point
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use log::info;
use std::sync::Arc;
use translation_server::api;
use translation_server::config::ServerConfig;
use translation_server::models::HubModelProvider;
use translation_server::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = ServerConfig::parse();

    let provider = HubModelProvider::new(config.models.clone())
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
    // models load on first request
    let shared_state = AppState::new(Arc::new(provider), config.summary);

    info!("Listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(shared_state.clone()))
            .configure(api::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
