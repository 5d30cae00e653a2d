//! # Quill API Server
//!
//! Blog REST API on actix-web, with post events pushed over Socket.IO.

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, http::header, web};
use tracing_actix_web::TracingLogger;

use quill_core::ports::PostNotifier;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

#[cfg(feature = "websocket")]
mod websocket;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Quill API Server on {}:{}",
        config.host,
        config.port
    );

    // Realtime endpoint must be listening before HTTP requests are served
    let notifier = start_notifier(&config).await?;

    let state = AppState::new(&config, notifier).await?;
    let image_dir = config.image_dir.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(cors())
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .service(Files::new("/images", &image_dir))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}

fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(3600)
}

#[cfg(feature = "websocket")]
async fn start_notifier(config: &AppConfig) -> anyhow::Result<Arc<dyn PostNotifier>> {
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.socket_port)).await?;

    tracing::info!(
        "Socket.IO listening on {}:{}",
        config.host,
        config.socket_port
    );

    Ok(Arc::new(websocket::spawn(listener)))
}

#[cfg(not(feature = "websocket"))]
async fn start_notifier(_config: &AppConfig) -> anyhow::Result<Arc<dyn PostNotifier>> {
    tracing::info!("Built without websocket feature - post events stay in-process");
    Ok(Arc::new(quill_infra::BroadcastNotifier::default()))
}
