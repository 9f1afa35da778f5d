//! Dustfront - Dedicated Server

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dustfront_server::lobby::Lobby;
use dustfront_server::{http, ServerConfig};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Dustfront Dedicated Server");

    let config = ServerConfig::default();
    let port = config.port;
    let lobby = Arc::new(Lobby::new(config));
    lobby.spawn_sweeper();

    let app = http::router(lobby);
    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, "failed to bind {addr}");
            return;
        }
    };
    if let Err(error) = axum::serve(listener, app).await {
        tracing::error!(%error, "server exited with error");
    }
}
