use std::error::Error;
use std::net::SocketAddr;
use axum::{ routing::get, Json, Router };
use serde::Serialize;
use log::{ info, error };

pub const ALIVE_TEXT: &str = "Bot is alive!";

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn router() -> Router {
    Router::new().route("/", get(alive_handler)).route("/health", get(health_handler))
}

/// Binds the liveness endpoint and serves it in the background.
pub async fn start_http_server(http_addr: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = http_addr.parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener
        ::bind(addr).await
        .map_err(|e| format!("Failed to bind liveness server to {}: {}", addr, e))?;
    info!("Liveness endpoint listening on: http://{}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router().into_make_service()).await {
            error!("HTTP server error: {}", e);
        }
    });

    Ok(())
}

async fn alive_handler() -> &'static str {
    ALIVE_TEXT
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
