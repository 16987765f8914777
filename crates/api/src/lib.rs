pub mod routes;

use std::net::SocketAddr;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use common::{Result, StatusBoard};

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub board: StatusBoard,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(board: StatusBoard) -> Self {
        Self {
            board,
            started_at: Utc::now(),
        }
    }
}

/// All routes with permissive CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::health_router())
        .merge(routes::status_router())
        .with_state(state)
        .layer(cors)
}

/// Serve the status API until `shutdown` flips to `true`.
pub async fn serve(state: AppState, port: u16, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "Status API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;
    info!("Status API stopped");
    Ok(())
}
