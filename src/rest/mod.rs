//! REST API for the USSD menu flow builder.
//!
//! Serves the dashboard's flow list, step editor, canvas, preview simulator,
//! schedule and history views.

use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod sessions;
pub mod state;

pub use openapi::ApiDoc;
pub use sessions::PreviewSessions;
pub use state::ApiState;

/// Default port for the REST API server
pub const DEFAULT_PORT: u16 = 7010;

/// Build the API router with all routes
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/status", get(routes::health::status))
        // Flow lifecycle
        .route(
            "/api/v1/flows",
            get(routes::flows::list).post(routes::flows::create),
        )
        .route(
            "/api/v1/flows/:id",
            get(routes::flows::get_one)
                .put(routes::flows::update)
                .delete(routes::flows::delete),
        )
        .route("/api/v1/flows/:id/activate", put(routes::flows::activate))
        .route("/api/v1/flows/:id/publish", post(routes::flows::publish))
        .route("/api/v1/flows/:id/duplicate", post(routes::flows::duplicate))
        .route("/api/v1/flows/:id/rollback", post(routes::flows::rollback))
        // Scheduling
        .route(
            "/api/v1/flows/:id/schedule",
            put(routes::schedule::set).delete(routes::schedule::cancel),
        )
        .route(
            "/api/v1/flows/:id/publish-now",
            post(routes::schedule::publish_now),
        )
        .route("/api/v1/scheduled", get(routes::schedule::list))
        // Graph
        .route("/api/v1/flows/:id/validate", get(routes::graph::validate))
        .route("/api/v1/flows/:id/graph", get(routes::graph::layout))
        .route(
            "/api/v1/flows/:id/graph/connect",
            post(routes::graph::connect),
        )
        // Steps
        .route(
            "/api/v1/flows/:id/steps",
            get(routes::steps::list).post(routes::steps::create),
        )
        .route(
            "/api/v1/steps/:id",
            get(routes::steps::get_one)
                .put(routes::steps::update)
                .delete(routes::steps::delete),
        )
        // Options
        .route(
            "/api/v1/steps/:id/options",
            get(routes::options::list).post(routes::options::create),
        )
        .route(
            "/api/v1/options/:id",
            put(routes::options::update).delete(routes::options::delete),
        )
        // Preview
        .route("/api/v1/preview", post(routes::preview::start))
        .route(
            "/api/v1/preview/:session",
            get(routes::preview::get_one).delete(routes::preview::delete),
        )
        .route(
            "/api/v1/preview/:session/input",
            post(routes::preview::input),
        )
        .route(
            "/api/v1/preview/:session/reset",
            post(routes::preview::reset),
        )
        // History
        .route("/api/v1/history", get(routes::history::list))
        // Reference data
        .route(
            "/api/v1/services",
            get(routes::reference::list_services).post(routes::reference::create_service),
        )
        .route(
            "/api/v1/mnos",
            get(routes::reference::list_mnos).post(routes::reference::create_mno),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the REST API server, returning after Ctrl-C
pub async fn serve(state: ApiState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("REST API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    tracing::info!("REST API stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_build_router() {
        let state = ApiState::in_memory(Config::default());
        let _router = build_router(state);
    }

    #[test]
    fn test_default_port_matches_config() {
        assert_eq!(Config::default().api.port, DEFAULT_PORT);
    }
}
