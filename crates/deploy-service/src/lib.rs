//! Deploy Service
//!
//! Self-hosted deployment orchestrator: registers source projects, builds a
//! container image from a user-supplied or synthesized Dockerfile, and
//! launches a runtime container exposing the application on a fixed port.

pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod locks;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod runtime;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use handlers::AppState;
pub use models::{Application, DeployMode, DeployOutcome, DeployRequest};
pub use orchestrator::Deployer;
pub use registry::Registry;
pub use runtime::Engine;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/connect", post(handlers::connect_handler))
        .route("/api/deploy", post(handlers::deploy_handler))
        .route("/api/projects", get(handlers::list_projects_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
