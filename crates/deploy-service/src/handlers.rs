//! API handlers for the deploy service

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use infracon_common::{DeployError, Error, Stage};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::models::{ConnectKind, ConnectRequest, ConnectResponse, DeployOutcome, DeployRequest};
use crate::orchestrator::Deployer;
use crate::registry::Registry;

/// Shared application state
pub struct AppState {
    pub registry: Arc<Mutex<Registry>>,
    pub deployer: Deployer,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub stage: Option<Stage>,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
            stage: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.stage {
            Some(stage) => serde_json::json!({
                "error": self.message,
                "stage": stage,
            }),
            None => serde_json::json!({
                "error": self.message
            }),
        };

        (self.status, Json(body)).into_response()
    }
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Cancelled => StatusCode::REQUEST_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError {
            status: status_for(&error),
            message: error.to_string(),
            stage: None,
        }
    }
}

impl From<DeployError> for ApiError {
    fn from(error: DeployError) -> Self {
        ApiError {
            status: status_for(&error.error),
            message: error.error.to_string(),
            stage: Some(error.stage),
        }
    }
}

/// Health check
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "deploy-service"
    }))
}

/// Connect a project: register a new one, or reconnect an existing one
pub async fn connect_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>, ApiError> {
    match payload.kind {
        ConnectKind::New => {
            let name = payload
                .name
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| ApiError::bad_request("`name` is required"))?;
            let path = payload
                .path
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| ApiError::bad_request("`path` is required"))?;

            info!("Connecting new project {} at {}", name, path);

            let mut registry = state.registry.lock().await;
            let (application_id, created) = registry.register_or_get(&name, &path, &path).await?;

            Ok(Json(ConnectResponse {
                application_id,
                created,
            }))
        }
        ConnectKind::Existing => {
            let application_id = payload
                .application_id
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| ApiError::bad_request("`application_id` is required"))?;
            let path = payload
                .path
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| ApiError::bad_request("`path` is required"))?;

            info!("Reconnecting application {} from {}", application_id, path);

            let mut registry = state.registry.lock().await;
            registry.reconnect(&application_id, &path).await?;

            Ok(Json(ConnectResponse {
                application_id,
                created: false,
            }))
        }
    }
}

/// Run one deployment attempt to a terminal state
pub async fn deploy_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DeployRequest>,
) -> Result<Json<DeployOutcome>, ApiError> {
    info!("Deployment requested for application {}", payload.application_id);

    let outcome = state.deployer.deploy(payload).await?;
    Ok(Json(outcome))
}

/// List all registered applications
pub async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut registry = state.registry.lock().await;
    let projects = registry.list().await?;

    Ok(Json(serde_json::json!({
        "projects": projects,
        "total": projects.len()
    })))
}
