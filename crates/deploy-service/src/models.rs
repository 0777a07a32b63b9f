//! Data models for the deploy service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// Unique application identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Canonical server-side project path (the build context)
    pub path: String,

    /// Client-reported path, used for dedup and change detection
    pub client_path: String,

    /// Declared deployment strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_strategy: Option<String>,

    /// Declared application kind ("node", "go", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Dockerfile path for docker-mode deployments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,

    /// Build command for native-mode deployments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    /// Run command for native-mode deployments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,

    /// Port the application declares it listens on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_port: Option<u16>,

    /// Container-internal port of the last deployment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_port: Option<u16>,

    /// Container reference from the most recent successful deployment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,

    /// Image reference from the most recent successful build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,

    /// When the application was registered
    pub created_at: DateTime<Utc>,

    /// When the application was last updated
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Create a freshly registered application
    pub fn new(id: String, name: String, path: String, client_path: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            path,
            client_path,
            deployment_strategy: None,
            kind: None,
            dockerfile_path: None,
            build_command: None,
            run_command: None,
            application_port: None,
            internal_port: None,
            container_id: None,
            image_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the client path the application was last seen at
    pub fn reconnect_from(&mut self, client_path: String) {
        self.client_path = client_path;
        self.updated_at = Utc::now();
    }

    /// Record the container and image of a successful deployment
    pub fn record_deployment(&mut self, container_id: String, image_id: String) {
        self.container_id = Some(container_id);
        self.image_id = Some(image_id);
        self.updated_at = Utc::now();
    }
}

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// The platform synthesizes the Dockerfile from a declared runtime kind
    Native,
    /// The caller supplies their own Dockerfile path within the project
    Docker,
}

/// Mode-specific parameters for a native deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeConfig {
    /// Declared runtime kind ("node", "go", ...)
    pub application_type: String,

    /// Command that prepares the project inside the image
    pub build_command: String,

    /// Command that starts the application
    pub run_command: String,

    /// Port the application declares it listens on
    pub port: u16,
}

/// Mode-specific parameters for a docker deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Dockerfile path relative to the build context
    pub dockerfile_path: String,
}

/// A deployment request, validated and authenticated upstream
#[derive(Debug, Clone, Deserialize)]
pub struct DeployRequest {
    #[serde(rename = "type")]
    pub mode: DeployMode,

    /// Target application
    pub application_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_config: Option<NativeConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_config: Option<DockerConfig>,

    /// Caller-supplied deadline for the build and launch calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Outcome of a successful deployment
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub application_id: String,

    /// Runtime container identifier
    pub container_id: String,

    /// Deterministic container name derived from the client path
    pub container_name: String,

    /// Image tag the container runs
    pub image_tag: String,

    /// Host port the application is reachable on
    pub host_port: u16,
}

/// Request to connect a project to the service
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectRequest {
    #[serde(rename = "type")]
    pub kind: ConnectKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
}

/// Connection kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectKind {
    New,
    Existing,
}

/// Response to a connect request
#[derive(Debug, Clone, Serialize)]
pub struct ConnectResponse {
    pub application_id: String,

    /// Whether a new application record was created
    pub created: bool,
}
