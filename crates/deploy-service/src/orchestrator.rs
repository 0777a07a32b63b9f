//! Deployment orchestrator
//!
//! Sequences a deployment attempt through its stages: validate the request,
//! resolve the application, synthesize or accept a Dockerfile, build the
//! image, start the container. Every failure is terminal for the attempt and
//! tagged with the stage it originated from; nothing is retried.

use crate::lifecycle::{self, ContainerHandle};
use crate::locks::KeyedLocks;
use crate::models::{DeployMode, DeployOutcome, DeployRequest};
use crate::pipeline::{self, SYNTHESIZED_DOCKERFILE};
use crate::registry::Registry;
use crate::runtime::Engine;
use dockerfile_gen::{synthesize, DockerfileSpec, RuntimeImages};
use infracon_common::{DeployError, Error, Result, Stage, StageExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Synthesized images always listen on a port chosen by the orchestrator.
pub const NATIVE_INTERNAL_PORT: u16 = 4300;

/// User-supplied Dockerfiles are assumed to listen on the documented default.
pub const DOCKER_INTERNAL_PORT: u16 = 8080;

/// Orchestrates deployment attempts
pub struct Deployer {
    registry: Arc<Mutex<Registry>>,
    engine: Engine,
    images: RuntimeImages,
    deploy_locks: KeyedLocks,
    default_timeout: Option<Duration>,
}

/// A validated deployment, ready to build
#[derive(Debug)]
enum DeployPlan {
    Native {
        image: String,
        build_command: String,
        run_command: String,
    },
    Docker {
        dockerfile_path: String,
    },
}

impl DeployPlan {
    fn internal_port(&self) -> u16 {
        match self {
            DeployPlan::Native { .. } => NATIVE_INTERNAL_PORT,
            DeployPlan::Docker { .. } => DOCKER_INTERNAL_PORT,
        }
    }

    /// The internal port is bound to the same-numbered host port.
    fn host_port(&self) -> u16 {
        self.internal_port()
    }
}

impl Deployer {
    pub fn new(
        registry: Arc<Mutex<Registry>>,
        engine: Engine,
        images: RuntimeImages,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            engine,
            images,
            deploy_locks: KeyedLocks::new(),
            default_timeout,
        }
    }

    /// Run one deployment attempt to a terminal state.
    pub async fn deploy(
        &self,
        request: DeployRequest,
    ) -> std::result::Result<DeployOutcome, DeployError> {
        // Validating: fail fast, before any side effect
        let plan = validate(&request, &self.images).at_stage(Stage::Validating)?;

        // Resolving
        let application = {
            let mut registry = self.registry.lock().await;
            registry.get(&request.application_id).await
        }
        .at_stage(Stage::Resolving)?
        .ok_or_else(|| {
            DeployError::new(Stage::Resolving, Error::NotFound(request.application_id.clone()))
        })?;

        // At most one deployment per application may hold the build and
        // launch stages; a concurrent attempt waits here and observes the
        // first attempt's terminal state before starting its own.
        let _guard = self.deploy_locks.acquire(&application.id).await;

        let deadline = request
            .timeout_secs
            .map(Duration::from_secs)
            .or(self.default_timeout);

        info!(
            "Deploying application {} ({:?} mode)",
            application.id, request.mode
        );

        // Building
        let context_dir = Path::new(&application.path);
        let dockerfile = match &plan {
            DeployPlan::Native {
                image,
                build_command,
                run_command,
            } => {
                let spec = DockerfileSpec {
                    image: image.clone(),
                    build_command: build_command.clone(),
                    run_command: run_command.clone(),
                    internal_port: NATIVE_INTERNAL_PORT,
                };
                write_synthesized_dockerfile(context_dir, &synthesize(&spec))
                    .at_stage(Stage::Building)?;
                SYNTHESIZED_DOCKERFILE.to_string()
            }
            DeployPlan::Docker { dockerfile_path } => dockerfile_path.clone(),
        };

        let tag = pipeline::image_tag(&application.id);
        let artifact = pipeline::build(&self.engine, context_dir, &dockerfile, &tag, deadline)
            .await
            .at_stage(Stage::Building)?;

        // Launching
        let name = lifecycle::container_name(&application.client_path);
        let handle: ContainerHandle = lifecycle::launch(
            &self.engine,
            &artifact.tag,
            plan.internal_port(),
            plan.host_port(),
            &name,
            deadline,
        )
        .await
        .at_stage(Stage::Launching)?;

        // Succeeded; losing the reference update does not undo the deployment
        if let Err(e) = {
            let mut registry = self.registry.lock().await;
            registry
                .record_deployment(&application.id, &handle.id, &artifact.tag)
                .await
        } {
            warn!(
                "Deployed application {} but failed to record references: {}",
                application.id, e
            );
        }

        info!(
            "Application {} deployed: container {} running {}",
            application.id, handle.name, artifact.tag
        );

        Ok(DeployOutcome {
            application_id: application.id,
            container_id: handle.id,
            container_name: handle.name,
            image_tag: artifact.tag,
            host_port: plan.host_port(),
        })
    }
}

/// Check the mode-specific invariants and resolve the build plan.
fn validate(request: &DeployRequest, images: &RuntimeImages) -> Result<DeployPlan> {
    match request.mode {
        DeployMode::Native => {
            if request.docker_config.is_some() {
                return Err(Error::InvalidRequest(
                    "`docker_config` is not allowed for a native deployment".to_string(),
                ));
            }
            let native = request.native_config.as_ref().ok_or_else(|| {
                Error::InvalidRequest("`native_config` is required".to_string())
            })?;

            if native.run_command.split_whitespace().next().is_none() {
                return Err(Error::InvalidRequest(
                    "`run_command` must not be empty".to_string(),
                ));
            }
            if native.build_command.trim().is_empty() {
                return Err(Error::InvalidRequest(
                    "`build_command` must not be empty".to_string(),
                ));
            }

            let image = images.resolve(&native.application_type).ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "unable to resolve a runtime image for `{}`",
                    native.application_type
                ))
            })?;

            Ok(DeployPlan::Native {
                image: image.to_string(),
                build_command: native.build_command.clone(),
                run_command: native.run_command.clone(),
            })
        }
        DeployMode::Docker => {
            if request.native_config.is_some() {
                return Err(Error::InvalidRequest(
                    "`native_config` is not allowed for a docker deployment".to_string(),
                ));
            }
            let docker = request.docker_config.as_ref().ok_or_else(|| {
                Error::InvalidRequest("`docker_config` is required".to_string())
            })?;

            if docker.dockerfile_path.trim().is_empty() {
                return Err(Error::InvalidRequest(
                    "`dockerfile_path` must not be empty".to_string(),
                ));
            }

            Ok(DeployPlan::Docker {
                dockerfile_path: docker.dockerfile_path.clone(),
            })
        }
    }
}

/// Write the synthesized Dockerfile into the build context, replacing any
/// prior synthesized file at that fixed path.
fn write_synthesized_dockerfile(context_dir: &Path, content: &str) -> Result<()> {
    let path = context_dir.join(SYNTHESIZED_DOCKERFILE);
    std::fs::write(&path, content).map_err(|e| {
        Error::Context(format!(
            "unable to write synthesized Dockerfile {}: {}",
            path.display(),
            e
        ))
    })
}
