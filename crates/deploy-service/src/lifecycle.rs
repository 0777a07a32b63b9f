//! Container lifecycle manager
//!
//! Derives a runtime container specification from a deployment and drives
//! the engine's create-then-start sequence. A container that was created but
//! failed to start is not a valid end state; it is removed before the
//! failure is reported.

use crate::runtime::Engine;
use bollard::container::{Config, CreateContainerOptions, RemoveContainerOptions};
use bollard::models::{HostConfig, PortBinding};
use infracon_common::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// A running container
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

/// Deterministic container name for an application, so a redeploy targets
/// the same logical slot.
pub fn container_name(client_path: &str) -> String {
    format!("container-{}", client_path)
}

/// Derive the engine-facing container specification: the internal port bound
/// to a host port on all interfaces, an environment-kind marker, and
/// auto-removal once the container stops.
pub fn container_config(image: &str, internal_port: u16, host_port: u16) -> Config<String> {
    let exposed = format!("{}/tcp", internal_port);

    let mut exposed_ports = HashMap::new();
    exposed_ports.insert(exposed.clone(), HashMap::new());

    let mut port_bindings = HashMap::new();
    port_bindings.insert(
        exposed,
        Some(vec![PortBinding {
            host_ip: Some("0.0.0.0".to_string()),
            host_port: Some(host_port.to_string()),
        }]),
    );

    Config {
        image: Some(image.to_string()),
        env: Some(vec!["APP_ENV=production".to_string()]),
        exposed_ports: Some(exposed_ports),
        host_config: Some(HostConfig {
            port_bindings: Some(port_bindings),
            auto_remove: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Create and start a runtime container for the image.
///
/// When `deadline` is set, expiry aborts the outstanding engine call and the
/// attempt surfaces as cancelled.
pub async fn launch(
    engine: &Engine,
    image: &str,
    internal_port: u16,
    host_port: u16,
    name: &str,
    deadline: Option<Duration>,
) -> Result<ContainerHandle> {
    let attempt = create_and_start(engine, image, internal_port, host_port, name);
    match deadline {
        Some(limit) => tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| Error::Cancelled)?,
        None => attempt.await,
    }
}

async fn create_and_start(
    engine: &Engine,
    image: &str,
    internal_port: u16,
    host_port: u16,
    name: &str,
) -> Result<ContainerHandle> {
    let config = container_config(image, internal_port, host_port);
    let options = CreateContainerOptions {
        name: name.to_string(),
        platform: None,
    };

    let created = engine
        .inner()
        .create_container(Some(options), config)
        .await
        .map_err(|e| Error::Launch(format!("unable to create container {}: {}", name, e)))?;

    for warning in &created.warnings {
        warn!("Engine warning for container {}: {}", name, warning);
    }

    if let Err(e) = engine
        .inner()
        .start_container::<String>(&created.id, None)
        .await
    {
        remove_unstarted(engine, &created.id).await;
        return Err(Error::Launch(format!(
            "container {} was created but failed to start: {}",
            name, e
        )));
    }

    info!(
        "Container {} ({}) started, host port {}",
        name, created.id, host_port
    );

    Ok(ContainerHandle {
        id: created.id,
        name: name.to_string(),
    })
}

/// Best-effort removal of a created-but-unstarted container.
async fn remove_unstarted(engine: &Engine, container_id: &str) {
    let options = RemoveContainerOptions {
        force: true,
        ..Default::default()
    };

    if let Err(e) = engine
        .inner()
        .remove_container(container_id, Some(options))
        .await
    {
        // auto_remove may have already reaped it
        if let bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } = e
        {
            return;
        }
        warn!(
            "Unable to remove unstarted container {}: {}",
            container_id, e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_name_is_deterministic() {
        assert_eq!(container_name("proj-a"), "container-proj-a");
        assert_eq!(container_name("proj-a"), container_name("proj-a"));
    }

    #[test]
    fn test_container_config_binds_internal_to_host_port() {
        let config = container_config("infracon-image-abc:latest", 4300, 4300);

        assert_eq!(config.image.as_deref(), Some("infracon-image-abc:latest"));

        let exposed = config.exposed_ports.unwrap();
        assert!(exposed.contains_key("4300/tcp"));

        let host_config = config.host_config.unwrap();
        let bindings = host_config.port_bindings.unwrap();
        let binding = bindings["4300/tcp"].as_ref().unwrap();
        assert_eq!(binding[0].host_ip.as_deref(), Some("0.0.0.0"));
        assert_eq!(binding[0].host_port.as_deref(), Some("4300"));
        assert_eq!(host_config.auto_remove, Some(true));
    }

    #[test]
    fn test_container_config_sets_environment_marker() {
        let config = container_config("demo:latest", 8080, 8080);
        let env = config.env.unwrap();
        assert!(env.contains(&"APP_ENV=production".to_string()));
    }

    #[test]
    fn test_docker_mode_ports_differ_from_native() {
        let native = container_config("demo:latest", 4300, 4300);
        let docker = container_config("demo:latest", 8080, 8080);
        assert!(native.exposed_ports.unwrap().contains_key("4300/tcp"));
        assert!(docker.exposed_ports.unwrap().contains_key("8080/tcp"));
    }
}
