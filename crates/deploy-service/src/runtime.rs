//! Container runtime service adapter
//!
//! Thin wrapper over the Docker Engine API. The build pipeline and the
//! container lifecycle manager talk to the engine through this handle; the
//! rest of the service never touches bollard directly.

use anyhow::Context as _;
use bollard::Docker;
use tracing::info;

/// Handle to the container engine
#[derive(Debug, Clone)]
pub struct Engine(Docker);

impl Engine {
    /// Connect to the local daemon.
    ///
    /// Bollard does not actually connect on the `connect_*` call; ping the
    /// daemon before proceeding so a missing engine fails at startup rather
    /// than mid-deployment.
    pub async fn connect() -> anyhow::Result<Self> {
        let inner =
            Docker::connect_with_local_defaults().context("Failed to create engine client")?;

        inner
            .ping()
            .await
            .context("Failed to reach the container engine")?;

        info!("Connected to the container engine");
        Ok(Self(inner))
    }

    pub(crate) fn inner(&self) -> &Docker {
        &self.0
    }
}
