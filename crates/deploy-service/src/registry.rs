//! Application registry
//!
//! Maps application identity to its on-disk project location and metadata.
//! Records live in Redis keyed by application ID, with a secondary lookup
//! keyed by the client-reported path so re-registration of a known project
//! resolves to the existing application instead of creating a duplicate.

use crate::locks::KeyedLocks;
use crate::models::Application;
use anyhow::Context as _;
use infracon_common::{Error, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Redis-backed application registry
pub struct Registry {
    conn: ConnectionManager,
    apps_root: PathBuf,
    register_locks: KeyedLocks,
}

fn app_key(application_id: &str) -> String {
    format!("app:{}", application_id)
}

fn client_path_key(client_path: &str) -> String {
    format!("client-path:{}", client_path)
}

fn storage_err(err: redis::RedisError) -> Error {
    Error::Storage(err.to_string())
}

impl Registry {
    /// Connect to Redis and root the registry at `apps_root`.
    pub async fn new(redis_url: &str, apps_root: PathBuf) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self {
            conn,
            apps_root,
            register_locks: KeyedLocks::new(),
        })
    }

    /// Register a project, or return the existing application for a
    /// previously seen client path.
    ///
    /// Returns the application ID and whether a new record was created. The
    /// lookup-then-insert sequence runs under a lock keyed by the client
    /// path so concurrent registrations of the same project cannot both
    /// insert.
    pub async fn register_or_get(
        &mut self,
        name: &str,
        requested_path: &str,
        client_path: &str,
    ) -> Result<(String, bool)> {
        let _guard = self.register_locks.acquire(client_path).await;

        let existing: Option<String> = self
            .conn
            .get(client_path_key(client_path))
            .await
            .map_err(storage_err)?;

        if let Some(id) = existing {
            debug!("Client path {} already registered as {}", client_path, id);
            return Ok((id, false));
        }

        let project_path = self.project_path(requested_path);
        std::fs::create_dir_all(&project_path).map_err(|e| {
            Error::Storage(format!(
                "unable to create project directory {}: {}",
                project_path.display(),
                e
            ))
        })?;

        let id = Uuid::new_v4().to_string();
        let application = Application::new(
            id.clone(),
            name.to_string(),
            project_path.to_string_lossy().to_string(),
            client_path.to_string(),
        );

        self.put(&application).await?;
        let _: () = self
            .conn
            .set(client_path_key(client_path), &id)
            .await
            .map_err(storage_err)?;
        let _: () = self.conn.sadd("apps:all", &id).await.map_err(storage_err)?;

        info!("Registered application {} at {}", id, project_path.display());
        Ok((id, true))
    }

    /// Record the client path an existing application reconnected from.
    ///
    /// A reconnect from the already-stored path is an explicit no-op: no
    /// write is issued.
    pub async fn reconnect(&mut self, application_id: &str, client_path: &str) -> Result<()> {
        let mut application = self
            .get(application_id)
            .await?
            .ok_or_else(|| Error::NotFound(application_id.to_string()))?;

        if application.client_path == client_path {
            debug!(
                "Application {} reconnected from unchanged path {}",
                application_id, client_path
            );
            return Ok(());
        }

        let old_index = client_path_key(&application.client_path);
        application.reconnect_from(client_path.to_string());

        self.put(&application).await?;
        let _: () = self.conn.del(old_index).await.map_err(storage_err)?;
        let _: () = self
            .conn
            .set(client_path_key(client_path), application_id)
            .await
            .map_err(storage_err)?;

        info!(
            "Application {} moved to client path {}",
            application_id, client_path
        );
        Ok(())
    }

    /// Get an application by ID
    pub async fn get(&mut self, application_id: &str) -> Result<Option<Application>> {
        let json: Option<String> = self
            .conn
            .get(app_key(application_id))
            .await
            .map_err(storage_err)?;

        match json {
            Some(data) => {
                let application = serde_json::from_str(&data)
                    .map_err(|e| Error::Storage(format!("corrupt application record: {}", e)))?;
                Ok(Some(application))
            }
            None => Ok(None),
        }
    }

    /// All registered applications, most recently created first
    pub async fn list(&mut self) -> Result<Vec<Application>> {
        let ids: Vec<String> = self.conn.smembers("apps:all").await.map_err(storage_err)?;

        let mut applications = Vec::new();
        for id in ids {
            if let Some(application) = self.get(&id).await? {
                applications.push(application);
            }
        }

        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    /// Persist the container and image references of a successful deployment
    pub async fn record_deployment(
        &mut self,
        application_id: &str,
        container_id: &str,
        image_tag: &str,
    ) -> Result<()> {
        let mut application = self
            .get(application_id)
            .await?
            .ok_or_else(|| Error::NotFound(application_id.to_string()))?;

        application.record_deployment(container_id.to_string(), image_tag.to_string());
        self.put(&application).await?;

        debug!(
            "Recorded container {} for application {}",
            container_id, application_id
        );
        Ok(())
    }

    /// Server-side project directory for a requested path
    pub fn project_path(&self, requested_path: &str) -> PathBuf {
        self.apps_root.join(requested_path)
    }

    /// Root directory project directories are created under
    pub fn apps_root(&self) -> &Path {
        &self.apps_root
    }

    async fn put(&mut self, application: &Application) -> Result<()> {
        let json = serde_json::to_string(application)
            .map_err(|e| Error::Storage(format!("unable to serialize application: {}", e)))?;

        let _: () = self
            .conn
            .set(app_key(&application.id), json)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation() {
        assert_eq!(app_key("abc"), "app:abc");
        assert_eq!(client_path_key("proj-a"), "client-path:proj-a");
    }

    #[test]
    fn test_keys_do_not_collide_across_namespaces() {
        // An application ID that looks like a path index must not alias it.
        assert_ne!(app_key("client-path:proj-a"), client_path_key("proj-a"));
    }
}
