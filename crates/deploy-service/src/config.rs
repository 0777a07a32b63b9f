//! Configuration for the deploy service

use std::path::PathBuf;
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the API binds to
    pub host: String,

    /// Port the API binds to
    pub port: u16,

    /// Redis URL for the application registry
    pub redis_url: String,

    /// Root directory under which project directories are created
    pub apps_root: PathBuf,

    /// Default deadline applied to build and launch calls when the deploy
    /// request does not carry its own
    pub deploy_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let host = std::env::var("DEPLOY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("DEPLOY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(2000);
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let apps_root = std::env::var("INFRACON_APPS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_apps_root());
        let deploy_timeout = std::env::var("DEPLOY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs);

        Self {
            host,
            port,
            redis_url,
            apps_root,
            deploy_timeout,
        }
    }
}

/// Project directories live under the service user's home directory.
fn default_apps_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("infracon-apps"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/infracon-apps"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Should not panic and should fall back to usable defaults
        let config = Config::from_env();
        assert!(!config.host.is_empty());
        assert!(config.port > 0);
        assert!(config.redis_url.starts_with("redis://"));
    }

    #[test]
    fn test_default_apps_root_is_home_relative() {
        let root = default_apps_root();
        assert!(root.ends_with("infracon-apps"));
    }
}
