//! Deploy Service
//!
//! REST API for registering projects and deploying them as containers

use anyhow::{Context, Result};
use deploy_service::{create_router, AppState, Config, Deployer, Engine, Registry};
use dockerfile_gen::RuntimeImages;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deploy_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    info!("Starting Deploy Service");
    info!("Redis URL: {}", config.redis_url);
    info!("Apps root: {}", config.apps_root.display());

    // Ensure the apps root exists
    std::fs::create_dir_all(&config.apps_root).context("Failed to create apps root directory")?;

    // Application registry
    let registry = Registry::new(&config.redis_url, config.apps_root.clone())
        .await
        .context("Failed to initialize the application registry")?;
    let registry = Arc::new(Mutex::new(registry));

    // Container engine
    let engine = Engine::connect()
        .await
        .context("Failed to connect to the container engine")?;

    let deployer = Deployer::new(
        registry.clone(),
        engine,
        RuntimeImages::defaults(),
        config.deploy_timeout,
    );

    let state = AppState { registry, deployer };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Deploy Service API running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
