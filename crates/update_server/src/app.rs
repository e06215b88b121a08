//! Main application structure and lifecycle management

use crate::{api::ApiServer, database::Database, store::SqliteBundleStore};
use anyhow::{Context, Result};
use config::{Config, StorageConfig};
use resolver::{BundleSelector, SignedUrlIssuer};
use std::sync::Arc;
use std::time::Duration;
use storage_client::{LocalUrlSigner, RemoteUrlSigner};
use tracing::info;

/// Main application state
pub struct AppState {
    pub config: Config,
    pub database: Database,
    pub store: Arc<SqliteBundleStore>,
    pub selector: BundleSelector,
}

impl AppState {
    /// Wire the store, URL issuer and selector around a migrated database
    pub fn new(config: Config, database: Database) -> Result<Self> {
        let store = Arc::new(SqliteBundleStore::new(database.pool().clone()));
        let issuer = build_issuer(&config.storage)?;
        let selector = BundleSelector::new(store.clone(), issuer, config.resolver_config());

        Ok(Self {
            config,
            database,
            store,
            selector,
        })
    }
}

/// Build the URL issuer selected by the `storage` section
pub fn build_issuer(storage: &StorageConfig) -> Result<Arc<dyn SignedUrlIssuer>> {
    let issuer: Arc<dyn SignedUrlIssuer> = match storage {
        StorageConfig::Local {
            public_base_url,
            signing_secret,
        } => Arc::new(LocalUrlSigner::new(public_base_url, signing_secret)),
        StorageConfig::Remote {
            endpoint,
            api_key,
            timeout_seconds,
        } => Arc::new(
            RemoteUrlSigner::new(
                endpoint.clone(),
                api_key.clone(),
                Duration::from_secs(*timeout_seconds),
            )
            .context("Failed to create remote URL signer")?,
        ),
    };
    Ok(issuer)
}

/// Main application that coordinates all components
pub struct Application {
    state: Arc<AppState>,
    api_server: ApiServer,
}

impl Application {
    /// Create a new application instance
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing application components...");

        let database = Database::new(&config.database)
            .await
            .context("Failed to initialize database")?;

        database
            .migrate()
            .await
            .context("Failed to run database migrations")?;

        let state = Arc::new(AppState::new(config, database)?);

        let api_server = ApiServer::new(state.clone()).context("Failed to create API server")?;

        info!(
            strategy = state.config.update.strategy.as_str(),
            storage = state.config.storage.kind(),
            "Application components initialized successfully"
        );

        Ok(Self { state, api_server })
    }

    /// Run the application
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Starting API server on {}:{}",
            self.state.config.server.host, self.state.config.server.port
        );

        self.api_server.run().await.context("API server error")
    }

    /// Shutdown the application gracefully
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down application...");

        self.api_server
            .shutdown()
            .await
            .context("Failed to shutdown API server")?;

        self.state
            .database
            .close()
            .await
            .context("Failed to close database")?;
        info!("Database connections closed");

        info!("Application shutdown complete");
        Ok(())
    }
}
