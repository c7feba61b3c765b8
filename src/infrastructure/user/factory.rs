//! Store factory for runtime backend selection

use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::config::StorageSettings;
use crate::domain::DomainError;
use crate::domain::user::UserRecordStore;

use super::postgres_repository::{PostgresConfig, PostgresUserRecordStore};
use super::repository::InMemoryUserRecordStore;

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl FromStr for StorageType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(DomainError::configuration(format!(
                "Unknown storage backend '{}'",
                other
            ))),
        }
    }
}

/// Resolved store configuration
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// In-memory store configuration
    InMemory,
    /// PostgreSQL store configuration
    Postgres(PostgresConfig),
}

impl StoreConfig {
    /// Creates an in-memory store configuration
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Creates a PostgreSQL configuration from a URL
    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self::Postgres(PostgresConfig::new(url))
    }

    /// Returns the storage type
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

impl TryFrom<&StorageSettings> for StoreConfig {
    type Error = DomainError;

    fn try_from(settings: &StorageSettings) -> Result<Self, Self::Error> {
        match settings.backend.parse::<StorageType>()? {
            StorageType::InMemory => Ok(Self::InMemory),
            StorageType::Postgres => {
                let url = settings.database_url.clone().ok_or_else(|| {
                    DomainError::configuration(
                        "storage.database_url is required for the postgres backend",
                    )
                })?;

                Ok(Self::Postgres(PostgresConfig {
                    url,
                    table_name: settings.table_name.clone(),
                    max_connections: settings.max_connections,
                    min_connections: settings.min_connections,
                    connect_timeout_secs: settings.connect_timeout_secs,
                    idle_timeout_secs: settings.idle_timeout_secs,
                }))
            }
        }
    }
}

/// Factory for creating user record stores
#[derive(Debug)]
pub struct UserStoreFactory;

impl UserStoreFactory {
    /// Creates a store for the configuration, making sure the table exists
    pub async fn create(config: &StoreConfig) -> Result<Arc<dyn UserRecordStore>, DomainError> {
        match config {
            StoreConfig::InMemory => {
                info!("Using in-memory user store");
                Ok(Arc::new(InMemoryUserRecordStore::new()))
            }
            StoreConfig::Postgres(pg_config) => {
                info!(table = %pg_config.table_name, "Connecting PostgreSQL user store");
                let store = PostgresUserRecordStore::connect(pg_config).await?;
                store.ensure_table().await?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Creates a store from application storage settings
    pub async fn from_settings(
        settings: &StorageSettings,
    ) -> Result<Arc<dyn UserRecordStore>, DomainError> {
        let config = StoreConfig::try_from(settings)?;
        Self::create(&config).await
    }
}
