//! User Record Store
//!
//! Creates, looks up, updates and deletes user records keyed by an opaque ID,
//! with a second unique index on username and system-managed timestamps:
//! - In-memory and PostgreSQL backends behind one store trait
//! - Clock-driven service layer
//! - Configuration, logging and an admin CLI

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::DomainError;
pub use domain::user::{NewUserRecord, UserId, UserPatch, UserRecord, UserRecordStore, UserSnapshot};
pub use infrastructure::user::{
    CreateUserRequest, InMemoryUserRecordStore, PostgresUserRecordStore, UserService,
    UserStoreFactory,
};

use tracing::info;

/// Build a user service over the store selected by the configuration
pub async fn create_user_service(config: &AppConfig) -> anyhow::Result<UserService> {
    info!(backend = %config.storage.backend, "Creating user store");

    let store = UserStoreFactory::from_settings(&config.storage).await?;

    Ok(UserService::with_system_clock(store))
}
