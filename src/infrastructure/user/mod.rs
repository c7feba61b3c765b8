//! User infrastructure module
//!
//! Store backends (in-memory and PostgreSQL), the factory that picks one at
//! runtime, and the clock-driven user service.

mod factory;
mod postgres_repository;
mod repository;
mod service;

pub use factory::{StorageType, StoreConfig, UserStoreFactory};
pub use postgres_repository::{DEFAULT_USERS_TABLE, PostgresConfig, PostgresUserRecordStore};
pub use repository::InMemoryUserRecordStore;
pub use service::{CreateUserRequest, UserService};
