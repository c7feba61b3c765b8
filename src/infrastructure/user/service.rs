//! User service: stamps store operations with the current time

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::DomainError;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::user::{
    NewUserRecord, UserId, UserPatch, UserRecord, UserRecordStore, UserSnapshot,
};

/// Request for creating a new user
#[derive(Debug, Clone, Default)]
pub struct CreateUserRequest {
    /// Caller-chosen ID; a UUID v4 is generated when absent
    pub id: Option<String>,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// User service over an injected store and clock
pub struct UserService<C: Clock = SystemClock> {
    store: Arc<dyn UserRecordStore>,
    clock: Arc<C>,
}

impl UserService<SystemClock> {
    /// Create a service that uses wall-clock time
    pub fn with_system_clock(store: Arc<dyn UserRecordStore>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }
}

impl<C: Clock> UserService<C> {
    /// Create a new user service
    pub fn new(store: Arc<dyn UserRecordStore>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> Result<UserRecord, DomainError> {
        let id = request
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let new_record = NewUserRecord {
            id,
            username: request.username,
            first_name: request.first_name,
            last_name: request.last_name,
        };

        let now = self.clock.now_millis();
        let result = self.store.create(new_record, now).await;
        log_outcome("create", &result);

        result
    }

    /// Get a user by ID
    pub async fn get(&self, id: &str) -> Result<UserRecord, DomainError> {
        let user_id = existing_id(id)?;
        self.store.get(&user_id).await
    }

    /// Get a user by username
    pub async fn get_by_username(&self, username: &str) -> Result<UserRecord, DomainError> {
        self.store.get_by_username(username).await
    }

    /// Update a user's username and names
    pub async fn update(&self, id: &str, patch: UserPatch) -> Result<UserRecord, DomainError> {
        let user_id = existing_id(id)?;
        let now = self.clock.now_millis();

        let result = self.store.update(&user_id, patch, now).await;
        log_outcome("update", &result);

        result
    }

    /// Delete a user
    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let user_id = existing_id(id)?;

        match self.store.delete(&user_id).await {
            Ok(()) => {
                info!(user_id = %user_id, "User deleted");
                Ok(())
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User delete rejected");
                Err(e)
            }
        }
    }

    /// List all users in insertion order
    pub async fn list(&self) -> Result<UserSnapshot, DomainError> {
        self.store.list().await
    }

    /// Count users
    pub async fn count(&self) -> Result<usize, DomainError> {
        self.store.count().await
    }

    /// Check whether a user ID is taken
    pub async fn exists(&self, id: &str) -> Result<bool, DomainError> {
        match UserId::new(id) {
            Ok(user_id) => self.store.exists(&user_id).await,
            Err(_) => Ok(false),
        }
    }

    /// Check whether a username is taken
    pub async fn username_exists(&self, username: &str) -> Result<bool, DomainError> {
        self.store.username_exists(username).await
    }
}

/// IDs of stored records are never empty, so an empty lookup key is simply absent
fn existing_id(id: &str) -> Result<UserId, DomainError> {
    UserId::new(id).map_err(|_| DomainError::not_found(format!("User '{}' not found", id)))
}

fn log_outcome(operation: &str, result: &Result<UserRecord, DomainError>) {
    match result {
        Ok(record) => info!(
            operation,
            user_id = %record.id(),
            username = record.username(),
            updated_at = record.updated_at(),
            "User mutation applied"
        ),
        Err(e) if e.is_client_error() => {
            warn!(operation, error = %e, "User mutation rejected")
        }
        Err(e) => tracing::error!(operation, error = %e, "User mutation failed"),
    }
}
