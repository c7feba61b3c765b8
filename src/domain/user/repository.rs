//! User record store trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{NewUserRecord, UserId, UserRecord};
use super::patch::UserPatch;
use super::snapshot::UserSnapshot;
use crate::domain::DomainError;

/// Storage for user records with unique `id` and `username` indexes
///
/// Implementations run each mutation as one indivisible step: the uniqueness
/// checks and the write happen under the same lock or transaction, and a
/// failed call leaves nothing behind. Timestamps are supplied by the caller as
/// epoch milliseconds.
#[async_trait]
pub trait UserRecordStore: Send + Sync + Debug {
    /// Insert a new record with `created_at = updated_at = now`
    async fn create(&self, record: NewUserRecord, now: i64) -> Result<UserRecord, DomainError>;

    /// Get a record by its ID
    async fn get(&self, id: &UserId) -> Result<UserRecord, DomainError>;

    /// Get a record by its username (exact, case-sensitive match)
    async fn get_by_username(&self, username: &str) -> Result<UserRecord, DomainError>;

    /// Apply `patch` to an existing record and stamp `updated_at = now`
    async fn update(
        &self,
        id: &UserId,
        patch: UserPatch,
        now: i64,
    ) -> Result<UserRecord, DomainError>;

    /// Remove a record and its username index entry
    async fn delete(&self, id: &UserId) -> Result<(), DomainError>;

    /// Snapshot of all records in insertion order
    async fn list(&self) -> Result<UserSnapshot, DomainError>;

    /// Number of live records
    async fn count(&self) -> Result<usize, DomainError>;

    /// Check if a user ID exists
    async fn exists(&self, id: &UserId) -> Result<bool, DomainError> {
        found(self.get(id).await)
    }

    /// Check if a username exists
    async fn username_exists(&self, username: &str) -> Result<bool, DomainError> {
        found(self.get_by_username(username).await)
    }
}

fn found(result: Result<UserRecord, DomainError>) -> Result<bool, DomainError> {
    match result {
        Ok(_) => Ok(true),
        Err(DomainError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

pub(crate) fn user_not_found(id: &UserId) -> DomainError {
    DomainError::not_found(format!("User '{}' not found", id))
}

pub(crate) fn username_not_found(username: &str) -> DomainError {
    DomainError::not_found(format!("Username '{}' not found", username))
}
