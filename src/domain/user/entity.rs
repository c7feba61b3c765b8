//! User record entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patch::UserPatch;
use super::validation::{UserValidationError, validate_user_id, validate_username};
use crate::domain::DomainError;

/// Opaque user identifier; any non-empty string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();
        validate_user_id(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input for creating a user record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUserRecord {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl NewUserRecord {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            first_name: None,
            last_name: None,
        }
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }
}

/// A stored user record
///
/// Timestamps are epoch milliseconds. Records are only built by the stores,
/// which guarantees `updated_at >= created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    id: UserId,
    username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl UserRecord {
    /// Build a fresh record stamped with `now` for both timestamps
    pub(crate) fn create(new: NewUserRecord, now: i64) -> Result<Self, DomainError> {
        let id = UserId::new(new.id)?;
        validate_username(&new.username)?;

        Ok(Self {
            id,
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild a record loaded from durable storage
    pub(crate) fn restore(
        id: String,
        username: String,
        first_name: Option<String>,
        last_name: Option<String>,
        created_at: i64,
        updated_at: i64,
    ) -> Result<Self, DomainError> {
        let id = UserId::new(id)
            .map_err(|e| DomainError::storage(format!("Invalid user ID in database: {}", e)))?;

        if updated_at < created_at {
            return Err(DomainError::storage(format!(
                "User '{}' has updated_at {} before created_at {}",
                id, updated_at, created_at
            )));
        }

        Ok(Self {
            id,
            username,
            first_name,
            last_name,
            created_at,
            updated_at,
        })
    }

    /// Compute the record that results from applying `patch` at `now`
    ///
    /// Leaves `self` untouched; every check runs before any field is copied,
    /// so a rejected patch has no effect. Username collisions are the store's
    /// concern since they need the index.
    pub(crate) fn patched(&self, patch: &UserPatch, now: i64) -> Result<Self, DomainError> {
        if let Some(username) = &patch.username {
            validate_username(username)?;
        }

        if now < self.updated_at {
            return Err(DomainError::invalid_timestamp(self.updated_at, now));
        }

        let mut next = self.clone();

        if let Some(username) = &patch.username {
            next.username = username.clone();
        }
        if let Some(first_name) = &patch.first_name {
            next.first_name = first_name.clone();
        }
        if let Some(last_name) = &patch.last_name {
            next.last_name = last_name.clone();
        }
        next.updated_at = now;

        Ok(next)
    }

    // Getters

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Creation time as a UTC datetime, if the millis are in chrono's range
    pub fn created_at_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }

    /// Last update time as a UTC datetime, if the millis are in chrono's range
    pub fn updated_at_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.updated_at)
    }
}
