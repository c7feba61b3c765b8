//! User domain
//!
//! This module provides the user record entity, partial updates, snapshots,
//! validation, and the store trait.

mod entity;
mod patch;
mod repository;
mod snapshot;
mod validation;

pub use entity::{NewUserRecord, UserId, UserRecord};
pub use patch::UserPatch;
pub use repository::UserRecordStore;
pub(crate) use repository::{user_not_found, username_not_found};
pub use snapshot::{SnapshotIter, UserSnapshot};
pub use validation::{UserValidationError, validate_user_id, validate_username};
