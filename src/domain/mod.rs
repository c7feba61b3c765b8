//! Domain layer - Core entities, errors and traits

pub mod clock;
pub mod error;
pub mod user;

pub use clock::{Clock, SystemClock};
pub use error::DomainError;
