//! Time source for record timestamps

use chrono::Utc;

#[cfg(test)]
use mockall::automock;

/// Source of epoch-millisecond timestamps
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc::now`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
