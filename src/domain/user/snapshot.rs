//! Point-in-time views over a user store

use std::slice;
use std::sync::Arc;

use super::entity::UserRecord;

/// Immutable, insertion-ordered view of the records present when it was taken
///
/// Cloning is cheap and iteration can be restarted any number of times.
#[derive(Debug, Clone, Default)]
pub struct UserSnapshot {
    records: Arc<[Arc<UserRecord>]>,
}

impl UserSnapshot {
    pub fn new(records: Vec<Arc<UserRecord>>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn from_records(records: Vec<UserRecord>) -> Self {
        Self::new(records.into_iter().map(Arc::new).collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lazily yields owned copies in insertion order
    pub fn iter(&self) -> SnapshotIter<'_> {
        SnapshotIter {
            inner: self.records.iter(),
        }
    }

    pub fn to_vec(&self) -> Vec<UserRecord> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &'a UserSnapshot {
    type Item = UserRecord;
    type IntoIter = SnapshotIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`UserSnapshot`]
#[derive(Debug, Clone)]
pub struct SnapshotIter<'a> {
    inner: slice::Iter<'a, Arc<UserRecord>>,
}

impl Iterator for SnapshotIter<'_> {
    type Item = UserRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|record| UserRecord::clone(record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for SnapshotIter<'_> {}
