//! In-memory user record store

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::DomainError;
use crate::domain::user::{
    NewUserRecord, UserId, UserPatch, UserRecord, UserRecordStore, UserSnapshot, user_not_found,
    username_not_found,
};

/// Both indexes plus insertion order, always mutated together
#[derive(Debug, Default)]
struct UserIndex {
    /// Insertion sequence -> record
    records: BTreeMap<u64, Arc<UserRecord>>,
    /// Primary index: user ID -> insertion sequence
    by_id: HashMap<String, u64>,
    /// Secondary index: username -> user ID
    by_username: HashMap<String, String>,
    next_seq: u64,
}

impl UserIndex {
    fn get(&self, id: &str) -> Option<&Arc<UserRecord>> {
        self.by_id.get(id).and_then(|seq| self.records.get(seq))
    }

    fn get_by_username(&self, username: &str) -> Option<&Arc<UserRecord>> {
        self.by_username.get(username).and_then(|id| self.get(id))
    }

    fn insert(&mut self, record: UserRecord) -> Result<Arc<UserRecord>, DomainError> {
        let id = record.id().as_str().to_string();

        if self.by_id.contains_key(&id) {
            return Err(DomainError::duplicate_id(id));
        }

        if self.by_username.contains_key(record.username()) {
            return Err(DomainError::duplicate_username(record.username()));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        self.by_username
            .insert(record.username().to_string(), id.clone());
        self.by_id.insert(id, seq);
        let record = Arc::new(record);
        self.records.insert(seq, Arc::clone(&record));

        Ok(record)
    }

    /// Swap in the new version of an existing record, keeping its position
    fn replace(&mut self, record: UserRecord) -> Result<Arc<UserRecord>, DomainError> {
        let id = record.id();
        let seq = *self.by_id.get(id.as_str()).ok_or_else(|| user_not_found(id))?;
        let old_username = self
            .records
            .get(&seq)
            .map(|old| old.username().to_string())
            .ok_or_else(|| user_not_found(id))?;

        if old_username != record.username() {
            if self.by_username.contains_key(record.username()) {
                return Err(DomainError::duplicate_username(record.username()));
            }

            self.by_username.remove(&old_username);
            self.by_username
                .insert(record.username().to_string(), id.as_str().to_string());
        }

        let record = Arc::new(record);
        self.records.insert(seq, Arc::clone(&record));

        Ok(record)
    }

    fn remove(&mut self, id: &UserId) -> Result<Arc<UserRecord>, DomainError> {
        let seq = self
            .by_id
            .remove(id.as_str())
            .ok_or_else(|| user_not_found(id))?;
        let record = self.records.remove(&seq).ok_or_else(|| user_not_found(id))?;
        self.by_username.remove(record.username());

        Ok(record)
    }

    fn snapshot(&self) -> UserSnapshot {
        UserSnapshot::new(self.records.values().cloned().collect())
    }
}

/// In-memory implementation of UserRecordStore
///
/// A single `RwLock` guards both indexes, so readers see either the state
/// before a mutation or after it, and mutations run one at a time.
#[derive(Debug, Default)]
pub struct InMemoryUserRecordStore {
    index: RwLock<UserIndex>,
}

impl InMemoryUserRecordStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with existing records, in the given order
    pub fn with_records(records: Vec<UserRecord>) -> Result<Self, DomainError> {
        let mut index = UserIndex::default();

        for record in records {
            index.insert(record)?;
        }

        Ok(Self {
            index: RwLock::new(index),
        })
    }
}

#[async_trait]
impl UserRecordStore for InMemoryUserRecordStore {
    async fn create(&self, record: NewUserRecord, now: i64) -> Result<UserRecord, DomainError> {
        let record = UserRecord::create(record, now)?;
        let mut index = self.index.write().await;

        let stored = index.insert(record)?;
        debug!(user_id = %stored.id(), username = stored.username(), "Inserted user record");

        Ok(UserRecord::clone(&stored))
    }

    async fn get(&self, id: &UserId) -> Result<UserRecord, DomainError> {
        let index = self.index.read().await;

        index
            .get(id.as_str())
            .map(|record| UserRecord::clone(record))
            .ok_or_else(|| user_not_found(id))
    }

    async fn get_by_username(&self, username: &str) -> Result<UserRecord, DomainError> {
        let index = self.index.read().await;

        index
            .get_by_username(username)
            .map(|record| UserRecord::clone(record))
            .ok_or_else(|| username_not_found(username))
    }

    async fn update(
        &self,
        id: &UserId,
        patch: UserPatch,
        now: i64,
    ) -> Result<UserRecord, DomainError> {
        let mut index = self.index.write().await;

        let current = index.get(id.as_str()).ok_or_else(|| user_not_found(id))?;
        let next = current.patched(&patch, now)?;

        let stored = index.replace(next)?;
        debug!(user_id = %id, updated_at = now, "Updated user record");

        Ok(UserRecord::clone(&stored))
    }

    async fn delete(&self, id: &UserId) -> Result<(), DomainError> {
        let mut index = self.index.write().await;

        let removed = index.remove(id)?;
        debug!(user_id = %id, username = removed.username(), "Deleted user record");

        Ok(())
    }

    async fn list(&self) -> Result<UserSnapshot, DomainError> {
        let index = self.index.read().await;
        Ok(index.snapshot())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let index = self.index.read().await;
        Ok(index.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(id: &str, username: &str) -> NewUserRecord {
        NewUserRecord::new(id, username)
    }

    fn user_id(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryUserRecordStore::new();

        let created = store.create(new_user("u1", "alice"), 100).await.unwrap();
        assert_eq!(created.created_at(), 100);
        assert_eq!(created.updated_at(), 100);

        let retrieved = store.get(&user_id("u1")).await.unwrap();
        assert_eq!(retrieved, created);
    }

    #[tokio::test]
    async fn test_get_by_username() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("u1", "alice"), 100).await.unwrap();

        let retrieved = store.get_by_username("alice").await.unwrap();
        assert_eq!(retrieved.id().as_str(), "u1");

        let err = store.get_by_username("Alice").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("u1", "alice"), 100).await.unwrap();

        let err = store.create(new_user("u2", "alice"), 101).await.unwrap_err();
        assert_eq!(err, DomainError::duplicate_username("alice"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("u1", "alice"), 100).await.unwrap();

        let err = store.create(new_user("u1", "bob"), 101).await.unwrap_err();
        assert_eq!(err, DomainError::duplicate_id("u1"));
        assert!(!store.username_exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_fields() {
        let store = InMemoryUserRecordStore::new();

        let err = store.create(new_user("", "alice"), 100).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { .. }));

        let err = store.create(new_user("u1", ""), 100).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { .. }));

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_username_moves_index() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("u1", "alice"), 100).await.unwrap();

        let updated = store
            .update(&user_id("u1"), UserPatch::new().with_username("alicia"), 200)
            .await
            .unwrap();

        assert_eq!(updated.username(), "alicia");
        assert_eq!(updated.created_at(), 100);
        assert_eq!(updated.updated_at(), 200);

        assert!(store.get_by_username("alice").await.is_err());
        assert_eq!(
            store.get_by_username("alicia").await.unwrap().id().as_str(),
            "u1"
        );
    }

    #[tokio::test]
    async fn test_update_to_same_username_is_not_a_conflict() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("u1", "alice"), 100).await.unwrap();

        let updated = store
            .update(&user_id("u1"), UserPatch::new().with_username("alice"), 150)
            .await
            .unwrap();

        assert_eq!(updated.username(), "alice");
        assert_eq!(updated.updated_at(), 150);
    }

    #[tokio::test]
    async fn test_update_conflict_leaves_record_untouched() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("u1", "alice"), 100).await.unwrap();
        store
            .create(new_user("u2", "bob").with_first_name("Bob"), 100)
            .await
            .unwrap();

        let patch = UserPatch::new()
            .with_username("alice")
            .with_first_name("Robert")
            .with_last_name("Builder");
        let err = store.update(&user_id("u2"), patch, 200).await.unwrap_err();
        assert_eq!(err, DomainError::duplicate_username("alice"));

        let bob = store.get(&user_id("u2")).await.unwrap();
        assert_eq!(bob.username(), "bob");
        assert_eq!(bob.first_name(), Some("Bob"));
        assert_eq!(bob.last_name(), None);
        assert_eq!(bob.updated_at(), 100);
        assert_eq!(
            store.get_by_username("alice").await.unwrap().id().as_str(),
            "u1"
        );
    }

    #[tokio::test]
    async fn test_update_rejects_earlier_timestamp() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("u1", "alice"), 100).await.unwrap();

        let err = store
            .update(&user_id("u1"), UserPatch::new(), 50)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::invalid_timestamp(100, 50));

        let record = store.get(&user_id("u1")).await.unwrap();
        assert_eq!(record.updated_at(), 100);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = InMemoryUserRecordStore::new();

        let err = store
            .update(&user_id("ghost"), UserPatch::new(), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_releases_both_indexes() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("u1", "alice"), 100).await.unwrap();

        store.delete(&user_id("u1")).await.unwrap();

        assert!(matches!(
            store.get(&user_id("u1")).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            store.get_by_username("alice").await,
            Err(DomainError::NotFound { .. })
        ));

        // Both keys are free again
        store.create(new_user("u1", "alice"), 300).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_record_changes_nothing() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("u2", "bob"), 100).await.unwrap();

        let err = store.delete(&user_id("u1")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        let all = store.list().await.unwrap().to_vec();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].username(), "bob");
    }

    #[tokio::test]
    async fn test_list_is_insertion_ordered_snapshot() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("z", "zed"), 1).await.unwrap();
        store.create(new_user("a", "amy"), 2).await.unwrap();
        store.create(new_user("m", "max"), 3).await.unwrap();

        // Renaming keeps the record's position
        store
            .update(&user_id("z"), UserPatch::new().with_username("zoe"), 4)
            .await
            .unwrap();

        let snapshot = store.list().await.unwrap();

        store.delete(&user_id("a")).await.unwrap();
        store.create(new_user("b", "ben"), 5).await.unwrap();

        let ids: Vec<String> = snapshot.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
        assert_eq!(snapshot.iter().next().unwrap().username(), "zoe");

        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["z", "m", "b"]);
    }

    #[tokio::test]
    async fn test_exists_helpers() {
        let store = InMemoryUserRecordStore::new();
        store.create(new_user("u1", "alice"), 100).await.unwrap();

        assert!(store.exists(&user_id("u1")).await.unwrap());
        assert!(!store.exists(&user_id("u2")).await.unwrap());
        assert!(store.username_exists("alice").await.unwrap());
        assert!(!store.username_exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_with_records() {
        let records = vec![
            UserRecord::create(new_user("u1", "alice"), 1).unwrap(),
            UserRecord::create(new_user("u2", "bob"), 2).unwrap(),
        ];

        let store = InMemoryUserRecordStore::with_records(records).unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.get_by_username("bob").await.is_ok());

        let clash = vec![
            UserRecord::create(new_user("u1", "alice"), 1).unwrap(),
            UserRecord::create(new_user("u2", "alice"), 2).unwrap(),
        ];
        assert!(InMemoryUserRecordStore::with_records(clash).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_with_same_username() {
        let store = Arc::new(InMemoryUserRecordStore::new());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .create(new_user(&format!("u{}", i), "alice"), 100)
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert_eq!(e, DomainError::duplicate_username("alice")),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_renames_to_same_username() {
        let store = Arc::new(InMemoryUserRecordStore::new());

        for i in 0..16 {
            store
                .create(
                    new_user(&format!("u{}", i), &format!("name{}", i)).with_last_name("Original"),
                    100,
                )
                .await
                .unwrap();
        }

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let patch = UserPatch::new()
                        .with_username("taken")
                        .with_last_name("Changed");
                    store.update(&user_id(&format!("u{}", i)), patch, 200).await
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(record) => winners.push(record.id().to_string()),
                Err(e) => assert_eq!(e, DomainError::duplicate_username("taken")),
            }
        }

        assert_eq!(winners.len(), 1);
        let holder = store.get_by_username("taken").await.unwrap();
        assert_eq!(holder.id().as_str(), winners[0]);

        // Losers keep their old username and names
        for record in &store.list().await.unwrap() {
            if record.id().as_str() == winners[0] {
                assert_eq!(record.last_name(), Some("Changed"));
            } else {
                assert_ne!(record.username(), "taken");
                assert_eq!(record.last_name(), Some("Original"));
                assert_eq!(record.updated_at(), 100);
                assert_eq!(
                    store.get_by_username(record.username()).await.unwrap().id(),
                    record.id()
                );
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_half_deleted_record() {
        let store = Arc::new(InMemoryUserRecordStore::new());

        for i in 0..50 {
            store
                .create(new_user(&format!("u{}", i), &format!("name{}", i)), 1)
                .await
                .unwrap();
        }

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..50 {
                    store.delete(&user_id(&format!("u{}", i))).await.unwrap();
                }
            })
        };

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..200 {
                    for i in 0..50 {
                        let by_name = store.get_by_username(&format!("name{}", i)).await;
                        if let Ok(record) = by_name {
                            assert_eq!(record.id().as_str(), format!("u{}", i));
                        }
                    }
                    let snapshot = store.list().await.unwrap();
                    for record in &snapshot {
                        assert!(record.updated_at() >= record.created_at());
                    }
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
