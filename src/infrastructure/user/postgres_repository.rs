//! PostgreSQL user record store

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::domain::DomainError;
use crate::domain::user::{
    NewUserRecord, UserId, UserPatch, UserRecord, UserRecordStore, UserSnapshot, user_not_found,
    username_not_found,
};

/// Default table holding user records
pub const DEFAULT_USERS_TABLE: &str = "users";

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Table holding user records
    pub table_name: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/users".to_string(),
            table_name: DEFAULT_USERS_TABLE.to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// PostgreSQL implementation of UserRecordStore
///
/// The primary key and a unique constraint on `username` back the two
/// indexes. Every mutation is a single statement or a single transaction, so
/// both constraints change together and commit before the call returns.
#[derive(Debug, Clone)]
pub struct PostgresUserRecordStore {
    pool: PgPool,
    table_name: String,
}

impl PostgresUserRecordStore {
    /// Create a new store over an existing pool
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Result<Self, DomainError> {
        let table_name = table_name.into();
        validate_table_name(&table_name)?;

        Ok(Self { pool, table_name })
    }

    /// Connect a pool using the given configuration
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        validate_table_name(&config.table_name)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Self::new(pool, config.table_name.clone())
    }

    /// Ensures the users table exists and carries the insertion order column
    ///
    /// Tables created with only the six record columns get `insertion_seq`
    /// added; existing rows are numbered in physical order.
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        sqlx::query(&create_table_sql(&self.table_name))
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;

        sqlx::query(&add_insertion_seq_sql(&self.table_name))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to add insertion_seq column: {}", e))
            })?;

        Ok(())
    }

    fn select_sql(&self, filter: &str) -> String {
        format!(
            "SELECT id, username, first_name, last_name, updated_at, created_at FROM {} {}",
            self.table_name, filter
        )
    }
}

#[async_trait]
impl UserRecordStore for PostgresUserRecordStore {
    async fn create(&self, record: NewUserRecord, now: i64) -> Result<UserRecord, DomainError> {
        let record = UserRecord::create(record, now)?;

        let query = format!(
            r#"
            INSERT INTO {} (id, username, first_name, last_name, updated_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
            self.table_name
        );

        sqlx::query(&query)
            .bind(record.id().as_str())
            .bind(record.username())
            .bind(record.first_name())
            .bind(record.last_name())
            .bind(record.updated_at())
            .bind(record.created_at())
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &self.table_name, &record, "create"))?;

        debug!(user_id = %record.id(), username = record.username(), "Inserted user row");

        Ok(record)
    }

    async fn get(&self, id: &UserId) -> Result<UserRecord, DomainError> {
        let row = sqlx::query(&self.select_sql("WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user: {}", e)))?;

        match row {
            Some(row) => row_to_record(&row),
            None => Err(user_not_found(id)),
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<UserRecord, DomainError> {
        let row = sqlx::query(&self.select_sql("WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user by username: {}", e)))?;

        match row {
            Some(row) => row_to_record(&row),
            None => Err(username_not_found(username)),
        }
    }

    async fn update(
        &self,
        id: &UserId,
        patch: UserPatch,
        now: i64,
    ) -> Result<UserRecord, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        let row = sqlx::query(&self.select_sql("WHERE id = $1 FOR UPDATE"))
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to lock user: {}", e)))?;

        // Dropping `tx` on any early return rolls it back
        let current = match row {
            Some(row) => row_to_record(&row)?,
            None => return Err(user_not_found(id)),
        };
        let next = current.patched(&patch, now)?;

        let query = format!(
            r#"
            UPDATE {}
            SET username = $2, first_name = $3, last_name = $4, updated_at = $5
            WHERE id = $1
            "#,
            self.table_name
        );

        sqlx::query(&query)
            .bind(next.id().as_str())
            .bind(next.username())
            .bind(next.first_name())
            .bind(next.last_name())
            .bind(next.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, &self.table_name, &next, "update"))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit update: {}", e)))?;

        debug!(user_id = %id, updated_at = now, "Updated user row");

        Ok(next)
    }

    async fn delete(&self, id: &UserId) -> Result<(), DomainError> {
        let query = format!("DELETE FROM {} WHERE id = $1", self.table_name);

        let result = sqlx::query(&query)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete user: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        debug!(user_id = %id, "Deleted user row");

        Ok(())
    }

    async fn list(&self) -> Result<UserSnapshot, DomainError> {
        let rows = sqlx::query(&self.select_sql("ORDER BY insertion_seq"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list users: {}", e)))?;

        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            records.push(row_to_record(&row)?);
        }

        Ok(UserSnapshot::from_records(records))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let query = format!("SELECT COUNT(*) FROM {}", self.table_name);

        let count: i64 = sqlx::query_scalar(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count users: {}", e)))?;

        Ok(count as usize)
    }
}

/// Which unique constraint a write tripped over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UniqueViolation {
    Id,
    Username,
}

fn primary_key_constraint(table: &str) -> String {
    format!("{}_pkey", table)
}

fn username_constraint(table: &str) -> String {
    format!("{}_username_key", table)
}

fn classify_unique_violation(table: &str, constraint: Option<&str>) -> UniqueViolation {
    match constraint {
        Some(name) if name == primary_key_constraint(table) => UniqueViolation::Id,
        Some(name) if name == username_constraint(table) => UniqueViolation::Username,
        // Only usernames can collide on UPDATE, and an unnamed violation on
        // INSERT is most likely the secondary index too
        _ => UniqueViolation::Username,
    }
}

fn map_write_error(
    err: sqlx::Error,
    table: &str,
    record: &UserRecord,
    operation: &str,
) -> DomainError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return match classify_unique_violation(table, db_err.constraint()) {
                UniqueViolation::Id => DomainError::duplicate_id(record.id().as_str()),
                UniqueViolation::Username => DomainError::duplicate_username(record.username()),
            };
        }
    }

    DomainError::storage(format!("Failed to {} user: {}", operation, err))
}

fn create_table_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT NOT NULL,
            username TEXT NOT NULL,
            first_name TEXT,
            last_name TEXT,
            updated_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL,
            insertion_seq BIGINT GENERATED ALWAYS AS IDENTITY,
            CONSTRAINT {pkey} PRIMARY KEY (id),
            CONSTRAINT {username_key} UNIQUE (username),
            CONSTRAINT {table}_id_not_empty CHECK (id <> ''),
            CONSTRAINT {table}_username_not_empty CHECK (username <> ''),
            CONSTRAINT {table}_timestamps_ordered CHECK (updated_at >= created_at)
        )
        "#,
        table = table,
        pkey = primary_key_constraint(table),
        username_key = username_constraint(table),
    )
}

fn add_insertion_seq_sql(table: &str) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS insertion_seq BIGINT GENERATED ALWAYS AS IDENTITY",
        table
    )
}

/// PostgreSQL truncates identifiers to 63 bytes; the longest derived
/// constraint suffix is `_username_not_empty` (19 bytes)
const MAX_TABLE_NAME_LEN: usize = 63 - "_username_not_empty".len();

/// Table names are interpolated into SQL, so only plain identifiers pass
fn validate_table_name(table: &str) -> Result<(), DomainError> {
    if table.len() > MAX_TABLE_NAME_LEN {
        return Err(DomainError::configuration(format!(
            "Table name '{}' exceeds {} characters",
            table, MAX_TABLE_NAME_LEN
        )));
    }

    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');

    if !valid_start
        || !table
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(DomainError::configuration(format!(
            "Invalid table name '{}'",
            table
        )));
    }

    Ok(())
}

fn row_to_record(row: &PgRow) -> Result<UserRecord, DomainError> {
    let get_err = |e: sqlx::Error| DomainError::storage(format!("Failed to read user row: {}", e));

    UserRecord::restore(
        row.try_get("id").map_err(get_err)?,
        row.try_get("username").map_err(get_err)?,
        row.try_get("first_name").map_err(get_err)?,
        row.try_get("last_name").map_err(get_err)?,
        row.try_get("created_at").map_err(get_err)?,
        row.try_get("updated_at").map_err(get_err)?,
    )
}
