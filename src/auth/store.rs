//! Credential storage behind an injectable trait.
//!
//! Tables (SQLite backend):
//! - `users`: id, name, secret_hash, created_at
//! - `tasks`: id, user_id, title, created_at (storage only)
//!
//! Name uniqueness is enforced by the `UNIQUE` column, not by a
//! read-then-write check, so two concurrent registrations of the same name
//! cannot both succeed.

use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;

/// Connections kept by the SQLite pool. WAL mode lets reads from separate
/// connections proceed while a write holds the page lock.
const POOL_MAX_CONNECTIONS: u32 = 8;

/// Errors surfaced by a credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identity name is already registered. The store is unchanged.
    #[error("name is already registered")]
    AlreadyExists,
    /// The backing medium could not be reached or failed mid-operation.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// A registered identity. `id` is the stable internal reference handed to
/// downstream handlers; `name` never changes after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

/// An identity together with its stored secret hash, as returned by lookup.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub identity: Identity,
    pub secret_hash: String,
}

/// Persistent mapping from identity name to salted secret hash.
///
/// Injected wherever credentials are checked so tests can substitute
/// [`MemoryCredentialStore`] for the SQLite backend.
pub trait CredentialStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::AlreadyExists`] if the
    /// name is taken; the insert is atomic either way.
    fn insert(&self, name: &str, secret_hash: &str) -> Result<Identity, StoreError>;

    /// Look up a record by name. Pure read, no side effects.
    fn lookup(&self, name: &str) -> Result<Option<CredentialRecord>, StoreError>;

    /// Number of registered identities.
    fn count(&self) -> Result<u64, StoreError>;
}

// ── SQLite backend ──────────────────────────────────────────────────

/// SQLite-backed credential store using an r2d2 connection pool.
pub struct SqliteCredentialStore {
    pool: r2d2::Pool<SqliteConnectionManager>,
}

impl SqliteCredentialStore {
    /// Open (or create) the database at the given path and ensure the schema.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            // WAL mode for concurrent reads + crash safety
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
        });
        let pool = r2d2::Pool::builder()
            .max_size(POOL_MAX_CONNECTIONS)
            .build(manager)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let conn = pool.get().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                secret_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);",
        )
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, StoreError> {
        self.pool.get().map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn insert(&self, name: &str, secret_hash: &str) -> Result<Identity, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = epoch_secs();

        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO users (id, name, secret_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, name, secret_hash, now],
        );

        match result {
            Ok(_) => Ok(Identity {
                id,
                name: name.to_string(),
                created_at: now,
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::AlreadyExists)
            }
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    fn lookup(&self, name: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let conn = self.conn()?;
        let row = conn.query_row(
            "SELECT id, name, secret_hash, created_at FROM users WHERE name = ?1",
            rusqlite::params![name],
            |row| {
                Ok(CredentialRecord {
                    identity: Identity {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(3)?,
                    },
                    secret_hash: row.get(2)?,
                })
            },
        );

        match row {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(count as u64)
    }
}

// ── In-memory backend ───────────────────────────────────────────────

/// In-memory credential store for tests and ephemeral runs.
///
/// The duplicate check happens under the map lock, so it provides the same
/// atomic-insert guarantee as the SQLite `UNIQUE` constraint.
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Mutex<HashMap<String, CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn insert(&self, name: &str, secret_hash: &str) -> Result<Identity, StoreError> {
        let mut records = self.records.lock();
        if records.contains_key(name) {
            return Err(StoreError::AlreadyExists);
        }
        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: epoch_secs(),
        };
        records.insert(
            name.to_string(),
            CredentialRecord {
                identity: identity.clone(),
                secret_hash: secret_hash.to_string(),
            },
        );
        Ok(identity)
    }

    fn lookup(&self, name: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.lock().get(name).cloned())
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(self.records.lock().len() as u64)
    }
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
