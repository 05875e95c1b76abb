//! Persistent Store
//!
//! SQLite-backed storage for users and their tickets.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     username TEXT UNIQUE NOT NULL,
//!     password_hash TEXT NOT NULL,
//!     wallet INTEGER NOT NULL DEFAULT 0
//! );
//!
//! CREATE TABLE games (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     number1 INTEGER NOT NULL, number2 INTEGER NOT NULL,
//!     number3 INTEGER NOT NULL, number4 INTEGER NOT NULL,
//!     dealer INTEGER NOT NULL,
//!     prize INTEGER NOT NULL,
//!     user_id INTEGER NOT NULL REFERENCES users(id),
//!     win INTEGER NOT NULL DEFAULT 1,
//!     created_at TEXT NOT NULL
//! );
//! ```
//!
//! A single connection sits behind a mutex. Every wallet read-modify-write
//! happens inside one transaction while that mutex is held, so concurrent
//! requests for the same user are serialized.

mod games;
mod users;

use crate::settlement::SettlementError;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Storage for users, wallets and tickets.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    hash_cost: u32,
}

impl Store {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self::with_connection(conn)?;
        info!("Store opened at {}", path.as_ref().display());
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            hash_cost: bcrypt::DEFAULT_COST,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Override the bcrypt cost used for new password hashes.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                wallet INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                number1 INTEGER NOT NULL,
                number2 INTEGER NOT NULL,
                number3 INTEGER NOT NULL,
                number4 INTEGER NOT NULL,
                dealer INTEGER NOT NULL,
                prize INTEGER NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id),
                win INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_user_created
                ON games(user_id, created_at DESC);
            "#,
        )?;
        Ok(())
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Errors from the store.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Hash(bcrypt::BcryptError),
    Settlement(SettlementError),
    UserAlreadyExists(String),
    UserNotFound,
    GameNotFound(i64),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "SQLite error: {}", e),
            Self::Hash(e) => write!(f, "Password hashing error: {}", e),
            Self::Settlement(e) => write!(f, "{}", e),
            Self::UserAlreadyExists(name) => write!(f, "User already exists: {}", name),
            Self::UserNotFound => write!(f, "User not found"),
            Self::GameNotFound(id) => write!(f, "Game not found: {}", id),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

impl From<bcrypt::BcryptError> for StoreError {
    fn from(e: bcrypt::BcryptError) -> Self {
        Self::Hash(e)
    }
}

impl From<SettlementError> for StoreError {
    fn from(e: SettlementError) -> Self {
        Self::Settlement(e)
    }
}

#[cfg(test)]
pub(crate) fn test_store() -> Store {
    // bcrypt's minimum cost keeps the tests fast
    Store::in_memory().unwrap().with_hash_cost(4)
}
