//! SQLite-backed entity store
//!
//! The store is a handle, not a connection: every unit of work opens its own
//! connection, so handles can be cloned freely across worker threads.
//! Writes run inside `BEGIN IMMEDIATE` transactions; a failing closure rolls
//! the whole unit back.

pub mod queries;
mod schema;
mod types;

pub use types::*;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use miette::{IntoDiagnostic, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::core::config::{Config, DEFAULT_BUSY_TIMEOUT_MS};
use crate::core::project::Project;

/// Current schema version - opening a database with another version fails
const SCHEMA_VERSION: i32 = 1;

/// Handle to the durable entity store
#[derive(Debug, Clone)]
pub struct EntityStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl EntityStore {
    /// Open or create the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_timeout(path, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
    }

    /// Open the project's store using the configured busy timeout
    pub fn for_project(project: &Project, config: &Config) -> Result<Self> {
        Self::open_with_timeout(project.database_path(), config.busy_timeout())
    }

    pub fn open_with_timeout(path: impl Into<PathBuf>, busy_timeout: Duration) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).into_diagnostic()?;
        }

        let store = Self { path, busy_timeout };
        let conn = store.connect().into_diagnostic()?;

        // WAL lets readers proceed while a writer holds the lock
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .into_diagnostic()?;
        schema::ensure_schema(&conn)?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection with foreign keys enforced
    pub fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Run a read-only unit of work on its own connection
    pub fn read<T, E>(
        &self,
        f: impl FnOnce(&Connection) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    /// Run a unit of work in an immediate transaction, committing only on `Ok`
    pub fn write<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Parse a stored RFC 3339 timestamp
pub fn parse_timestamp(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests;
