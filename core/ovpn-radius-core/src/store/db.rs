//! SQLite persistence for session records.
//!
//! One row per session key. The table is created on open, the database runs
//! in WAL mode so readers in other hook processes keep seeing the last
//! committed row while a writer holds the store lock.
//!
//! A `SessionStore` owns exactly one connection for the lifetime of the hook
//! invocation and is dropped before the process exits. Records are never
//! cached in memory; every read goes to the database.

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::{RadiusError, Result};

use super::lock::StoreLock;
use super::SessionRecord;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SELECT_COLUMNS: &str = "key, principal, endpoint, class_tag, created_at, updated_at";

pub struct SessionStore {
    conn: Connection,
    path: PathBuf,
    lock: StoreLock,
}

impl SessionStore {
    /// Opens the store described by `config`, creating it if needed.
    pub fn open_with_config(config: &Config) -> Result<Self> {
        Self::open(
            &config.database.path,
            StoreLock::new(config.lock_path(), config.database.lock_timeout()),
        )
    }

    pub fn open(path: &Path, lock: StoreLock) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)
                .map_err(|err| RadiusError::io("Failed to create database directory", err))?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|err| RadiusError::storage("Failed to open sqlite db", err))?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|err| RadiusError::storage("Failed to set busy_timeout", err))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|err| RadiusError::storage("Failed to enable WAL", err))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|err| RadiusError::storage("Failed to set synchronous", err))?;

        let store = Self {
            conn,
            path: path.to_path_buf(),
            lock,
        };
        store.init_schema()?;
        tracing::debug!(path = %store.path.display(), "Session store opened");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts a new record. An existing key yields `DuplicateSession`.
    pub fn create(&self, record: &SessionRecord) -> Result<SessionRecord> {
        let _guard = self.lock.acquire()?;

        let result = self.conn.execute(
            "INSERT INTO sessions (key, principal, endpoint, class_tag, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.key,
                record.principal,
                record.endpoint,
                record.class_tag,
                record.created_at,
                record.updated_at
            ],
        );

        match result {
            Ok(_) => Ok(record.clone()),
            Err(err) if is_unique_violation(&err) => {
                Err(RadiusError::DuplicateSession(record.key.clone()))
            }
            Err(err) => Err(RadiusError::storage("Failed to insert session", err)),
        }
    }

    pub fn get(&self, key: &str) -> Result<SessionRecord> {
        self.conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM sessions WHERE key = ?1"),
                params![key],
                record_from_row,
            )
            .optional()
            .map_err(|err| RadiusError::storage("Failed to query session", err))?
            .ok_or_else(|| RadiusError::NotFound(key.to_string()))
    }

    /// Replaces the mutable fields of the record stored under `record.key`.
    pub fn update(&self, record: &SessionRecord) -> Result<SessionRecord> {
        if record.key.is_empty() {
            return Err(RadiusError::InvalidKey);
        }

        let _guard = self.lock.acquire()?;

        let updated_at = Utc::now().to_rfc3339();
        let rows = self
            .conn
            .execute(
                "UPDATE sessions SET principal = ?2, endpoint = ?3, class_tag = ?4, updated_at = ?5 \
                 WHERE key = ?1",
                params![
                    record.key,
                    record.principal,
                    record.endpoint,
                    record.class_tag,
                    updated_at
                ],
            )
            .map_err(|err| RadiusError::storage("Failed to update session", err))?;

        if rows == 0 {
            return Err(RadiusError::UpdateFailed(record.key.clone()));
        }

        Ok(SessionRecord {
            updated_at,
            ..record.clone()
        })
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock.acquire()?;

        let rows = self
            .conn
            .execute("DELETE FROM sessions WHERE key = ?1", params![key])
            .map_err(|err| RadiusError::storage("Failed to delete session", err))?;

        if rows == 0 {
            return Err(RadiusError::DeleteFailed(key.to_string()));
        }
        Ok(())
    }

    /// Every stored record, oldest first. Diagnostics only.
    pub fn list_all(&self) -> Result<Vec<SessionRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM sessions ORDER BY created_at ASC, key ASC"
            ))
            .map_err(|err| RadiusError::storage("Failed to prepare sessions query", err))?;

        let rows = stmt
            .query_map([], record_from_row)
            .map_err(|err| RadiusError::storage("Failed to read session rows", err))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|err| RadiusError::storage("Failed to decode session row", err))?);
        }
        Ok(records)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS sessions (
                    key TEXT NOT NULL PRIMARY KEY,
                    principal TEXT NOT NULL,
                    endpoint TEXT,
                    class_tag TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                 );",
            )
            .map_err(|err| RadiusError::storage("Failed to create sessions table", err))
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        key: row.get(0)?,
        principal: row.get(1)?,
        endpoint: row.get(2)?,
        class_tag: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && (failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}
