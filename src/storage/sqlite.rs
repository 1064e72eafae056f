use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{Backend, PutOutcome, Revision, Stored};
use crate::error::{Result, StoreError};

/// Get the database path (~/.local/share/skcstore/skcstore.db or platform equivalent)
pub fn default_db_path() -> Result<PathBuf> {
    let data_dir = directories::ProjectDirs::from("", "", "skcstore")
        .ok_or_else(|| StoreError::Backend("could not determine data directory".to_string()))?
        .data_dir()
        .to_path_buf();

    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join("skcstore.db"))
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            revision INTEGER NOT NULL
        )",
        [],
    )?;

    // revisions come from one counter for the whole table, so a key that is
    // deleted and created again never repeats a revision
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_meta (
            name TEXT PRIMARY KEY NOT NULL,
            value INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO kv_meta (name, value)
         VALUES ('last_revision', (SELECT COALESCE(MAX(revision), 0) FROM kv))",
        [],
    )?;

    Ok(())
}

fn to_sql_revision(revision: Revision) -> i64 {
    i64::try_from(revision).unwrap_or(i64::MAX)
}

fn from_sql_revision(revision: i64) -> Revision {
    revision.max(0) as Revision
}

/// Database handle. Open once, share across all tenants.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // concurrent processes wait for each other's write transactions
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&default_db_path()?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(SqliteBackend { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock()
            .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".to_string()))
    }
}

impl Backend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<Stored>> {
        let conn = self.conn()?;
        let stored = conn
            .query_row(
                "SELECT value, revision FROM kv WHERE key = ?1",
                params![key],
                |row| {
                    Ok(Stored {
                        value: row.get(0)?,
                        revision: from_sql_revision(row.get(1)?),
                    })
                },
            )
            .optional()?;

        Ok(stored)
    }

    fn put(&self, key: &str, value: &str, expected: Option<Revision>) -> Result<PutOutcome> {
        let mut conn = self.conn()?;

        // the counter bump and the row write commit together or not at all
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "UPDATE kv_meta SET value = value + 1 WHERE name = 'last_revision'",
            [],
        )?;
        let revision: i64 = tx.query_row(
            "SELECT value FROM kv_meta WHERE name = 'last_revision'",
            [],
            |row| row.get(0),
        )?;

        let changed = match expected {
            None => tx.execute(
                "INSERT INTO kv (key, value, revision) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO NOTHING",
                params![key, value, revision],
            )?,
            Some(expected) => tx.execute(
                "UPDATE kv SET value = ?2, revision = ?3
                 WHERE key = ?1 AND revision = ?4",
                params![key, value, revision, to_sql_revision(expected)],
            )?,
        };

        if changed == 0 {
            // dropping the transaction rolls the counter back
            return Ok(PutOutcome::Conflict);
        }

        tx.commit()?;
        Ok(PutOutcome::Written(from_sql_revision(revision)))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let changed = self.conn()?.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(changed > 0)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT key FROM kv
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key"
        )?;

        let keys = stmt.query_map(params![prefix], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(keys)
    }
}
