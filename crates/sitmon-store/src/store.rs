use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::Result;
use crate::migrations;

/// Single-writer embedded store (spec.md §4.1). All writes go through `conn`; the engine
/// is single-threaded for writes, so reads are funneled through the same mutex rather than
/// opened on a second connection, matching the reference implementation's single lock.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_millis(5000))?;
        migrations::apply(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside a single transaction, rolling back on error. Clustering requires this
    /// (candidate lookup, incident upsert, junction insert, count recompute, and any merge
    /// all need to see each other's writes and commit atomically).
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock().expect("store mutex poisoned");
        guard.execute_batch("BEGIN IMMEDIATE;")?;
        match f(&guard) {
            Ok(value) => {
                guard.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(e) => {
                let _ = guard.execute_batch("ROLLBACK;");
                Err(e)
            }
        }
    }

    /// Run `f` with direct connection access outside an explicit transaction (SQLite still
    /// wraps each statement, so single-statement callers don't need `transaction`).
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock().expect("store mutex poisoned");
        f(&guard)
    }
}
