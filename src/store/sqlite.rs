use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, WatchError};
use crate::store::SnapshotStore;

pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            WatchError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    /// Drop every snapshot whose expiry has passed.
    fn purge_expired(conn: &Connection, now: i64) -> Result<usize> {
        let purged = conn.execute(
            "DELETE FROM snapshots WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now],
        )?;
        if purged > 0 {
            tracing::debug!("Purged {} expired snapshots", purged);
        }
        Ok(purged)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn read_set(&self, key: &str) -> Result<BTreeSet<String>> {
        let conn = self.conn()?;
        Self::purge_expired(&conn, Utc::now().timestamp())?;

        let mut stmt =
            conn.prepare("SELECT alias FROM snapshot_members WHERE key = ?1 ORDER BY alias")?;
        let members = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;

        Ok(members)
    }

    fn replace_set(&self, key: &str, members: &BTreeSet<String>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM snapshots WHERE key = ?1", params![key])?;
        tx.execute(
            "INSERT INTO snapshots (key, updated_at, expires_at) VALUES (?1, ?2, NULL)",
            params![key, Utc::now().timestamp()],
        )?;
        {
            let mut insert =
                tx.prepare("INSERT INTO snapshot_members (key, alias) VALUES (?1, ?2)")?;
            for alias in members {
                insert.execute(params![key, alias])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let conn = self.conn()?;
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl_secs);

        let exists = conn
            .query_row(
                "SELECT 1 FROM snapshots WHERE key = ?1",
                params![key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(());
        }

        conn.execute(
            "UPDATE snapshots SET expires_at = ?1 WHERE key = ?2",
            params![expires_at, key],
        )?;
        Ok(())
    }
}
