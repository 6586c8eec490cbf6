//! SQLite-based store implementation

use chrono::{DateTime, Utc};
use powerlease_util::{add_seconds, from_unix_seconds, LeaseId};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{Lease, LeaseStore, Renewal, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS leases (
                id TEXT PRIMARY KEY NOT NULL,
                expire_time INTEGER NULL
            );

            CREATE INDEX IF NOT EXISTS idx_leases_expire_time ON leases(expire_time);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn decode_expiry(id: &str, secs: Option<i64>) -> StoreResult<Option<DateTime<Utc>>> {
    match secs {
        None => Ok(None),
        Some(secs) => from_unix_seconds(secs)
            .map(Some)
            .ok_or_else(|| StoreError::CorruptRow {
                id: id.to_string(),
                message: format!("expire_time {} out of range", secs),
            }),
    }
}

impl LeaseStore for SqliteStore {
    fn renew(
        &self,
        id: Option<&LeaseId>,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> StoreResult<Renewal> {
        let id = id.cloned().unwrap_or_else(LeaseId::generate);
        let expire_at = ttl.map(|ttl| add_seconds(now, ttl));
        let expire_secs = expire_at.map(|at| at.timestamp());

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO leases (id, expire_time) VALUES (?, ?) ON CONFLICT(id) DO NOTHING",
            params![id.as_str(), expire_secs],
        )?;
        let created = inserted == 1;
        if !created {
            tx.execute(
                "UPDATE leases SET expire_time = ? WHERE id = ?",
                params![expire_secs, id.as_str()],
            )?;
        }

        tx.commit()?;

        debug!(lease_id = %id, expire_at = ?expire_at, created, "Lease renewed");
        Ok(Renewal {
            id,
            expire_at,
            created,
        })
    }

    fn delete(&self, id: &LeaseId) -> StoreResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM leases WHERE id = ?", [id.as_str()])?;
        debug!(lease_id = %id, removed, "Lease deleted");
        Ok(removed > 0)
    }

    fn list(&self) -> StoreResult<Vec<Lease>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT id, expire_time FROM leases ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let expire_time: Option<i64> = row.get(1)?;
            Ok((id, expire_time))
        })?;

        let mut leases = Vec::new();
        for row in rows {
            let (id, expire_time) = row?;
            let expire_at = decode_expiry(&id, expire_time)?;
            leases.push(Lease {
                id: LeaseId::from(id),
                expire_at,
            });
        }

        Ok(leases)
    }

    fn has_any(&self, now: DateTime<Utc>) -> StoreResult<bool> {
        let conn = self.lock()?;
        let live: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM leases WHERE expire_time IS NULL OR expire_time > ?)",
            [now.timestamp()],
            |row| row.get(0),
        )?;
        Ok(live)
    }

    fn sweep(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM leases WHERE expire_time IS NOT NULL AND expire_time <= ?",
            [now.timestamp()],
        )?;
        if removed > 0 {
            debug!(removed, "Expired leases swept");
        }
        Ok(removed)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
