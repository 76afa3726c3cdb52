//! SQLite-backed CDK store.
//!
//! One table, one unique index on the code column. The first-use bind is a
//! single conditional UPDATE (`WHERE code = ? AND used = 0`), which is the
//! compare-and-swap the verification engine relies on: SQLite serializes
//! writers, so at most one racing caller sees a changed row.

use crate::{CdkStore, StoreError, StoreResult};
use cdkgate_types::{CdkCode, CdkId, CdkRecord, DeviceId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// How long a connection waits on a locked database before surfacing
/// [`StoreError::Busy`].
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cdks (
    id           TEXT PRIMARY KEY,
    code         TEXT NOT NULL UNIQUE,
    used         INTEGER NOT NULL DEFAULT 0,
    bound_device TEXT,
    created_at   INTEGER NOT NULL,
    used_at      INTEGER
);
CREATE INDEX IF NOT EXISTS idx_cdks_bound_device ON cdks (bound_device) WHERE used = 1;
";

/// SQLite implementation of [`CdkStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the store at the given path and runs migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    /// Opens a fresh in-memory store. Each call gets an isolated database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.execute_batch(SCHEMA)?;
        debug!("cdk store schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let conn = self.conn.lock().map_err(|_| {
            StoreError::Corrupt("store connection mutex poisoned".to_string())
        })?;
        f(&conn)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<StoreResult<CdkRecord>> {
    let id_str: String = row.get("id")?;
    let code_str: String = row.get("code")?;
    let used: bool = row.get("used")?;
    let device_str: Option<String> = row.get("bound_device")?;
    let created_ms: i64 = row.get("created_at")?;
    let used_ms: Option<i64> = row.get("used_at")?;
    Ok(decode_record(
        id_str, code_str, used, device_str, created_ms, used_ms,
    ))
}

fn decode_record(
    id_str: String,
    code_str: String,
    used: bool,
    device_str: Option<String>,
    created_ms: i64,
    used_ms: Option<i64>,
) -> StoreResult<CdkRecord> {
    let id = CdkId::parse(&id_str)
        .map_err(|e| StoreError::Corrupt(format!("bad record id {id_str}: {e}")))?;
    let code = CdkCode::from_canonical(&code_str)
        .map_err(|e| StoreError::Corrupt(format!("bad code {code_str}: {e}")))?;
    let bound_device = device_str
        .map(|d| DeviceId::parse(&d))
        .transpose()
        .map_err(|e| StoreError::Corrupt(format!("bad bound device: {e}")))?;
    let created_at = millis_to_utc(created_ms)?;
    let used_at = used_ms.map(millis_to_utc).transpose()?;
    CdkRecord::from_parts(id, code, used, bound_device, created_at, used_at)
        .map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn millis_to_utc(ms: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {ms}")))
}

impl CdkStore for SqliteStore {
    fn insert(&self, record: &CdkRecord) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cdks (id, code, used, bound_device, created_at, used_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.to_string(),
                    record.code.as_str(),
                    record.used,
                    record.bound_device.as_ref().map(|d| d.as_str()),
                    record.created_at.timestamp_millis(),
                    record.used_at.map(|t| t.timestamp_millis()),
                ],
            )
            .map_err(|e| match &e {
                rusqlite::Error::SqliteFailure(ffi, _)
                    if ffi.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::DuplicateCode(record.code.to_string())
                }
                _ => e.into(),
            })?;
            Ok(())
        })
    }

    fn find_by_code(&self, code: &CdkCode) -> StoreResult<Option<CdkRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, code, used, bound_device, created_at, used_at
                 FROM cdks WHERE code = ?1",
                params![code.as_str()],
                row_to_record,
            )
            .optional()?
            .transpose()
        })
    }

    fn find_by_device(&self, device: &DeviceId) -> StoreResult<Option<CdkRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, code, used, bound_device, created_at, used_at
                 FROM cdks WHERE bound_device = ?1 AND used = 1",
                params![device.as_str()],
                row_to_record,
            )
            .optional()?
            .transpose()
        })
    }

    fn try_bind(
        &self,
        code: &CdkCode,
        device: &DeviceId,
        used_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE cdks SET used = 1, bound_device = ?1, used_at = ?2
                 WHERE code = ?3 AND used = 0",
                params![device.as_str(), used_at.timestamp_millis(), code.as_str()],
            )?;
            Ok(changed == 1)
        })
    }

    fn count_all(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let n: u64 = conn.query_row("SELECT COUNT(*) FROM cdks", [], |r| r.get(0))?;
            Ok(n)
        })
    }

    fn count_used(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let n: u64 =
                conn.query_row("SELECT COUNT(*) FROM cdks WHERE used = 1", [], |r| r.get(0))?;
            Ok(n)
        })
    }

    fn list_all(&self) -> StoreResult<Vec<CdkRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, code, used, bound_device, created_at, used_at
                 FROM cdks ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt.query_map([], row_to_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row??);
            }
            Ok(records)
        })
    }

    fn list_unused(&self) -> StoreResult<Vec<CdkRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, code, used, bound_device, created_at, used_at
                 FROM cdks WHERE used = 0 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt.query_map([], row_to_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row??);
            }
            Ok(records)
        })
    }

    fn delete_used(&self) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM cdks WHERE used = 1", [])?;
            debug!(deleted, "deleted used cdk records");
            Ok(deleted)
        })
    }
}
