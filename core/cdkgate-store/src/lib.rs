//! CDK record store for CDKGate.
//!
//! Provides durable keyed access to CDK records behind the [`CdkStore`]
//! trait, with two implementations:
//! - [`SqliteStore`]: the production store, one SQLite table with a unique
//!   index on the code column
//! - [`MemoryStore`]: a mutex-guarded map with identical semantics, used by
//!   the engine tests and anywhere a throwaway store is convenient
//!
//! The store owns the one piece of concurrency-sensitive logic in the
//! system: [`CdkStore::try_bind`] is a compare-and-swap that flips a record
//! from unused to bound in a single atomic step, so two racing first-use
//! verifications on the same code can never both win.

mod error;
mod memory;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use cdkgate_types::{CdkCode, CdkRecord, DeviceId};
use chrono::{DateTime, Utc};

/// Durable keyed access to CDK records.
///
/// All mutating operations are atomic with respect to concurrent callers:
/// `insert` either fully creates a record or fails, `try_bind` performs its
/// read-check-write as one step, and `delete_used` removes all matching
/// records or none.
pub trait CdkStore: Send + Sync {
    /// Inserts a fresh record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateCode`] if a record with the same code
    /// already exists, used or not.
    fn insert(&self, record: &CdkRecord) -> StoreResult<()>;

    /// Looks up a record by its canonical code.
    fn find_by_code(&self, code: &CdkCode) -> StoreResult<Option<CdkRecord>>;

    /// Looks up the used record bound to the given device, if any.
    fn find_by_device(&self, device: &DeviceId) -> StoreResult<Option<CdkRecord>>;

    /// Atomically binds the record for `code` to `device` iff it exists and
    /// is still unused. Returns true iff this call performed the bind.
    ///
    /// At most one concurrent caller per code can observe true; losers see
    /// false and must re-read to classify the outcome.
    fn try_bind(
        &self,
        code: &CdkCode,
        device: &DeviceId,
        used_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Total number of records.
    fn count_all(&self) -> StoreResult<u64>;

    /// Number of used (bound) records.
    fn count_used(&self) -> StoreResult<u64>;

    /// All records, newest first.
    fn list_all(&self) -> StoreResult<Vec<CdkRecord>>;

    /// Unused records, newest first. Used by the export tooling.
    fn list_unused(&self) -> StoreResult<Vec<CdkRecord>>;

    /// Deletes every used record in one atomic operation, returning how
    /// many were removed. Callers are responsible for confirmation.
    fn delete_used(&self) -> StoreResult<usize>;
}
