//! In-memory CDK store.
//!
//! Same contract as the SQLite store behind a single mutex, which trivially
//! gives the per-code at-most-one-writer guarantee. Intended for engine
//! tests and ephemeral tooling; nothing survives the process.

use crate::{CdkStore, StoreError, StoreResult};
use cdkgate_types::{CdkCode, CdkRecord, DeviceId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Mutex-guarded map implementation of [`CdkStore`].
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, CdkRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_records<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, CdkRecord>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Corrupt("memory store mutex poisoned".to_string()))?;
        f(&mut records)
    }

    fn sorted_desc(mut records: Vec<CdkRecord>) -> Vec<CdkRecord> {
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(&a.id.as_uuid()))
        });
        records
    }
}

impl CdkStore for MemoryStore {
    fn insert(&self, record: &CdkRecord) -> StoreResult<()> {
        self.with_records(|records| {
            if records.contains_key(record.code.as_str()) {
                return Err(StoreError::DuplicateCode(record.code.to_string()));
            }
            records.insert(record.code.to_string(), record.clone());
            Ok(())
        })
    }

    fn find_by_code(&self, code: &CdkCode) -> StoreResult<Option<CdkRecord>> {
        self.with_records(|records| Ok(records.get(code.as_str()).cloned()))
    }

    fn find_by_device(&self, device: &DeviceId) -> StoreResult<Option<CdkRecord>> {
        self.with_records(|records| {
            Ok(records
                .values()
                .find(|r| r.is_bound_to(device))
                .cloned())
        })
    }

    fn try_bind(
        &self,
        code: &CdkCode,
        device: &DeviceId,
        used_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.with_records(|records| {
            match records.get_mut(code.as_str()) {
                Some(rec) if !rec.used => {
                    rec.used = true;
                    rec.bound_device = Some(device.clone());
                    rec.used_at = Some(used_at);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn count_all(&self) -> StoreResult<u64> {
        self.with_records(|records| Ok(records.len() as u64))
    }

    fn count_used(&self) -> StoreResult<u64> {
        self.with_records(|records| Ok(records.values().filter(|r| r.used).count() as u64))
    }

    fn list_all(&self) -> StoreResult<Vec<CdkRecord>> {
        self.with_records(|records| Ok(Self::sorted_desc(records.values().cloned().collect())))
    }

    fn list_unused(&self) -> StoreResult<Vec<CdkRecord>> {
        self.with_records(|records| {
            Ok(Self::sorted_desc(
                records.values().filter(|r| !r.used).cloned().collect(),
            ))
        })
    }

    fn delete_used(&self) -> StoreResult<usize> {
        self.with_records(|records| {
            let before = records.len();
            records.retain(|_, r| !r.used);
            Ok(before - records.len())
        })
    }
}
