//! Administrative operations: batch generation, listing, cleanup, stats.
//!
//! These are consumed by a separate trusted surface (admin listener, CLI);
//! the core deliberately does not authenticate them, and confirmation for
//! destructive cleanup is the caller's responsibility.

use crate::{generator, CoreResult};
use cdkgate_store::CdkStore;
use cdkgate_types::{CdkCode, CdkRecord};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Store-wide counters for the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdkStats {
    /// Total records, used and unused.
    pub total: u64,
    /// Records bound to a device.
    pub used: u64,
}

/// Generates and persists `count` codes, returning them newest-last.
///
/// # Errors
///
/// `CoreError::Validation` unless `1 <= count <= MAX_BATCH`.
pub fn generate_codes(store: &dyn CdkStore, count: usize) -> CoreResult<Vec<CdkCode>> {
    let records = generator::generate_batch(store, count)?;
    Ok(records.into_iter().map(|r| r.code).collect())
}

/// Lists every record, newest first.
pub fn list_codes(store: &dyn CdkStore) -> CoreResult<Vec<CdkRecord>> {
    Ok(store.list_all()?)
}

/// Deletes all used records atomically, returning how many were removed.
/// Unbinds the affected devices as a side effect of record deletion.
pub fn delete_used_codes(store: &dyn CdkStore) -> CoreResult<usize> {
    let deleted = store.delete_used()?;
    info!(deleted, "cleaned up used cdk records");
    Ok(deleted)
}

/// Formats records for file export: a commented header (marker, export
/// time, count) followed by one code per line. Callers pass the unused
/// records; this function does not filter.
#[must_use]
pub fn format_export(records: &[CdkRecord]) -> String {
    let mut out = String::new();
    out.push_str("# CDK export\n");
    out.push_str(&format!(
        "# exported: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("# count: {}\n\n", records.len()));
    for rec in records {
        out.push_str(rec.code.as_str());
        out.push('\n');
    }
    out
}

/// Returns store-wide counters.
pub fn stats(store: &dyn CdkStore) -> CoreResult<CdkStats> {
    Ok(CdkStats {
        total: store.count_all()?,
        used: store.count_used()?,
    })
}
