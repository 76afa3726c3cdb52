//! Activation code generation.
//!
//! Codes are drawn from the OS CSPRNG; a predictable source would let an
//! attacker enumerate valid codes, so this is a correctness requirement,
//! not a style choice. Uniqueness is enforced by inserting against the
//! store's unique code index and retrying on collision, which keeps the
//! check-and-claim atomic instead of racing a separate lookup.

use crate::{CoreError, CoreResult};
use cdkgate_store::{CdkStore, StoreError};
use cdkgate_types::{CdkCode, CdkRecord, CODE_ALPHABET, CODE_LEN};
use rand::rngs::OsRng;
use rand::Rng;
use tracing::{info, warn};

/// Upper bound for one batch generation request.
pub const MAX_BATCH: usize = 1000;

/// Collision retries before giving up. At 36^16 combinations a single retry
/// is already extraordinary; hitting this cap means the store is
/// pathologically full and looping further would never terminate.
const MAX_UNIQUE_RETRIES: u32 = 32;

/// Generates one random 16-character code over `[A-Z0-9]`.
#[must_use]
pub fn generate_code() -> CdkCode {
    let mut rng = OsRng;
    let raw: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    CdkCode::from_canonical(&raw).expect("generated code is canonical by construction")
}

/// Generates a code, persists it, and returns the fresh record.
///
/// Collisions with existing codes are retried up to a fixed cap; the insert
/// itself is the uniqueness check, so two concurrent generators can never
/// both claim the same code.
///
/// # Errors
///
/// Returns `CoreError::Conflict` if the retry cap is exhausted, or the
/// store error if persistence fails for any other reason.
pub fn generate_unique(store: &dyn CdkStore) -> CoreResult<CdkRecord> {
    for attempt in 0..MAX_UNIQUE_RETRIES {
        let record = CdkRecord::new(generate_code());
        match store.insert(&record) {
            Ok(()) => return Ok(record),
            Err(StoreError::DuplicateCode(_)) => {
                warn!(attempt, "generated code collided, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(CoreError::Conflict(format!(
        "could not generate a unique code after {MAX_UNIQUE_RETRIES} attempts"
    )))
}

/// Generates and persists `count` distinct codes.
///
/// # Errors
///
/// Returns `CoreError::Validation` unless `1 <= count <= MAX_BATCH`.
pub fn generate_batch(store: &dyn CdkStore, count: usize) -> CoreResult<Vec<CdkRecord>> {
    if count < 1 || count > MAX_BATCH {
        return Err(CoreError::Validation(format!(
            "count must be between 1 and {MAX_BATCH}, got {count}"
        )));
    }

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(generate_unique(store)?);
    }
    info!(count, "generated cdk batch");
    Ok(records)
}
