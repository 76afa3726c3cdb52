//! The verification engine: first-use binding and idempotent re-checks.
//!
//! Each record is a three-state machine with a single one-way transition,
//! `Unused -> Bound(device)`, taken at most once by the first successful
//! verification. Every other path through this module is a pure read.
//!
//! The bind itself is [`CdkStore::try_bind`], a compare-and-swap: when two
//! devices race on the same unused code, exactly one observes the swap and
//! the loser re-reads the record to learn who won. The store never holds a
//! half-bound record, so a failure anywhere aborts with no partial state.

use crate::CoreResult;
use cdkgate_store::CdkStore;
use cdkgate_types::{CdkCode, CdkRecord, DeviceId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Why a verification succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyReason {
    /// Unused code, now bound to the requesting device.
    FirstBindSuccess,
    /// The requesting device already holds this code's binding.
    AlreadyBoundToThisDevice,
    /// The code is bound to a different device.
    BoundToOtherDevice,
    /// No record with this code exists.
    CodeNotFound,
}

impl VerifyReason {
    /// Whether this reason represents a successful verification.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::FirstBindSuccess | Self::AlreadyBoundToThisDevice)
    }

    /// Human-readable message for API responses.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::FirstBindSuccess => "code verified, device bound",
            Self::AlreadyBoundToThisDevice => "code already bound to this device",
            Self::BoundToOtherDevice => "code is bound to another device",
            Self::CodeNotFound => "code not found",
        }
    }
}

/// The outcome of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    /// Whether the device may proceed to download.
    pub ok: bool,
    /// Machine-readable reason.
    pub reason: VerifyReason,
    /// Human-readable message matching the reason.
    pub message: String,
}

impl VerifyOutcome {
    fn from_reason(reason: VerifyReason) -> Self {
        Self {
            ok: reason.is_success(),
            reason,
            message: reason.message().to_string(),
        }
    }
}

/// Verifies a code for a device, binding on first use.
///
/// Decision table, evaluated in order:
/// 1. unknown code -> `CodeNotFound`
/// 2. used, bound to this device -> `AlreadyBoundToThisDevice` (no write)
/// 3. used, bound elsewhere -> `BoundToOtherDevice`
/// 4. unused -> compare-and-swap bind -> `FirstBindSuccess`
///
/// Input is trimmed and the code uppercased before lookup; empty inputs are
/// `CoreError::Validation` and never reach the store.
///
/// # Errors
///
/// Returns `CoreError::Validation` for malformed input or a store error if
/// the lookup or bind fails. Store failures leave no partial state.
pub fn verify_and_bind(
    store: &dyn CdkStore,
    raw_code: &str,
    raw_device: &str,
) -> CoreResult<VerifyOutcome> {
    let code = CdkCode::normalize(raw_code)?;
    let device = DeviceId::parse(raw_device)?;

    let Some(record) = store.find_by_code(&code)? else {
        debug!(device = %device, "verification failed: code not found");
        return Ok(VerifyOutcome::from_reason(VerifyReason::CodeNotFound));
    };

    if record.used {
        return Ok(classify_bound(&record, &device));
    }

    if store.try_bind(&code, &device, Utc::now())? {
        info!(device = %device, "first-use bind");
        return Ok(VerifyOutcome::from_reason(VerifyReason::FirstBindSuccess));
    }

    // Lost the race against a concurrent verification (or a concurrent
    // cleanup deleted the record). Re-read and classify.
    match store.find_by_code(&code)? {
        Some(record) if record.used => Ok(classify_bound(&record, &device)),
        _ => Ok(VerifyOutcome::from_reason(VerifyReason::CodeNotFound)),
    }
}

fn classify_bound(record: &CdkRecord, device: &DeviceId) -> VerifyOutcome {
    if record.is_bound_to(device) {
        VerifyOutcome::from_reason(VerifyReason::AlreadyBoundToThisDevice)
    } else {
        debug!(device = %device, "verification failed: code bound to another device");
        VerifyOutcome::from_reason(VerifyReason::BoundToOtherDevice)
    }
}
