//! The CDK record: the sole persistent entity of the system.
//!
//! A record moves through exactly one transition in its life:
//! `Unused -> Bound(device)`, taken at most once by the first successful
//! verification. Once bound, `bound_device` and `used_at` never change;
//! the only way out is administrative deletion of the whole record.

use crate::{CdkCode, CdkId, DeviceId, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single activation code and its binding state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdkRecord {
    /// Record identifier, assigned at creation, immutable.
    pub id: CdkId,
    /// The activation code, unique across all records including used ones.
    pub code: CdkCode,
    /// Whether the code has been redeemed. Flips to true exactly once.
    pub used: bool,
    /// The device the code is bound to; None until first redemption.
    pub bound_device: Option<DeviceId>,
    /// Creation time, immutable.
    pub created_at: DateTime<Utc>,
    /// Redemption time; set exactly once when `used` flips.
    pub used_at: Option<DateTime<Utc>>,
}

impl CdkRecord {
    /// Creates a fresh unused record for the given code.
    #[must_use]
    pub fn new(code: CdkCode) -> Self {
        Self {
            id: CdkId::new(),
            code,
            used: false,
            bound_device: None,
            created_at: Utc::now(),
            used_at: None,
        }
    }

    /// Reassembles a record from persisted fields, checking the binding
    /// invariants: an unused record carries no device and no `used_at`,
    /// a used record carries both.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRecord` if the persisted fields violate the
    /// invariants (which would indicate store corruption, not user error).
    pub fn from_parts(
        id: CdkId,
        code: CdkCode,
        used: bool,
        bound_device: Option<DeviceId>,
        created_at: DateTime<Utc>,
        used_at: Option<DateTime<Utc>>,
    ) -> crate::Result<Self> {
        match (used, &bound_device, &used_at) {
            (false, None, None) | (true, Some(_), Some(_)) => Ok(Self {
                id,
                code,
                used,
                bound_device,
                created_at,
                used_at,
            }),
            (false, _, _) => Err(Error::InvalidRecord(
                "unused record carries binding fields".to_string(),
            )),
            (true, _, _) => Err(Error::InvalidRecord(
                "used record is missing binding fields".to_string(),
            )),
        }
    }

    /// Returns true if this record is bound to the given device.
    #[must_use]
    pub fn is_bound_to(&self, device: &DeviceId) -> bool {
        self.used && self.bound_device.as_ref() == Some(device)
    }
}
