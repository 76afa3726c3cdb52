//! Read-only device authorization queries.

use crate::CoreResult;
use cdkgate_store::CdkStore;
use cdkgate_types::DeviceId;

/// Returns true iff a used record is bound to the given device.
///
/// Pure read, safe to call at any rate.
///
/// # Errors
///
/// Returns `CoreError::Validation` for an empty device id, or a store error
/// if the lookup fails.
pub fn is_device_authorized(store: &dyn CdkStore, raw_device: &str) -> CoreResult<bool> {
    let device = DeviceId::parse(raw_device)?;
    Ok(store.find_by_device(&device)?.is_some())
}
