//! Shared test helpers for store tests.

#![allow(dead_code)]

use cdkgate_types::{CdkCode, CdkRecord, DeviceId};

/// Builds a canonical code from a short tag, padded with zeros to 16 chars.
pub fn code(tag: &str) -> CdkCode {
    let padded = format!("{tag:0>16}");
    CdkCode::from_canonical(&padded.to_ascii_uppercase()).unwrap()
}

pub fn device(name: &str) -> DeviceId {
    DeviceId::parse(name).unwrap()
}

pub fn record(tag: &str) -> CdkRecord {
    CdkRecord::new(code(tag))
}
