//! Shared test helpers for core tests.

#![allow(dead_code)]

use cdkgate_store::{CdkStore, MemoryStore};
use cdkgate_types::{CdkCode, CdkRecord};

pub fn store() -> MemoryStore {
    MemoryStore::new()
}

/// Seeds an unused record with a fixed canonical code and returns the code
/// string as a client would type it.
pub fn seed_code(store: &dyn CdkStore, canonical: &str) -> CdkCode {
    let code = CdkCode::from_canonical(canonical).unwrap();
    store.insert(&CdkRecord::new(code.clone())).unwrap();
    code
}

pub const CODE_A: &str = "ABCD1234EFGH5678";
pub const CODE_B: &str = "ZZZZ9999YYYY8888";
