//! Core type definitions for CDKGate.
//!
//! This crate defines the fundamental types shared by the store, the
//! verification engine, and the server:
//! - `CdkId`: record identifier (UUID v7)
//! - `CdkCode`: the 16-character activation code with its syntax rules
//! - `DeviceId`: the opaque client-supplied device identifier
//! - `CdkRecord`: the sole persistent entity, with its one-way
//!   unused-to-bound transition
//!
//! Anything that touches SQLite or HTTP belongs in the store and server
//! crates, not here.

mod code;
mod ids;
mod record;

pub use code::{CdkCode, CODE_ALPHABET, CODE_LEN};
pub use ids::{CdkId, DeviceId};
pub use record::CdkRecord;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid CDK code: {0}")]
    InvalidCode(String),

    #[error("invalid device id: {0}")]
    InvalidDeviceId(String),

    #[error("invalid record state: {0}")]
    InvalidRecord(String),
}
