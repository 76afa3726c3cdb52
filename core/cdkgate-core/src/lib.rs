//! CDK generation, verification, and gated delivery for CDKGate.
//!
//! This crate handles:
//! - Activation code generation from the OS CSPRNG, collision-checked
//!   against the store
//! - First-use device binding and idempotent re-verification
//! - Read-only device authorization queries
//! - Access-gated retrieval of the staged download asset
//! - Administrative batch operations (generate, list, cleanup, stats)
//!
//! # Design Principles
//!
//! - **One code, one device**: a code binds to the first device that redeems
//!   it and never moves
//! - **Idempotent re-verification**: the bound device may re-verify forever;
//!   that path never writes
//! - **Exactly one write**: binding is a store-level compare-and-swap, so a
//!   race between two devices has exactly one winner
//! - **Explicit store handle**: every operation takes the store as an
//!   argument, so tests run against an in-memory store behind the same trait
//!
//! The store is the single source of truth; this crate holds no state.

mod admin;
mod delivery;
mod device;
mod error;
mod generator;
mod verify;

pub use admin::{delete_used_codes, format_export, generate_codes, list_codes, stats, CdkStats};
pub use delivery::{fetch_asset_for_device, find_staged_asset, AssetHandle, ASSET_EXTENSIONS};
pub use device::is_device_authorized;
pub use error::{CoreError, CoreResult};
pub use generator::{generate_batch, generate_code, generate_unique, MAX_BATCH};
pub use verify::{verify_and_bind, VerifyOutcome, VerifyReason};
