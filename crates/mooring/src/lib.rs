//! Encrypted keystore import and account activation for a local EVM
//! wallet.
//!
//! The entry point is [`ImportService::import_keystore`]: hand it the raw
//! bytes of a password-protected V3 keystore file and a password, and on
//! success the decrypted key is registered in the in-memory keyring and
//! its address becomes the active account — atomically, with every
//! failure path leaving prior state untouched and no secret material
//! outliving the call.

#![expect(
    clippy::multiple_crate_versions,
    reason = "transitive dependency duplication"
)]

pub mod address;
pub mod config;
pub mod errors;
mod fsutil;
pub mod import;
pub mod keyring;
pub mod keystore;
pub mod paths;
pub mod selector;
mod telemetry;

pub use address::Address;
pub use errors::ImportError;
pub use import::{ImportOutcome, ImportService};
