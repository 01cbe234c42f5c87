//! Web3 Secret Storage (V3) keystore handling: structural parsing and
//! validation, password-based key derivation, authentication-tag
//! verification, and decryption. The blob layout is an external contract
//! shared with geth/`MetaMask`-style tooling, not something this crate
//! invents.

pub mod cipher;
pub mod codec;
pub mod kdf;

pub use cipher::{seal_keystore, SealParams};
pub use codec::{KdfParams, KeystoreBlob};
pub use kdf::DerivedKey;
