use tracing::info;

use crate::{address::Address, errors::ImportError};

/// Emit the single outcome event for one import call. Carries the public
/// address on success and the stable error code on failure — never key
/// material, passwords, or derived keys.
pub(crate) fn emit_import_outcome(outcome: &Result<Address, ImportError>, elapsed_ms: u128) {
    match outcome {
        Ok(address) => info!(
            target: "mooring::telemetry",
            event = "keystore_import",
            outcome = "success",
            address = %address,
            elapsed_ms,
        ),
        Err(e) => info!(
            target: "mooring::telemetry",
            event = "keystore_import",
            outcome = "failure",
            error_code = e.code(),
            elapsed_ms,
        ),
    }
}
