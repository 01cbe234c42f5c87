use thiserror::Error;

/// Failure kinds of the keystore import flow.
///
/// Every variant has a stable machine-readable [`code`](ImportError::code)
/// for telemetry and a `Display` message suitable for direct display by a
/// UI collaborator. No variant ever carries key material or passwords.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("no keystore file selected")]
    NoFileSelected,

    #[error("malformed keystore: {0}")]
    MalformedKeystore(String),

    #[error("unsupported keystore format: {0}")]
    UnsupportedKeystoreFormat(String),

    #[error("invalid password")]
    InvalidPassword,

    #[error("unknown address: {0}")]
    UnknownAddress(String),

    /// Blocking-pool join failure during key derivation. Defensive; says
    /// nothing about the keystore or the password.
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
}

impl ImportError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoFileSelected => "no_file_selected",
            Self::MalformedKeystore(_) => "malformed_keystore",
            Self::UnsupportedKeystoreFormat(_) => "unsupported_keystore_format",
            Self::InvalidPassword => "invalid_password",
            Self::UnknownAddress(_) => "unknown_address",
            Self::DerivationFailed(_) => "derivation_failed",
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedKeystore(reason.into())
    }

    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        Self::UnsupportedKeystoreFormat(what.into())
    }
}
