use secrecy::{ExposeSecret as _, SecretString};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::codec::KdfParams;
use crate::errors::ImportError;

pub const DERIVED_KEY_LEN: usize = 32;
const ENCRYPTION_KEY_LEN: usize = 16;

/// Output of the password KDF. Lives only inside one import attempt; the
/// bytes are overwritten when the value drops.
///
/// The Web3 Secret Storage split: bytes 0..16 key the cipher, bytes 16..32
/// key the MAC.
pub struct DerivedKey(Zeroizing<[u8; DERIVED_KEY_LEN]>);

impl DerivedKey {
    pub fn encryption_key(&self) -> &[u8] {
        let (enc, _) = self.0.split_at(ENCRYPTION_KEY_LEN);
        enc
    }

    pub fn mac_key(&self) -> &[u8] {
        let (_, mac) = self.0.split_at(ENCRYPTION_KEY_LEN);
        mac
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Run the key-derivation function the blob declares. Deterministic for
/// identical inputs; no I/O. Deliberately expensive — callers run this on
/// a blocking pool, never on an async worker.
pub fn derive(params: &KdfParams, password: &SecretString) -> Result<DerivedKey, ImportError> {
    let mut out = Zeroizing::new([0_u8; DERIVED_KEY_LEN]);
    match params {
        KdfParams::Scrypt { log_n, r, p, salt } => {
            let sp = scrypt::Params::new(*log_n, *r, *p, DERIVED_KEY_LEN)
                .map_err(|e| ImportError::malformed(format!("invalid scrypt params: {e}")))?;
            scrypt::scrypt(
                password.expose_secret().as_bytes(),
                salt,
                &sp,
                out.as_mut_slice(),
            )
            .map_err(|e| ImportError::DerivationFailed(e.to_string()))?;
        }
        KdfParams::Pbkdf2 { rounds, salt } => {
            pbkdf2::pbkdf2_hmac::<Sha256>(
                password.expose_secret().as_bytes(),
                salt,
                *rounds,
                out.as_mut_slice(),
            );
        }
    }
    Ok(DerivedKey(out))
}
