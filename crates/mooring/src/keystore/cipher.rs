use aes::cipher::{KeyIvInit as _, StreamCipher as _};
use rand::Rng as _;
use sha3::{Digest as _, Keccak256};
use subtle::ConstantTimeEq as _;
use zeroize::Zeroizing;

use super::{
    codec::{self, CipherParams, CryptoSection, KdfParams, KeystoreFile},
    kdf::{self, DerivedKey},
};
use crate::{address::Address, errors::ImportError};

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

/// Web3 Secret Storage MAC: `keccak256(dk[16..32] || ciphertext)`.
fn compute_mac(derived: &DerivedKey, ciphertext: &[u8]) -> [u8; codec::MAC_LEN] {
    let mut hasher = Keccak256::new();
    hasher.update(derived.mac_key());
    hasher.update(ciphertext);
    hasher.finalize().into()
}

/// Recompute the authentication tag and compare in constant time. A
/// mismatch means the password was wrong (or the file was tampered with);
/// either way no plaintext may be trusted, so callers never decrypt before
/// this passes.
pub fn verify_mac(derived: &DerivedKey, blob: &codec::KeystoreBlob) -> Result<(), ImportError> {
    let computed = compute_mac(derived, &blob.ciphertext);
    if computed.len() != blob.mac.len() || !bool::from(computed.as_slice().ct_eq(&blob.mac)) {
        return Err(ImportError::InvalidPassword);
    }
    Ok(())
}

/// Apply the AES-128-CTR keystream. Only called after [`verify_mac`]
/// succeeds; the plaintext is zeroized on drop.
pub fn decrypt(
    derived: &DerivedKey,
    blob: &codec::KeystoreBlob,
) -> Result<Zeroizing<Vec<u8>>, ImportError> {
    let mut cipher = Aes128Ctr::new_from_slices(derived.encryption_key(), &blob.iv)
        .map_err(|e| ImportError::malformed(format!("cipher init: {e}")))?;
    let mut plaintext = Zeroizing::new(blob.ciphertext.clone());
    cipher.apply_keystream(plaintext.as_mut_slice());
    Ok(plaintext)
}

/// KDF cost settings for [`seal_keystore`].
#[derive(Debug, Clone, Copy)]
pub enum SealParams {
    Scrypt { log_n: u8, r: u32, p: u32 },
    Pbkdf2 { rounds: u32 },
}

impl Default for SealParams {
    fn default() -> Self {
        // geth's standard scrypt cost.
        Self::Scrypt {
            log_n: 18,
            r: 8,
            p: 1,
        }
    }
}

impl SealParams {
    /// Fast parameters for fixtures and tests. Insecure for real keys.
    pub const fn light() -> Self {
        Self::Scrypt {
            log_n: 4,
            r: 8,
            p: 1,
        }
    }
}

/// Produce a V3 keystore blob wrapping `secret` under `password`. The
/// output interoperates with any Web3 Secret Storage consumer.
pub fn seal_keystore(
    secret: &[u8; 32],
    password: &str,
    params: &SealParams,
) -> eyre::Result<String> {
    let mut salt = [0_u8; 32];
    rand::rng().fill_bytes(&mut salt);
    let mut iv = [0_u8; codec::IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let kdf_params = match *params {
        SealParams::Scrypt { log_n, r, p } => KdfParams::Scrypt {
            log_n,
            r,
            p,
            salt: salt.to_vec(),
        },
        SealParams::Pbkdf2 { rounds } => KdfParams::Pbkdf2 {
            rounds,
            salt: salt.to_vec(),
        },
    };

    let pw = secrecy::SecretString::new(password.to_owned().into());
    let derived = kdf::derive(&kdf_params, &pw)?;

    let mut buf = Zeroizing::new(secret.to_vec());
    let mut cipher = Aes128Ctr::new_from_slices(derived.encryption_key(), &iv)
        .map_err(|e| eyre::eyre!("cipher init: {e}"))?;
    cipher.apply_keystream(buf.as_mut_slice());
    // The keystream ran in place; `buf` now holds ciphertext, not the key.
    let ciphertext = buf.to_vec();

    let mac = compute_mac(&derived, &ciphertext);
    let address = Address::from_secret_key(secret)?;

    let kdfparams_json = match kdf_params {
        KdfParams::Scrypt { log_n, r, p, salt } => serde_json::json!({
            "dklen": codec::DKLEN,
            "n": 1_u64 << u32::from(log_n),
            "r": r,
            "p": p,
            "salt": hex::encode(salt),
        }),
        KdfParams::Pbkdf2 { rounds, salt } => serde_json::json!({
            "dklen": codec::DKLEN,
            "c": rounds,
            "prf": codec::PBKDF2_PRF,
            "salt": hex::encode(salt),
        }),
    };

    let file = KeystoreFile {
        version: codec::VERSION_3,
        id: Some(uuid::Uuid::new_v4().to_string()),
        address: Some(hex::encode(address.as_bytes())),
        crypto: CryptoSection {
            cipher: codec::CIPHER_AES_128_CTR.to_owned(),
            cipherparams: CipherParams {
                iv: hex::encode(iv),
            },
            ciphertext: hex::encode(&ciphertext),
            kdf: match params {
                SealParams::Scrypt { .. } => "scrypt".to_owned(),
                SealParams::Pbkdf2 { .. } => "pbkdf2".to_owned(),
            },
            kdfparams: kdfparams_json,
            mac: hex::encode(mac),
        },
    };

    serde_json::to_string_pretty(&file).map_err(|e| eyre::eyre!("serialize keystore: {e}"))
}
