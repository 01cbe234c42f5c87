use serde::{Deserialize, Serialize};

use crate::{config::ImportLimits, errors::ImportError};

pub const VERSION_3: u32 = 3;
pub const CIPHER_AES_128_CTR: &str = "aes-128-ctr";
pub const PBKDF2_PRF: &str = "hmac-sha256";

pub const IV_LEN: usize = 16;
pub const MAC_LEN: usize = 32;
/// A secp256k1 secret key under a stream cipher: ciphertext length equals
/// plaintext length.
pub const CIPHERTEXT_LEN: usize = 32;
pub const DKLEN: u32 = 32;

// scrypt memory use is 128 * n * r bytes; r * p is additionally bounded by
// the scrypt spec itself.
const MAX_SCRYPT_RP: u64 = 1 << 30;

/// Raw serde shape of a V3 keystore file (geth/`MetaMask` layout). `kdfparams`
/// stays an untyped value here so an unknown `kdf` identifier can be told
/// apart from a structurally broken file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct KeystoreFile {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(alias = "Crypto")]
    pub crypto: CryptoSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CryptoSection {
    pub cipher: String,
    pub cipherparams: CipherParams,
    pub ciphertext: String,
    pub kdf: String,
    pub kdfparams: serde_json::Value,
    pub mac: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CipherParams {
    pub iv: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ScryptParamsJson {
    dklen: u32,
    n: u64,
    r: u32,
    p: u32,
    salt: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Pbkdf2ParamsJson {
    dklen: u32,
    c: u32,
    prf: String,
    salt: String,
}

/// Validated key-derivation parameters from a parsed blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KdfParams {
    Scrypt {
        log_n: u8,
        r: u32,
        p: u32,
        salt: Vec<u8>,
    },
    Pbkdf2 {
        rounds: u32,
        salt: Vec<u8>,
    },
}

impl KdfParams {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Scrypt { .. } => "scrypt",
            Self::Pbkdf2 { .. } => "pbkdf2",
        }
    }
}

/// Immutable, structurally validated representation of a keystore file.
/// Every field has been length-checked for the declared algorithms before
/// any cryptographic step runs.
#[derive(Debug, Clone)]
pub struct KeystoreBlob {
    pub id: Option<String>,
    /// Address string the file claims to wrap. Display metadata only; the
    /// registered address is always derived from the decrypted key.
    pub declared_address: Option<String>,
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub mac: Vec<u8>,
    pub kdf: KdfParams,
}

impl KeystoreBlob {
    /// Non-secret metadata for display surfaces.
    pub fn metadata(&self) -> serde_json::Value {
        let kdf = match &self.kdf {
            KdfParams::Scrypt { log_n, r, p, .. } => serde_json::json!({
                "kdf": "scrypt",
                "n": 1_u64 << u32::from(*log_n),
                "r": r,
                "p": p,
            }),
            KdfParams::Pbkdf2 { rounds, .. } => serde_json::json!({
                "kdf": "pbkdf2",
                "prf": PBKDF2_PRF,
                "c": rounds,
            }),
        };
        serde_json::json!({
            "version": VERSION_3,
            "cipher": CIPHER_AES_128_CTR,
            "id": self.id,
            "address": self.declared_address,
            "kdf": kdf,
        })
    }
}

fn decode_hex(s: &str, field: &str) -> Result<Vec<u8>, ImportError> {
    let bare = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(bare).map_err(|e| ImportError::malformed(format!("invalid {field} hex: {e}")))
}

fn validate_scrypt(raw: &ScryptParamsJson, limits: &ImportLimits) -> Result<KdfParams, ImportError> {
    if raw.dklen != DKLEN {
        return Err(ImportError::malformed(format!(
            "scrypt dklen must be {DKLEN}, got {}",
            raw.dklen
        )));
    }
    if raw.n < 2 || !raw.n.is_power_of_two() {
        return Err(ImportError::malformed(format!(
            "scrypt n must be a power of two >= 2, got {}",
            raw.n
        )));
    }
    if raw.n > limits.max_scrypt_n {
        return Err(ImportError::malformed(format!(
            "scrypt n {} exceeds the configured limit {}",
            raw.n, limits.max_scrypt_n
        )));
    }
    if raw.r == 0 || raw.p == 0 {
        return Err(ImportError::malformed(
            "scrypt r and p must be non-zero".to_owned(),
        ));
    }
    if u64::from(raw.r) * u64::from(raw.p) >= MAX_SCRYPT_RP {
        return Err(ImportError::malformed(format!(
            "scrypt r * p must be below {MAX_SCRYPT_RP}"
        )));
    }
    let salt = decode_hex(&raw.salt, "kdf salt")?;
    if salt.is_empty() {
        return Err(ImportError::malformed("empty kdf salt".to_owned()));
    }
    let log_n = u8::try_from(raw.n.trailing_zeros())
        .map_err(|e| ImportError::malformed(format!("scrypt n out of range: {e}")))?;
    Ok(KdfParams::Scrypt {
        log_n,
        r: raw.r,
        p: raw.p,
        salt,
    })
}

fn validate_pbkdf2(raw: &Pbkdf2ParamsJson, limits: &ImportLimits) -> Result<KdfParams, ImportError> {
    if raw.prf != PBKDF2_PRF {
        return Err(ImportError::unsupported(format!("pbkdf2 prf: {}", raw.prf)));
    }
    if raw.dklen != DKLEN {
        return Err(ImportError::malformed(format!(
            "pbkdf2 dklen must be {DKLEN}, got {}",
            raw.dklen
        )));
    }
    if raw.c == 0 {
        return Err(ImportError::malformed(
            "pbkdf2 iteration count must be non-zero".to_owned(),
        ));
    }
    if raw.c > limits.max_pbkdf2_c {
        return Err(ImportError::malformed(format!(
            "pbkdf2 iteration count {} exceeds the configured limit {}",
            raw.c, limits.max_pbkdf2_c
        )));
    }
    let salt = decode_hex(&raw.salt, "kdf salt")?;
    if salt.is_empty() {
        return Err(ImportError::malformed("empty kdf salt".to_owned()));
    }
    Ok(KdfParams::Pbkdf2 {
        rounds: raw.c,
        salt,
    })
}

/// Parse and validate a raw keystore file. Pure function of its inputs:
/// no cryptography runs here, only structure and range checks.
pub fn parse(raw: &[u8], limits: &ImportLimits) -> Result<KeystoreBlob, ImportError> {
    if raw.len() > limits.max_keystore_bytes {
        return Err(ImportError::malformed(format!(
            "keystore file exceeds {} bytes",
            limits.max_keystore_bytes
        )));
    }
    let text = std::str::from_utf8(raw)
        .map_err(|e| ImportError::malformed(format!("keystore is not UTF-8 text: {e}")))?;
    let file: KeystoreFile = serde_json::from_str(text)
        .map_err(|e| ImportError::malformed(format!("invalid keystore JSON: {e}")))?;

    if file.version != VERSION_3 {
        return Err(ImportError::unsupported(format!(
            "version {}",
            file.version
        )));
    }
    if file.crypto.cipher != CIPHER_AES_128_CTR {
        return Err(ImportError::unsupported(format!(
            "cipher: {}",
            file.crypto.cipher
        )));
    }

    let iv = decode_hex(&file.crypto.cipherparams.iv, "iv")?;
    if iv.len() != IV_LEN {
        return Err(ImportError::malformed(format!(
            "iv must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }
    let ciphertext = decode_hex(&file.crypto.ciphertext, "ciphertext")?;
    if ciphertext.len() != CIPHERTEXT_LEN {
        return Err(ImportError::malformed(format!(
            "ciphertext must be {CIPHERTEXT_LEN} bytes, got {}",
            ciphertext.len()
        )));
    }
    let mac = decode_hex(&file.crypto.mac, "mac")?;
    if mac.len() != MAC_LEN {
        return Err(ImportError::malformed(format!(
            "mac must be {MAC_LEN} bytes, got {}",
            mac.len()
        )));
    }

    let kdf = match file.crypto.kdf.as_str() {
        "scrypt" => {
            let raw_params: ScryptParamsJson = serde_json::from_value(file.crypto.kdfparams)
                .map_err(|e| ImportError::malformed(format!("invalid scrypt params: {e}")))?;
            validate_scrypt(&raw_params, limits)?
        }
        "pbkdf2" => {
            let raw_params: Pbkdf2ParamsJson = serde_json::from_value(file.crypto.kdfparams)
                .map_err(|e| ImportError::malformed(format!("invalid pbkdf2 params: {e}")))?;
            validate_pbkdf2(&raw_params, limits)?
        }
        other => return Err(ImportError::unsupported(format!("kdf: {other}"))),
    };

    Ok(KeystoreBlob {
        id: file.id,
        declared_address: file.address,
        iv,
        ciphertext,
        mac,
        kdf,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse, KdfParams};
    use crate::{config::ImportLimits, errors::ImportError};
    use eyre::Context as _;

    fn scrypt_file(n: u64, dklen: u32) -> String {
        serde_json::json!({
            "version": 3,
            "id": "3198bc9c-6672-5ab3-d995-4942343ae5b6",
            "address": "7e5f4552091a69125d5dfcb7b8c2659029395bdf",
            "crypto": {
                "cipher": "aes-128-ctr",
                "cipherparams": { "iv": "6087dab2f9fdbbfaddc31a909735c1e6" },
                "ciphertext": "5318b4d5bcd28de64ee5559e671353e16f075ecae9f99c7a79a38af5f869aa46",
                "kdf": "scrypt",
                "kdfparams": {
                    "dklen": dklen,
                    "n": n,
                    "r": 8,
                    "p": 1,
                    "salt": "ae3cd4e7013836a3df6bd7241b12db061dbe2c6785853cce422d148a624ce0bd"
                },
                "mac": "517ead924a9d0dc3124507e3393d175ce3ff7c1e96529c6c555ce9e51205e9b2"
            }
        })
        .to_string()
    }

    fn pbkdf2_file(c: u32, prf: &str) -> String {
        serde_json::json!({
            "version": 3,
            "crypto": {
                "cipher": "aes-128-ctr",
                "cipherparams": { "iv": "6087dab2f9fdbbfaddc31a909735c1e6" },
                "ciphertext": "5318b4d5bcd28de64ee5559e671353e16f075ecae9f99c7a79a38af5f869aa46",
                "kdf": "pbkdf2",
                "kdfparams": {
                    "dklen": 32,
                    "c": c,
                    "prf": prf,
                    "salt": "ae3cd4e7013836a3df6bd7241b12db061dbe2c6785853cce422d148a624ce0bd"
                },
                "mac": "517ead924a9d0dc3124507e3393d175ce3ff7c1e96529c6c555ce9e51205e9b2"
            }
        })
        .to_string()
    }

    #[test]
    fn parses_valid_scrypt_keystore() -> eyre::Result<()> {
        let blob = parse(scrypt_file(262_144, 32).as_bytes(), &ImportLimits::default())
            .context("parse")?;
        assert_eq!(blob.kdf.name(), "scrypt");
        match blob.kdf {
            KdfParams::Scrypt { log_n, r, p, .. } => {
                assert_eq!(log_n, 18);
                assert_eq!(r, 8);
                assert_eq!(p, 1);
            }
            KdfParams::Pbkdf2 { .. } => eyre::bail!("expected scrypt params"),
        }
        assert_eq!(blob.iv.len(), 16);
        assert_eq!(blob.ciphertext.len(), 32);
        assert_eq!(blob.mac.len(), 32);
        assert_eq!(
            blob.declared_address.as_deref(),
            Some("7e5f4552091a69125d5dfcb7b8c2659029395bdf")
        );
        Ok(())
    }

    #[test]
    fn parses_valid_pbkdf2_keystore() -> eyre::Result<()> {
        let blob = parse(
            pbkdf2_file(262_144, "hmac-sha256").as_bytes(),
            &ImportLimits::default(),
        )
        .context("parse")?;
        assert_eq!(blob.kdf, KdfParams::Pbkdf2 {
            rounds: 262_144,
            salt: hex::decode("ae3cd4e7013836a3df6bd7241b12db061dbe2c6785853cce422d148a624ce0bd")
                .context("salt")?,
        });
        Ok(())
    }

    #[test]
    fn accepts_capitalized_crypto_section() -> eyre::Result<()> {
        let with_alias = scrypt_file(4096, 32).replace("\"crypto\"", "\"Crypto\"");
        parse(with_alias.as_bytes(), &ImportLimits::default()).context("parse")?;
        Ok(())
    }

    #[test]
    fn rejects_unknown_cipher_as_unsupported() {
        let f = scrypt_file(4096, 32).replace("aes-128-ctr", "aes-256-gcm");
        let err = parse(f.as_bytes(), &ImportLimits::default());
        assert!(matches!(
            err,
            Err(ImportError::UnsupportedKeystoreFormat(_))
        ));
    }

    #[test]
    fn rejects_unknown_kdf_as_unsupported() {
        let f = scrypt_file(4096, 32).replace("\"kdf\":\"scrypt\"", "\"kdf\":\"argon2id\"");
        let err = parse(f.as_bytes(), &ImportLimits::default());
        assert!(matches!(
            err,
            Err(ImportError::UnsupportedKeystoreFormat(_))
        ));
    }

    #[test]
    fn rejects_unknown_pbkdf2_prf_as_unsupported() {
        let err = parse(
            pbkdf2_file(4096, "hmac-sha512").as_bytes(),
            &ImportLimits::default(),
        );
        assert!(matches!(
            err,
            Err(ImportError::UnsupportedKeystoreFormat(_))
        ));
    }

    #[test]
    fn rejects_unsupported_version() {
        let f = scrypt_file(4096, 32).replace("\"version\":3", "\"version\":4");
        let err = parse(f.as_bytes(), &ImportLimits::default());
        assert!(matches!(
            err,
            Err(ImportError::UnsupportedKeystoreFormat(_))
        ));
    }

    #[test]
    fn rejects_non_power_of_two_scrypt_n() {
        let err = parse(scrypt_file(1000, 32).as_bytes(), &ImportLimits::default());
        assert!(matches!(err, Err(ImportError::MalformedKeystore(_))));
    }

    #[test]
    fn rejects_wrong_dklen() {
        let err = parse(scrypt_file(4096, 16).as_bytes(), &ImportLimits::default());
        assert!(matches!(err, Err(ImportError::MalformedKeystore(_))));
    }

    #[test]
    fn rejects_scrypt_n_above_configured_limit() {
        let limits = ImportLimits {
            max_scrypt_n: 4096,
            ..ImportLimits::default()
        };
        let err = parse(scrypt_file(8192, 32).as_bytes(), &limits);
        assert!(matches!(err, Err(ImportError::MalformedKeystore(_))));
    }

    #[test]
    fn rejects_oversized_files_before_parsing() {
        let limits = ImportLimits {
            max_keystore_bytes: 64,
            ..ImportLimits::default()
        };
        let err = parse(scrypt_file(4096, 32).as_bytes(), &limits);
        assert!(matches!(err, Err(ImportError::MalformedKeystore(_))));
    }

    #[test]
    fn rejects_truncated_iv() {
        let f = scrypt_file(4096, 32).replace("6087dab2f9fdbbfaddc31a909735c1e6", "6087dab2");
        let err = parse(f.as_bytes(), &ImportLimits::default());
        assert!(matches!(err, Err(ImportError::MalformedKeystore(_))));
    }

    #[test]
    fn rejects_non_json_input() {
        let err = parse(b"not a keystore", &ImportLimits::default());
        assert!(matches!(err, Err(ImportError::MalformedKeystore(_))));
    }
}
