use k256::elliptic_curve::sec1::ToEncodedPoint as _;
use sha3::{Digest as _, Keccak256};

use crate::errors::ImportError;

pub const ADDRESS_LEN: usize = 20;

/// 20-byte EVM account identifier, derived deterministically from the
/// private key (Keccak-256 of the uncompressed public key, last 20 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Derive the address owned by a raw secp256k1 secret key.
    pub fn from_secret_key(secret: &[u8]) -> Result<Self, ImportError> {
        let sk = k256::ecdsa::SigningKey::from_slice(secret)
            .map_err(|e| ImportError::malformed(format!("invalid secp256k1 secret key: {e}")))?;
        let point = sk.verifying_key().to_encoded_point(false);
        // Skip the 0x04 SEC1 tag byte; hash the 64-byte public key.
        let pubkey = point
            .as_bytes()
            .get(1..)
            .ok_or_else(|| ImportError::malformed("empty public key encoding".to_owned()))?;
        let digest = Keccak256::digest(pubkey);
        let tail = digest
            .get(digest.len() - ADDRESS_LEN..)
            .ok_or_else(|| ImportError::malformed("short public key digest".to_owned()))?;
        let mut out = [0_u8; ADDRESS_LEN];
        out.copy_from_slice(tail);
        Ok(Self(out))
    }

    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// EIP-55 mixed-case rendering for display surfaces.
    pub fn checksummed(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = Keccak256::digest(lower.as_bytes());
        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = digest.get(i / 2).copied().unwrap_or(0);
            let nibble = if i % 2 == 0 { byte >> 4_u8 } else { byte & 0x0f };
            if nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({self})")
    }
}

impl std::str::FromStr for Address {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_part)
            .map_err(|e| ImportError::malformed(format!("invalid address hex: {e}")))?;
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            ImportError::malformed(format!("address must be {ADDRESS_LEN} bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::Address;
    use eyre::Context as _;

    #[test]
    fn derives_well_known_address_for_secret_key_one() -> eyre::Result<()> {
        let secret =
            hex::decode("0000000000000000000000000000000000000000000000000000000000000001")
                .context("decode secret")?;
        let addr = Address::from_secret_key(&secret).context("derive")?;
        assert_eq!(
            addr.to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        Ok(())
    }

    #[test]
    fn derivation_is_deterministic() -> eyre::Result<()> {
        let secret =
            hex::decode("4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")
                .context("decode secret")?;
        let a = Address::from_secret_key(&secret).context("a")?;
        let b = Address::from_secret_key(&secret).context("b")?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_secret_keys() {
        assert!(Address::from_secret_key(&[0_u8; 32]).is_err());
        assert!(Address::from_secret_key(&[0_u8; 16]).is_err());
    }

    #[test]
    fn eip55_checksum_vector() -> eyre::Result<()> {
        let addr: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
            .parse()
            .context("parse")?;
        assert_eq!(
            addr.checksummed(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        Ok(())
    }

    #[test]
    fn parse_display_round_trip() -> eyre::Result<()> {
        let s = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";
        let addr: Address = s.parse().context("parse")?;
        assert_eq!(addr.to_string(), s);
        Ok(())
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!("0xdeadbeef".parse::<Address>().is_err());
        assert!("not hex at all".parse::<Address>().is_err());
    }
}
