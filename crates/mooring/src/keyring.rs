use zeroize::Zeroizing;

use crate::{address::Address, errors::ImportError};

pub const SECRET_KEY_LEN: usize = 32;

/// Opaque handle to registered private key material. Never serialized and
/// never printed; the bytes are overwritten when the owning account drops.
pub struct KeyHandle(Zeroizing<[u8; SECRET_KEY_LEN]>);

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only the (fixed, public) length; never the bytes.
        write!(f, "KeyHandle({} bytes)", self.0.len())
    }
}

/// A registered signing identity. The address is derived from the key at
/// registration time and immutable afterwards.
#[derive(Debug)]
pub struct Account {
    pub address: Address,
    pub label: Option<String>,
    pub key: KeyHandle,
}

/// In-memory set of known signing identities, insertion-ordered for
/// display. At most one account per address, enforced on every mutation.
#[derive(Debug, Default)]
pub struct KeyringRegistry {
    accounts: Vec<Account>,
}

impl KeyringRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register key material under its derived address.
    ///
    /// Re-importing a key whose address is already present returns the
    /// existing registration unchanged (idempotent re-import) — the label
    /// from the first import wins. The returned flag is `true` when a new
    /// account was created.
    pub fn add(
        &mut self,
        secret: Zeroizing<[u8; SECRET_KEY_LEN]>,
        label: Option<String>,
    ) -> Result<(Address, bool), ImportError> {
        let address = Address::from_secret_key(secret.as_slice())?;
        if self.contains(address) {
            return Ok((address, false));
        }
        self.accounts.push(Account {
            address,
            label,
            key: KeyHandle(secret),
        });
        Ok((address, true))
    }

    pub fn contains(&self, address: Address) -> bool {
        self.accounts.iter().any(|a| a.address == address)
    }

    pub fn get(&self, address: Address) -> Option<&Account> {
        self.accounts.iter().find(|a| a.address == address)
    }

    /// Accounts in insertion order.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
