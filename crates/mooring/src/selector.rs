use crate::{address::Address, errors::ImportError, keyring::KeyringRegistry};

/// Holds the single currently active address.
///
/// Invariant: `current()` is either `None` (empty keyring) or an address
/// present in the registry it is validated against. The switch is a plain
/// `Option` swap under the owner's lock — readers never observe a
/// half-updated selection, and a failed select leaves the previous value
/// in place.
#[derive(Debug, Default)]
pub struct AccountSelector {
    current: Option<Address>,
}

impl AccountSelector {
    pub const fn new() -> Self {
        Self { current: None }
    }

    pub fn select(
        &mut self,
        address: Address,
        registry: &KeyringRegistry,
    ) -> Result<(), ImportError> {
        if !registry.contains(address) {
            return Err(ImportError::UnknownAddress(address.to_string()));
        }
        self.current = Some(address);
        Ok(())
    }

    pub const fn current(&self) -> Option<Address> {
        self.current
    }
}
