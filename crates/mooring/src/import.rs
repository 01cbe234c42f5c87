use secrecy::SecretString;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

use crate::{
    address::Address,
    config::ImportLimits,
    errors::ImportError,
    keyring::{KeyringRegistry, SECRET_KEY_LEN},
    keystore::{cipher, codec, kdf},
    selector::AccountSelector,
    telemetry,
};

/// Outcome of one keystore import call: the newly active address, or a
/// typed error. Created fresh per call and consumed once by the caller.
pub type ImportOutcome = Result<Address, ImportError>;

#[derive(Debug, Default)]
struct WalletState {
    registry: KeyringRegistry,
    selector: AccountSelector,
}

/// Sequences one keystore import:
///
/// empty check → parse → derive → verify → decrypt → register → select
///
/// Each call starts fresh; the service keeps no per-call state. Failure at
/// any step short-circuits the rest and leaves the registry and the active
/// selection exactly as they were before the call.
#[derive(Debug)]
pub struct ImportService {
    state: Mutex<WalletState>,
    /// Serializes import attempts: a second concurrent call queues behind
    /// the first, so two imports can never race a registration.
    import_gate: Mutex<()>,
    limits: ImportLimits,
}

impl Default for ImportService {
    fn default() -> Self {
        Self::new(ImportLimits::default())
    }
}

impl ImportService {
    pub fn new(limits: ImportLimits) -> Self {
        Self {
            state: Mutex::new(WalletState::default()),
            import_gate: Mutex::new(()),
            limits,
        }
    }

    /// Import a password-protected keystore file and make its account the
    /// active one. Emits exactly one telemetry outcome event per call.
    pub async fn import_keystore(
        &self,
        raw_bytes: &[u8],
        password: SecretString,
        label: Option<String>,
    ) -> ImportOutcome {
        let started = Instant::now();
        let _gate = self.import_gate.lock().await;
        let outcome = self.run_import(raw_bytes, password, label).await;
        telemetry::emit_import_outcome(&outcome, started.elapsed().as_millis());
        outcome
    }

    async fn run_import(
        &self,
        raw_bytes: &[u8],
        password: SecretString,
        label: Option<String>,
    ) -> ImportOutcome {
        // Distinct from a malformed file: nothing was selected at all, and
        // no parser (let alone the KDF) should run.
        if raw_bytes.is_empty() {
            return Err(ImportError::NoFileSelected);
        }

        debug!(stage = "parsing", "keystore import");
        let blob = codec::parse(raw_bytes, &self.limits)?;

        debug!(stage = "deriving", kdf = blob.kdf.name(), "keystore import");
        // The KDF is expensive by design; run it on the blocking pool so
        // registry/selection readers are never stalled behind it. The
        // password moves into the task and is dropped (zeroized) there.
        let params = blob.kdf.clone();
        let derived = tokio::task::spawn_blocking(move || kdf::derive(&params, &password))
            .await
            .map_err(|e| ImportError::DerivationFailed(e.to_string()))??;

        debug!(stage = "verifying", "keystore import");
        cipher::verify_mac(&derived, &blob)?;

        debug!(stage = "decrypting", "keystore import");
        let plaintext = cipher::decrypt(&derived, &blob)?;
        drop(derived);
        if plaintext.len() != SECRET_KEY_LEN {
            return Err(ImportError::malformed(format!(
                "decrypted key must be {SECRET_KEY_LEN} bytes, got {}",
                plaintext.len()
            )));
        }
        let mut secret = Zeroizing::new([0_u8; SECRET_KEY_LEN]);
        secret.copy_from_slice(&plaintext);
        drop(plaintext);

        // Registration and selection form one short critical section: the
        // uniqueness check, the insert, and the selection swap all happen
        // under a single lock acquisition, and only after every fallible
        // cryptographic step has succeeded.
        debug!(stage = "registering", "keystore import");
        let mut state = self.state.lock().await;
        let WalletState { registry, selector } = &mut *state;
        let (address, newly_added) = registry.add(secret, label)?;
        debug!(stage = "selecting", newly_added, address = %address, "keystore import");
        selector.select(address, registry)?;
        Ok(address)
    }

    /// Currently active address, if any.
    pub async fn active(&self) -> Option<Address> {
        self.state.lock().await.selector.current()
    }

    /// Registered accounts in insertion order, as (address, label) pairs.
    pub async fn accounts(&self) -> Vec<(Address, Option<String>)> {
        self.state
            .lock()
            .await
            .registry
            .accounts()
            .iter()
            .map(|a| (a.address, a.label.clone()))
            .collect()
    }

    pub async fn contains(&self, address: Address) -> bool {
        self.state.lock().await.registry.contains(address)
    }
}
