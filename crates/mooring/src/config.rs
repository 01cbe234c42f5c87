use crate::paths::MooringPaths;
use eyre::Context as _;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Guard rails applied to an untrusted keystore file before any expensive
/// cryptographic work runs against it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImportLimits {
    /// Largest keystore file accepted, in bytes.
    pub max_keystore_bytes: usize,
    /// Largest scrypt cost parameter (`n`) accepted. Memory use is
    /// `128 * n * r` bytes, so this bounds both CPU and RAM.
    pub max_scrypt_n: u64,
    /// Largest pbkdf2 iteration count (`c`) accepted.
    pub max_pbkdf2_c: u32,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_keystore_bytes: 1024 * 1024,
            // Two orders of magnitude above geth's standard n=262144.
            max_scrypt_n: 1_u64 << 25_u32,
            max_pbkdf2_c: 10_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MooringConfig {
    pub limits: ImportLimits,
}

/// Apply environment variable overrides to the config.
fn apply_env_overrides(cfg: &mut MooringConfig) {
    if let Ok(v) = std::env::var("MOORING_MAX_SCRYPT_N") {
        if let Ok(n) = v.trim().parse::<u64>() {
            if n > 0 {
                cfg.limits.max_scrypt_n = n;
            }
        }
    }
    if let Ok(v) = std::env::var("MOORING_MAX_PBKDF2_C") {
        if let Ok(n) = v.trim().parse::<u32>() {
            if n > 0 {
                cfg.limits.max_pbkdf2_c = n;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(paths: &MooringPaths) -> Self {
        Self {
            path: paths.config_dir.join("config.toml"),
        }
    }

    pub fn load_or_init_default(&self) -> eyre::Result<MooringConfig> {
        if !self.path.exists() {
            let mut cfg = MooringConfig::default();
            apply_env_overrides(&mut cfg);
            self.save(&cfg)?;
            return Ok(cfg);
        }

        let s = fs::read_to_string(&self.path).context("read config.toml")?;
        let mut cfg: MooringConfig = toml::from_str(&s).context("parse config.toml")?;
        apply_env_overrides(&mut cfg);
        Ok(cfg)
    }

    pub fn save(&self, cfg: &MooringConfig) -> eyre::Result<()> {
        let s = toml::to_string_pretty(cfg).context("serialize config.toml")?;
        crate::fsutil::write_string_atomic_restrictive(
            &self.path,
            &s,
            crate::fsutil::MODE_FILE_PRIVATE,
        )
        .context("write config.toml")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ImportLimits, MooringConfig};
    use eyre::Context as _;

    #[test]
    fn defaults_round_trip_through_toml() -> eyre::Result<()> {
        let cfg = MooringConfig::default();
        let s = toml::to_string_pretty(&cfg).context("serialize")?;
        let back: MooringConfig = toml::from_str(&s).context("parse")?;
        assert_eq!(back.limits, cfg.limits);
        Ok(())
    }

    #[test]
    fn partial_config_fills_defaults() -> eyre::Result<()> {
        let cfg: MooringConfig =
            toml::from_str("[limits]\nmax_pbkdf2_c = 5000\n").context("parse")?;
        assert_eq!(cfg.limits.max_pbkdf2_c, 5_000);
        assert_eq!(
            cfg.limits.max_keystore_bytes,
            ImportLimits::default().max_keystore_bytes
        );
        Ok(())
    }
}
