use eyre::Context as _;
use rand::Rng as _;
use std::{
    fs::{self, OpenOptions},
    io::Write as _,
    path::Path,
};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt as _, PermissionsExt as _};

pub const MODE_DIR_PRIVATE: u32 = 0o700;
pub const MODE_FILE_PRIVATE: u32 = 0o600;

pub fn ensure_private_dir(dir: &Path) -> eyre::Result<()> {
    if dir.exists() {
        let md = fs::symlink_metadata(dir).with_context(|| format!("stat {}", dir.display()))?;
        if md.file_type().is_symlink() {
            eyre::bail!("refusing to use symlinked directory: {}", dir.display());
        }
        if !md.is_dir() {
            eyre::bail!("expected directory at {}", dir.display());
        }
    } else {
        fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    }

    // Best-effort: enforce private perms on Unix.
    #[cfg(unix)]
    {
        let md = fs::metadata(dir).with_context(|| format!("stat {}", dir.display()))?;
        if (md.permissions().mode() & 0o077) != 0 {
            fs::set_permissions(dir, fs::Permissions::from_mode(MODE_DIR_PRIVATE))
                .with_context(|| format!("chmod {MODE_DIR_PRIVATE:o} {}", dir.display()))?;
        }
    }

    Ok(())
}

/// Write via a fresh temp file in the same directory, then rename into
/// place. `rename` is atomic on Unix; readers never observe a partial file.
pub fn write_string_atomic_restrictive(path: &Path, s: &str, mode: u32) -> eyre::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| eyre::eyre!("missing parent for {}", path.display()))?;
    ensure_private_dir(parent)?;

    if path.exists() {
        let md = fs::symlink_metadata(path).with_context(|| format!("stat {}", path.display()))?;
        if md.file_type().is_symlink() {
            eyre::bail!("refusing to write to symlink: {}", path.display());
        }
    }

    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let mut rand_bytes = [0_u8; 8];
    rand::rng().fill_bytes(&mut rand_bytes);
    let tmp = parent.join(format!(".{base}.tmp.{}", hex::encode(rand_bytes)));

    let mut f = {
        #[cfg(unix)]
        {
            OpenOptions::new()
                .create_new(true)
                .write(true)
                .mode(mode)
                .open(&tmp)
                .with_context(|| format!("open temp {}", tmp.display()))?
        }
        #[cfg(not(unix))]
        {
            let _unused_on_this_platform = mode;
            OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&tmp)
                .with_context(|| format!("open temp {}", tmp.display()))?
        }
    };

    f.write_all(s.as_bytes())
        .with_context(|| format!("write {}", tmp.display()))?;
    f.sync_all()
        .with_context(|| format!("fsync {}", tmp.display()))?;
    drop(f);

    #[cfg(windows)]
    {
        if path.exists() {
            fs::remove_file(path).with_context(|| format!("remove existing {}", path.display()))?;
        }
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_string_atomic_restrictive;
    use eyre::Context as _;

    #[test]
    fn atomic_write_replaces_contents() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let p = dir.path().join("sub").join("file.toml");
        write_string_atomic_restrictive(&p, "first", super::MODE_FILE_PRIVATE)?;
        write_string_atomic_restrictive(&p, "second", super::MODE_FILE_PRIVATE)?;
        let got = std::fs::read_to_string(&p).context("read back")?;
        assert_eq!(got, "second");
        Ok(())
    }
}
