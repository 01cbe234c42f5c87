use directories::ProjectDirs;
use eyre::ContextCompat as _;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct MooringPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl MooringPaths {
    pub fn discover() -> eyre::Result<Self> {
        // Test/CI override knobs.
        if let (Ok(data_dir), Ok(config_dir)) = (
            std::env::var("MOORING_DATA_DIR"),
            std::env::var("MOORING_CONFIG_DIR"),
        ) {
            let data_dir = PathBuf::from(data_dir);
            let config_dir = PathBuf::from(config_dir);
            let log_file = data_dir.join("mooring.log.jsonl");
            return Ok(Self {
                config_dir,
                data_dir,
                log_file,
            });
        }

        // Default locations:
        // macOS: ~/Library/Application Support/mooring
        // Linux: ~/.config/mooring
        // Windows: %APPDATA%\\mooring
        let proj = ProjectDirs::from("", "", "mooring").context("failed to resolve project dirs")?;
        let config_dir = proj.config_dir().to_path_buf();
        let data_dir = proj.data_dir().to_path_buf();
        let log_file = data_dir.join("mooring.log.jsonl");

        Ok(Self {
            config_dir,
            data_dir,
            log_file,
        })
    }

    pub fn ensure_private_dirs(&self) -> eyre::Result<()> {
        crate::fsutil::ensure_private_dir(&self.config_dir)?;
        crate::fsutil::ensure_private_dir(&self.data_dir)?;
        Ok(())
    }
}
