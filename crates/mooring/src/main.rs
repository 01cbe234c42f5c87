#![expect(
    clippy::multiple_crate_versions,
    reason = "transitive dependency duplication"
)]

use clap::{Parser, Subcommand};
use eyre::Context as _;
use secrecy::SecretString;
use std::io::BufRead as _;
use tracing_subscriber::prelude::*;
use zeroize::Zeroize as _;

use mooring::{
    config::ConfigStore, import::ImportService, keystore::codec, paths::MooringPaths, ImportError,
};

#[derive(Parser, Debug)]
#[command(name = "mooring", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import an encrypted keystore file and activate its account.
    ///
    /// Prints a single JSON outcome to stdout. The password is prompted
    /// for on the terminal unless `--password-stdin` is given.
    Import {
        /// Path to the keystore JSON file.
        #[arg(long)]
        file: std::path::PathBuf,

        /// Optional display label for the imported account.
        #[arg(long)]
        label: Option<String>,

        /// Read the password from the first line of stdin instead of
        /// prompting (for scripts and tests).
        #[arg(long, default_value_t = false)]
        password_stdin: bool,
    },

    /// Validate a keystore file and print its metadata (no password, no
    /// key derivation).
    Inspect {
        /// Path to the keystore JSON file.
        #[arg(long)]
        file: std::path::PathBuf,
    },

    /// Print resolved paths (useful for debugging).
    Paths,
}

fn init_logging(paths: &MooringPaths) -> tracing_appender::non_blocking::WorkerGuard {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let file_name = paths
        .log_file
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("mooring.log.jsonl");
    let file_appender = tracing_appender::rolling::never(&paths.data_dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone());
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn print_json(v: &serde_json::Value) -> eyre::Result<()> {
    use std::io::Write as _;
    let s = serde_json::to_string(v).context("serialize output")?;
    writeln!(std::io::stdout().lock(), "{s}").context("write output")?;
    Ok(())
}

fn error_json(e: &ImportError) -> serde_json::Value {
    serde_json::json!({
        "ok": false,
        "error": { "code": e.code(), "message": e.to_string() },
    })
}

fn read_password(password_stdin: bool) -> eyre::Result<SecretString> {
    if password_stdin {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read password from stdin")?;
        let pw = SecretString::new(line.trim_end_matches(['\r', '\n']).to_owned().into());
        line.zeroize();
        Ok(pw)
    } else {
        let pw = rpassword::prompt_password("Keystore password: ").context("prompt for password")?;
        Ok(SecretString::new(pw.into()))
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let paths = MooringPaths::discover()?;
    paths.ensure_private_dirs()?;
    let _log_guard = init_logging(&paths);

    match cli.cmd {
        Command::Import {
            file,
            label,
            password_stdin,
        } => {
            let cfg = ConfigStore::new(&paths).load_or_init_default()?;
            let raw =
                std::fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            let password = read_password(password_stdin)?;

            let svc = ImportService::new(cfg.limits);
            match svc.import_keystore(&raw, password, label).await {
                Ok(address) => {
                    let accounts = svc.accounts().await.len();
                    print_json(&serde_json::json!({
                        "ok": true,
                        "address": address.checksummed(),
                        "accounts": accounts,
                    }))?;
                    Ok(())
                }
                Err(e) => {
                    print_json(&error_json(&e))?;
                    Err(eyre::eyre!("import failed: {e}"))
                }
            }
        }
        Command::Inspect { file } => {
            let cfg = ConfigStore::new(&paths).load_or_init_default()?;
            let raw =
                std::fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            let parsed = if raw.is_empty() {
                Err(ImportError::NoFileSelected)
            } else {
                codec::parse(&raw, &cfg.limits)
            };
            match parsed {
                Ok(blob) => {
                    print_json(&blob.metadata())?;
                    Ok(())
                }
                Err(e) => {
                    print_json(&error_json(&e))?;
                    Err(eyre::eyre!("inspect failed: {e}"))
                }
            }
        }
        Command::Paths => {
            print_json(&serde_json::json!({
                "config_dir": paths.config_dir,
                "data_dir": paths.data_dir,
                "log_file": paths.log_file,
            }))?;
            Ok(())
        }
    }
}
