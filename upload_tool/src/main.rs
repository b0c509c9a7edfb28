//! Main entry point for the upload tool binary

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use upload_core::config::LoggingConfig;
use upload_core::{AppConfig, AppError, FileManager, PasswordHasher, UploadDescriptor};

#[derive(Parser, Debug)]
#[command(name = "upload-tool")]
#[command(about = "Validate staged uploads and move them into the public directory")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long, env = "UPLOAD_TOOL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a staged file and move it under the public root
    Store {
        /// Path of the staged file
        #[arg(long)]
        tmp: PathBuf,

        /// Name the client originally gave the file
        #[arg(long)]
        name: String,

        /// Declared size in bytes (defaults to the staged file's length)
        #[arg(long)]
        size: Option<u64>,

        /// Directory below the public root
        #[arg(long)]
        dest: Option<String>,

        /// Store under this base name instead of a generated id
        #[arg(long = "as")]
        stored_as: Option<String>,
    },
    /// Read a password from stdin and print its argon2id hash
    HashPassword,
    /// Print the effective configuration as TOML
    ShowConfig,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = AppConfig::load_from(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_tracing(&config.logging);
    info!("Configuration loaded successfully");
    for warning in config.warnings() {
        warn!("{}", warning);
    }

    match args.command {
        Command::Store { tmp, name, size, dest, stored_as } => {
            store(&config, tmp, name, size, dest, stored_as)
        }
        Command::HashPassword => hash_password(&config),
        Command::ShowConfig => {
            let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{}", rendered);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn store(
    config: &AppConfig,
    tmp: PathBuf,
    name: String,
    size: Option<u64>,
    dest: Option<String>,
    stored_as: Option<String>,
) -> Result<ExitCode> {
    let manager = FileManager::new(config.uploads.file_manager_config());
    manager
        .initialize()
        .map_err(|e| anyhow::anyhow!("Failed to initialize file manager: {}", e))?;

    let size = match size {
        Some(size) => size,
        None => std::fs::metadata(&tmp)
            .with_context(|| format!("Cannot read staged file {}", tmp.display()))?
            .len(),
    };

    let descriptor = UploadDescriptor::new(tmp, name, size);
    let destination = dest.unwrap_or_else(|| config.uploads.default_destination.clone());

    let result = match stored_as {
        Some(stored_as) => manager.store_as(descriptor, &destination, &stored_as),
        None => manager.store(descriptor, &destination),
    };

    match result {
        Ok(record) => {
            info!("Stored {} as {}", record.original_name, record.path.display());
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_client_error() => {
            report_rejection(&err);
            Ok(ExitCode::from(2))
        }
        Err(err) => Err(err.into()),
    }
}

fn report_rejection(err: &AppError) {
    for message in err.messages() {
        eprintln!("error: {}", message);
    }
}

fn hash_password(config: &AppConfig) -> Result<ExitCode> {
    let hasher = PasswordHasher::new(&config.auth.password)?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);

    match hasher.hash(password) {
        Ok(hash) => {
            println!("{}", hash);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_client_error() => {
            report_rejection(&err);
            Ok(ExitCode::from(2))
        }
        Err(err) => Err(err.into()),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{}={level},upload_core={level}",
            env!("CARGO_CRATE_NAME").replace('-', "_"),
            level = logging.level
        )
        .into()
    });

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(logging.json);

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}
