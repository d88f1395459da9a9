//! docvault: encrypted document vault CLI
//!
//! Standalone envelope commands (no storage needed):
//!   keygen                               - print a fresh 256-bit key as hex
//!   encrypt <file> --key-out <path>      - encrypt a file into an envelope
//!   decrypt <envelope> --key-file <path> - decrypt an envelope
//!
//! Vault commands (use the configured envelope and key stores):
//!   upload <file>   list   tag <id>   get <id>   delete <id>
//!   status          config show

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use docvault_core::config::{expand_tilde, DocvaultConfig, LogFormat, StorageBackend};
use docvault_core::types::UploadRequest;
use docvault_crypto::{decrypt_envelope, encrypt_and_envelope, CryptoError, KeyGenerator};
use docvault_storage::{build_stores, check_vault, DocumentVault, S3Credentials, StorageError};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "docvault",
    version,
    about = "Encrypted document vault",
    long_about = "docvault: store documents as AES-256-GCM envelopes with per-document keys"
)]
struct Cli {
    /// Path to docvault.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "DOCVAULT_CONFIG",
        default_value = "~/.config/docvault/docvault.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [log] level
    #[arg(long, env = "DOCVAULT_LOG")]
    log: Option<String>,

    /// Log format; overrides [log] format
    #[arg(long, env = "DOCVAULT_LOG_FORMAT")]
    log_format: Option<LogFormatArg>,

    /// Owner that vault commands act on behalf of
    #[arg(long, env = "DOCVAULT_OWNER", default_value = "local", global = true)]
    owner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormatArg {
    Json,
    Text,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Text => LogFormat::Text,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a fresh random key as 64 hex characters
    Keygen,

    /// Encrypt a file into an `iv:ciphertext:tag` envelope
    Encrypt {
        /// File to encrypt
        file: PathBuf,
        /// Write the envelope here (default: stdout)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Write the hex key here
        #[arg(long)]
        key_out: PathBuf,
    },

    /// Decrypt an envelope file
    Decrypt {
        /// Envelope file
        envelope: PathBuf,
        /// File holding the hex key
        #[arg(long)]
        key_file: PathBuf,
        /// Write plaintext here (default: stdout)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Encrypt and store a document
    Upload {
        file: PathBuf,
        /// Title (default: file name)
        #[arg(long)]
        title: Option<String>,
        /// Content type (default: guessed from the extension)
        #[arg(long)]
        content_type: Option<String>,
        /// Tag to attach; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List the owner's documents, newest first
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace a document's tags
    Tag {
        id: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Decrypt a stored document
    Get {
        id: String,
        /// Write plaintext here (default: stdout)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Delete a document, its envelope and its key
    Delete { id: String },

    /// Check that both stores are reachable
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);

    let config = match DocvaultConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("docvault: {e}");
            std::process::exit(2);
        }
    };

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.map(LogFormat::from).unwrap_or(config.log.format);
    init_logging(&level, format);
    debug!(config = %config_path.display(), "docvault starting");

    if let Err(e) = run(cli, &config, &config_path).await {
        std::process::exit(report_error(&e));
    }
}

async fn run(cli: Cli, config: &DocvaultConfig, config_path: &Path) -> Result<()> {
    match cli.command {
        Commands::Keygen => cmd_keygen(),
        Commands::Encrypt { file, out, key_out } => {
            cmd_encrypt(&file, out.as_deref(), &key_out).await
        }
        Commands::Decrypt {
            envelope,
            key_file,
            out,
        } => cmd_decrypt(&envelope, &key_file, out.as_deref()).await,
        Commands::Upload {
            file,
            title,
            content_type,
            tags,
        } => {
            let vault = open_vault(config)?;
            cmd_upload(&vault, &cli.owner, &file, title, content_type, tags).await
        }
        Commands::List { json } => {
            let vault = open_vault(config)?;
            cmd_list(&vault, &cli.owner, json).await
        }
        Commands::Tag { id, tags } => {
            let vault = open_vault(config)?;
            let record = vault.update_tags(&cli.owner, &id, &tags).await?;
            println!("{}  [{}]", record.id, record.tags.join(", "));
            Ok(())
        }
        Commands::Get { id, out } => {
            let vault = open_vault(config)?;
            let blob = vault.open(&cli.owner, &id).await?;
            write_output(out.as_deref(), &blob.bytes).await?;
            if let Some(out) = out {
                eprintln!("{} ({}, {} bytes)", out.display(), blob.content_type, blob.bytes.len());
            }
            Ok(())
        }
        Commands::Delete { id } => {
            let vault = open_vault(config)?;
            vault.delete(&cli.owner, &id).await?;
            println!("deleted {id}");
            Ok(())
        }
        Commands::Status => cmd_status(config).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(config, config_path),
    }
}

/// Print an error for the user and pick an exit code.
///
/// Crypto failures are logged in full but shown only as the generic message.
fn report_error(e: &anyhow::Error) -> i32 {
    if let Some(storage) = e.downcast_ref::<StorageError>() {
        error!(error = %format!("{e:#}"), "command failed");
        eprintln!("docvault: {}", storage.user_message());
        return 1;
    }
    if let Some(crypto) = e.downcast_ref::<CryptoError>() {
        error!(error = %format!("{e:#}"), "command failed");
        eprintln!("docvault: {}", crypto.user_message());
        return 1;
    }
    eprintln!("docvault: {e:#}");
    1
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so plaintext written to stdout stays clean
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Storage from config + environment credentials ─────────────────────────────

/// S3 credentials from AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY, if both are set.
fn s3_credentials_from_env() -> Option<S3Credentials> {
    let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
        .or_else(|_| std::env::var("DOCVAULT_ACCESS_KEY_ID"))
        .ok()?;
    let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
        .or_else(|_| std::env::var("DOCVAULT_SECRET_ACCESS_KEY"))
        .ok()?;
    Some(S3Credentials {
        access_key_id,
        secret_access_key,
    })
}

fn open_vault(config: &DocvaultConfig) -> Result<DocumentVault> {
    let creds = s3_credentials_from_env();
    let (envelopes, keys) = build_stores(config, creds.as_ref())?;
    if config.storage.backend == StorageBackend::Memory {
        tracing::warn!("envelope store is in memory; documents are discarded on exit");
    }
    Ok(DocumentVault::from_operators(
        envelopes,
        keys,
        config.documents.clone(),
    ))
}

// ── `docvault keygen | encrypt | decrypt` ─────────────────────────────────────

fn cmd_keygen() -> Result<()> {
    let key = KeyGenerator::os().generate_key()?;
    println!("{}", key.to_hex());
    Ok(())
}

async fn cmd_encrypt(file: &Path, out: Option<&Path>, key_out: &Path) -> Result<()> {
    let plaintext = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let (envelope, key) = encrypt_and_envelope(&plaintext)?;

    tokio::fs::write(key_out, key.to_hex())
        .await
        .with_context(|| format!("writing key to {}", key_out.display()))?;
    write_output(out, envelope.as_bytes()).await?;

    debug!(
        file = %file.display(),
        plaintext_len = plaintext.len(),
        envelope_len = envelope.len(),
        "encrypted"
    );
    Ok(())
}

async fn cmd_decrypt(envelope: &Path, key_file: &Path, out: Option<&Path>) -> Result<()> {
    let envelope = tokio::fs::read_to_string(envelope)
        .await
        .with_context(|| format!("reading {}", envelope.display()))?;
    let key_hex = tokio::fs::read_to_string(key_file)
        .await
        .with_context(|| format!("reading {}", key_file.display()))?;

    let key = docvault_crypto::EncryptionKey::from_hex(&key_hex)?;
    // Envelope files written by editors often gain a trailing newline
    let plaintext = decrypt_envelope(envelope.trim_end(), key.as_bytes())?;
    write_output(out, &plaintext).await
}

async fn write_output(out: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match out {
        Some(path) => tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).context("writing to stdout")?;
            stdout.flush().context("flushing stdout")
        }
    }
}

// ── `docvault upload | list` ──────────────────────────────────────────────────

async fn cmd_upload(
    vault: &DocumentVault,
    owner: &str,
    file: &Path,
    title: Option<String>,
    content_type: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;

    let title = title.unwrap_or_else(|| {
        file.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let content_type = content_type.unwrap_or_else(|| guess_content_type(file).to_string());

    let record = vault
        .upload(UploadRequest {
            owner: owner.to_string(),
            title,
            content_type,
            tags,
            bytes,
        })
        .await?;

    println!("{}", record.id);
    Ok(())
}

async fn cmd_list(vault: &DocumentVault, owner: &str, json: bool) -> Result<()> {
    let records = vault.list(owner).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("serializing records")?
        );
        return Ok(());
    }

    if records.is_empty() {
        println!("no documents for {owner}");
        return Ok(());
    }
    for r in &records {
        println!(
            "{}  {:>10}  {:<24}  {}  [{}]",
            r.id,
            format_size(r.size),
            r.content_type,
            r.title,
            r.tags.join(", ")
        );
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    match bytes {
        b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
        b => format!("{b} B"),
    }
}

/// Content type from the file extension; unknown extensions are opaque bytes.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

// ── `docvault status` ─────────────────────────────────────────────────────────

async fn cmd_status(config: &DocvaultConfig) -> Result<()> {
    let creds = s3_credentials_from_env();
    let (envelopes, keys) = build_stores(config, creds.as_ref())?;
    let report = check_vault(&envelopes, &keys).await;

    println!("docvault v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  envelopes:  {:?} [{}]",
        config.storage.backend,
        report.envelopes.as_deref().unwrap_or("ok")
    );
    println!(
        "  keys:       {:?} [{}]",
        config.keys.backend,
        report.keys.as_deref().unwrap_or("ok")
    );

    if !report.is_healthy() {
        anyhow::bail!("one or more stores are unreachable");
    }
    Ok(())
}

// ── `docvault config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &DocvaultConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            config_path.display()
        );
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
