//! `td`: offline operator utilities for the price desk data directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use td_audit::{verify_hash_chain, VerifyResult};
use td_schemas::{AuditEntry, Category};
use td_store::{FileBlobStore, PriceStore};
use tracing::warn;

#[derive(Parser)]
#[command(name = "td")]
#[command(about = "tierdesk CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Audit ledger utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },

    /// Price document utilities
    Prices {
        #[command(subcommand)]
        cmd: PricesCmd,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of a JSON Lines ledger.
    Verify {
        #[arg(long)]
        path: PathBuf,
    },

    /// Print the last entries of a ledger, one JSON object per line.
    Tail {
        #[arg(long)]
        path: PathBuf,

        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,

        /// Only entries of this category (case-insensitive)
        #[arg(long)]
        category: Option<String>,

        /// Only entries of this record id
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Subcommand)]
enum PricesCmd {
    /// List persisted price records.
    List {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long, default_value = "prices.json")]
        key: String,

        /// Only records of this category
        #[arg(long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = td_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => match verify_hash_chain(&path)? {
                VerifyResult::Valid { lines } => {
                    println!("valid=true lines={}", lines);
                }
                VerifyResult::Broken { line, reason } => {
                    println!("valid=false line={} reason={}", line, reason);
                    std::process::exit(2);
                }
            },

            AuditCmd::Tail {
                path,
                count,
                category,
                id,
            } => {
                // Read-only: never migrates or quarantines the file.
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("read ledger {}", path.display()))?;
                let mut entries = Vec::new();
                for (i, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let e: AuditEntry = serde_json::from_str(line)
                        .with_context(|| format!("parse entry at line {}", i + 1))?;
                    let category_ok = category
                        .as_deref()
                        .map_or(true, |c| e.category.eq_ignore_ascii_case(c));
                    let id_ok = id.as_deref().map_or(true, |want| e.id == want);
                    if category_ok && id_ok {
                        entries.push(e);
                    }
                }
                let skip = entries.len().saturating_sub(count);
                for e in &entries[skip..] {
                    println!("{}", serde_json::to_string(e).context("serialize entry")?);
                }
            }
        },

        Commands::Prices { cmd } => match cmd {
            PricesCmd::List {
                data_dir,
                key,
                category,
            } => {
                let blob = FileBlobStore::open_existing(&data_dir)?;
                if !blob.root().join(&key).is_file() {
                    warn!(data_dir = %data_dir.display(), key = %key, "no price document; listing is empty");
                }
                let store = PriceStore::load(&blob, &key).await;
                let records = match category {
                    Some(raw) => store.by_category(&Category::parse(&raw)?),
                    None => store.all().to_vec(),
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&records).context("serialize records")?
                );
            }
        },
    }

    Ok(())
}
