//! # HMO-KB — Benefits Knowledge Base CLI
//!
//! Builds the dual-language vector index over the HMO benefits documents
//! and runs broad / strictly filtered searches against it.
//!
//! Usage:
//!   hmokb build                                     # Rebuild both variants
//!   hmokb search "dental checkup" --org maccabi --tier gold
//!   hmokb status                                    # Built variants and counts
//!   hmokb init-config                               # Write default config

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hmokb_core::config::HmoKbConfig;
use hmokb_core::error::HmoKbError;
use hmokb_core::traits::Translator;
use hmokb_core::types::Variant;
use hmokb_knowledge::{AttributeFilter, KnowledgeBase};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "hmokb",
    version,
    about = "🏥 HMO-KB — benefits knowledge base indexing and retrieval"
)]
struct Cli {
    /// Config file (default: ~/.hmokb/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the original and translated indexes
    Build,
    /// Broad and organization/tier-filtered search
    Search {
        query: String,
        /// Organization (e.g. maccabi, מכבי)
        #[arg(long, default_value = "")]
        org: String,
        /// Membership tier (e.g. gold, זהב)
        #[arg(long, default_value = "")]
        tier: String,
        #[arg(long)]
        k_broad: Option<usize>,
        #[arg(long)]
        k_filtered: Option<usize>,
        /// Index variant: original | translated
        #[arg(long, conflicts_with = "lang")]
        variant: Option<Variant>,
        /// Query language: he | en
        #[arg(long)]
        lang: Option<String>,
        /// Print context snippets instead of JSON
        #[arg(long)]
        snippets: bool,
    },
    /// Show which variants are built
    Status,
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        "hmokb=debug,hmokb_knowledge=debug,hmokb_providers=debug"
    } else {
        "hmokb=info,hmokb_knowledge=info,hmokb_providers=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .as_deref()
        .map(|p| PathBuf::from(shellexpand::tilde(p).to_string()))
        .unwrap_or_else(HmoKbConfig::default_path)
}

fn load_config(cli: &Cli) -> Result<HmoKbConfig> {
    if cli.config.is_none() {
        return Ok(HmoKbConfig::load()?);
    }
    let path = config_path(cli);
    if !path.exists() {
        anyhow::bail!("config file {} not found", path.display());
    }
    Ok(HmoKbConfig::load_from(&path)?)
}

fn hint_retry(err: &HmoKbError) {
    if err.is_transient() {
        tracing::warn!("⚠️  {err}; safe to retry shortly");
    }
}

fn knowledge_base(config: &HmoKbConfig, with_translator: bool) -> Result<KnowledgeBase> {
    let embedder = hmokb_providers::create_embedder(&config.embedding)
        .context("embedding provider")?;
    let translator: Option<Arc<dyn Translator>> = if with_translator {
        hmokb_providers::create_translator(&config.translation)
            .context("translation provider")?
            .map(Arc::from)
    } else {
        None
    };
    Ok(KnowledgeBase::new(
        &config.index,
        Arc::from(embedder),
        translator,
    )?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    match &cli.command {
        Command::InitConfig { force } => {
            let path = config_path(&cli);
            if path.exists() && !force {
                println!("⚠️  Config already exists at {} (use --force to overwrite)", path.display());
                return Ok(());
            }
            HmoKbConfig::default().save_to(&path)?;
            println!("✅ Wrote default config to {}", path.display());
        }
        Command::Build => {
            let config = load_config(&cli)?;
            let kb = knowledge_base(&config, true)?;
            let summary = kb.build().await.inspect_err(hint_retry)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Status => {
            let config = load_config(&cli)?;
            let kb = knowledge_base(&config, false)?;
            println!("{}", serde_json::to_string_pretty(&kb.status())?);
        }
        Command::Search {
            query,
            org,
            tier,
            k_broad,
            k_filtered,
            variant,
            lang,
            snippets,
        } => {
            let config = load_config(&cli)?;
            let variant = match (variant, lang) {
                (Some(variant), _) => *variant,
                (None, Some(lang)) => Variant::from_lang(lang)?,
                (None, None) => Variant::from_lang(&config.search.default_language)?,
            };
            let filter = AttributeFilter::new(org, tier);
            let kb = knowledge_base(&config, false)?;
            let results = kb
                .search_dual(
                    query,
                    &filter,
                    k_broad.unwrap_or(config.search.k_broad),
                    k_filtered.unwrap_or(config.search.k_filtered),
                    variant,
                )
                .await
                .inspect_err(hint_retry)?;

            if *snippets {
                for snippet in results.snippets() {
                    println!("{snippet}\n");
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&results)?);
            }
            if results.filtered.is_empty() && !filter.is_empty() {
                tracing::info!(
                    "No {variant} entries match ({}, {})",
                    filter.organization(),
                    filter.tier()
                );
            }
        }
    }
    Ok(())
}
