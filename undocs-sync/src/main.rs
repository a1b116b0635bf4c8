//! undocs - UN document discovery and lineage CLI
//!
//! - `undocs discover`: probe every configured pattern for new documents
//! - `undocs link`: link resolutions in `documents.json` to their drafts
//! - `undocs build`: discover, then link

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};
use undocs_common::config::{load_toml_config, resolve_data_dir, TomlConfig};
use undocs_common::models::DOCUMENTS_FILE_NAME;
use undocs_common::DocumentCollection;

use undocs_sync::services::{HttpDocumentFetcher, HttpExistenceProbe, MetadataClient, UndlClient};
use undocs_sync::{
    load_patterns, DiscoverySync, LineageResolver, ResolverOptions, SyncOptions, SyncReport,
    SyncStateStore, PATTERNS_FILE_NAME,
};

/// Command-line arguments for undocs
#[derive(Parser, Debug)]
#[command(name = "undocs")]
#[command(about = "Discover new UN documents and link resolutions to their drafts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe configured symbol patterns and download new documents
    Discover {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        discover: DiscoverArgs,
    },
    /// Link resolutions to the proposals they were adopted from
    Link {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        link: LinkArgs,
    },
    /// Discover, then link
    Build {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        discover: DiscoverArgs,

        #[command(flatten)]
        link: LinkArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Directory holding undocs.toml and patterns.yaml
    #[arg(short, long, default_value = ".", env = "UNDOCS_CONFIG_DIR")]
    config: PathBuf,

    /// Data directory (overrides UNDOCS_DATA_DIR and undocs.toml)
    #[arg(short, long)]
    data: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DiscoverArgs {
    /// Consecutive missed sequence numbers that end a series
    #[arg(long)]
    max_misses: Option<u32>,
}

#[derive(Args, Debug)]
struct LinkArgs {
    /// Skip bibliographic metadata lookups
    #[arg(long)]
    no_metadata: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let common = match &cli.command {
        Command::Discover { common, .. }
        | Command::Link { common, .. }
        | Command::Build { common, .. } => common,
    };

    // RUST_LOG wins; otherwise the configured level replaces "info" once loaded
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting undocs v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = load_toml_config(&common.config).with_context(|| {
        format!("Failed to load configuration from {}", common.config.display())
    })?;

    if !from_env {
        filter_handle.reload(EnvFilter::new(&config.logging.level))?;
    }

    let data_dir = resolve_data_dir(common.data.as_deref(), &config);
    info!("Data directory: {}", data_dir.display());

    match &cli.command {
        Command::Discover { discover, .. } => {
            apply_discover_args(&mut config, discover)?;
            run_discover(&config, &common.config, &data_dir).await?;
        }
        Command::Link { link, .. } => {
            apply_link_args(&mut config, link);
            run_link(&config, &data_dir).await?;
        }
        Command::Build { discover, link, .. } => {
            apply_discover_args(&mut config, discover)?;
            apply_link_args(&mut config, link);
            run_discover(&config, &common.config, &data_dir).await?;
            run_link(&config, &data_dir).await?;
        }
    }

    Ok(())
}

fn apply_discover_args(config: &mut TomlConfig, args: &DiscoverArgs) -> Result<()> {
    if let Some(max_misses) = args.max_misses {
        config.discovery.max_consecutive_misses = max_misses;
        config.validate()?;
    }
    Ok(())
}

fn apply_link_args(config: &mut TomlConfig, args: &LinkArgs) {
    if args.no_metadata {
        config.lineage.use_metadata = false;
    }
}

async fn run_discover(config: &TomlConfig, config_dir: &Path, data_dir: &Path) -> Result<()> {
    // Patterns are validated before any network activity
    let patterns_path = config_dir.join(PATTERNS_FILE_NAME);
    let patterns = load_patterns(&patterns_path)
        .with_context(|| format!("Failed to load patterns from {}", patterns_path.display()))?;
    info!("Loaded {} patterns", patterns.len());

    let timeout = Duration::from_secs(config.discovery.request_timeout_secs);
    let probe = HttpExistenceProbe::new(&config.discovery.documents_url, timeout)?;
    let fetcher = HttpDocumentFetcher::new(&config.discovery.documents_url, timeout)?;

    let sync = DiscoverySync::new(
        Arc::new(probe),
        Arc::new(fetcher),
        data_dir,
        SyncOptions::from(&config.discovery),
    );
    let store = SyncStateStore::for_data_dir(data_dir);

    let report = sync
        .sync_all(&patterns, &store)
        .await
        .context("Discovery failed")?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &SyncReport) {
    for result in &report.results {
        if result.new_symbols.is_empty() {
            println!("{}: no new documents", result.pattern);
        } else {
            println!("{}: {} new documents", result.pattern, result.new_symbols.len());
            for symbol in &result.new_symbols {
                println!("  {}", symbol);
            }
        }
    }
    println!("Total: {} new documents", report.total_new());
}

async fn run_link(config: &TomlConfig, data_dir: &Path) -> Result<()> {
    let documents_path = data_dir.join(DOCUMENTS_FILE_NAME);
    let mut collection = DocumentCollection::load(&documents_path)
        .with_context(|| format!("Failed to load {}", documents_path.display()))?;
    collection.validate()?;

    if collection.documents.is_empty() {
        info!("No documents in {}, nothing to link", documents_path.display());
        return Ok(());
    }

    let metadata: Option<Arc<dyn MetadataClient>> = if config.lineage.use_metadata {
        let client = UndlClient::new(
            &config.lineage.metadata_url,
            Duration::from_secs(config.lineage.request_timeout_secs),
            config.lineage.rate_limit_ms,
        )?;
        Some(Arc::new(client))
    } else {
        info!("Metadata lookups disabled");
        None
    };

    let resolver = LineageResolver::new(metadata, ResolverOptions::from(&config.lineage));
    let stats = resolver.link_documents(&mut collection.documents).await;

    collection
        .save(&documents_path)
        .with_context(|| format!("Failed to write {}", documents_path.display()))?;

    println!(
        "Linked {} of {} resolutions ({} metadata, {} symbol reference, {} title), {} already linked, {} unlinked",
        stats.undl_metadata + stats.symbol_reference + stats.title_similarity,
        stats.resolutions,
        stats.undl_metadata,
        stats.symbol_reference,
        stats.title_similarity,
        stats.already_linked,
        stats.unlinked
    );
    Ok(())
}
