use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ott_rank_harvest::cli::{registry_maint, registry_stats};
use ott_rank_harvest::ranking_ops::enrichment::SchedulerOptions;
use ott_rank_harvest::ranking_ops::registry::ContentRegistry;
use ott_rank_harvest::ranking_ops::wikipedia::WikipediaProvider;
use ott_rank_harvest::util::{env as env_util, logging};
use ott_rank_harvest::PipelineConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rk", version, about = "Content registry maintenance CLI")]
struct Cli {
    /// Registry file (defaults to $DATA_DIR/contents.csv)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Print registry coverage as JSON
    Stats {
        /// Number of enriched rows to include as a sample
        #[arg(long, default_value_t = registry_stats::DEFAULT_SAMPLE)]
        sample: usize,
    },
    /// Normalize stored cast/director names and rewrite the registry
    NormalizeNames,
    /// Run the enrichment batches alone over the current registry
    Enrich {
        /// Override ENRICH_BATCH_SIZE
        #[arg(long)]
        batch_size: Option<usize>,
        /// Override ENRICH_BATCH_DELAY_MS
        #[arg(long)]
        batch_delay_ms: Option<u64>,
        /// Number of enriched rows to include in the closing stats
        #[arg(long, default_value_t = registry_stats::DEFAULT_SAMPLE)]
        sample: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    logging::init_tracing("info")?;
    env_util::bootstrap_cli("rk");

    let cli = Cli::parse();
    let cfg = PipelineConfig::from_env();
    let path = cli.registry.unwrap_or_else(|| cfg.contents_path());
    let mut registry = ContentRegistry::open(&path)?;

    match cli.command {
        Commands::Stats { sample } => registry_stats::run(&registry, sample)?,
        Commands::NormalizeNames => {
            let changed = registry_maint::normalize_names(&mut registry)?;
            println!("{}", serde_json::json!({ "changed": changed }));
        }
        Commands::Enrich {
            batch_size,
            batch_delay_ms,
            sample,
        } => {
            let options = SchedulerOptions {
                batch_size: batch_size.unwrap_or(cfg.scheduler.batch_size),
                batch_delay: batch_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(cfg.scheduler.batch_delay),
            };
            let wiki = WikipediaProvider::new(&cfg.wiki_base_url, cfg.wiki_request_delay, &cfg.http)?;
            let report = registry_maint::enrich(&mut registry, &wiki, options, sample).await?;
            info!(target = "rk", resolved = report.resolved, "enrich done");
        }
    }
    Ok(())
}
