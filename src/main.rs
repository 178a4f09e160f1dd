use anyhow::Result;
use chrono::Local;
use ott_rank_harvest::ranking_ops::kinolights::provider::KinolightsProvider;
use ott_rank_harvest::ranking_ops::wikipedia::WikipediaProvider;
use ott_rank_harvest::util::{env as env_util, logging};
use ott_rank_harvest::{run_daily, DailyOutcome, PipelineConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    logging::init_tracing("info")?;
    env_util::bootstrap_cli("ott-rank-harvest");

    let cfg = PipelineConfig::from_env();
    let ranking = KinolightsProvider::new(&cfg.ranking_base_url, cfg.ranking_page_delay, &cfg.http)?;
    let wiki = WikipediaProvider::new(&cfg.wiki_base_url, cfg.wiki_request_delay, &cfg.http)?;

    let today = Local::now().date_naive();
    match run_daily(&cfg, today, &ranking, &wiki).await? {
        DailyOutcome::AlreadyComplete => {
            info!(target = "main", "today's training data is already in place");
        }
        DailyOutcome::Completed(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
