//! One daily run: scrape every cohort, consolidate, register new titles,
//! enrich what is still missing, and write the per-gender training files.
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::ranking_ops::dedup::consolidate;
use crate::ranking_ops::enrichment::{EnrichmentReport, EnrichmentScheduler, EnrichmentSource};
use crate::ranking_ops::join::{join_snapshot, write_train};
use crate::ranking_ops::kinolights::RankingSource;
use crate::ranking_ops::layout::DailyLayout;
use crate::ranking_ops::model::{Cohort, ConsolidatedEntry, Gender, RankingEntry};
use crate::ranking_ops::registry::{ContentRegistry, NewTitle};
use crate::ranking_ops::snapshot::{read_snapshot, write_snapshot};

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub stamp: String,
    pub reused_snapshots: bool,
    pub female_rows: usize,
    pub male_rows: usize,
    pub new_titles: usize,
    pub enrichment: EnrichmentReport,
    pub train_files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum DailyOutcome {
    /// Every training file the day's snapshots call for was already on disk.
    AlreadyComplete,
    Completed(DailySummary),
}

/// Entries for one gender, in cohort scrape order.
type GenderSnapshot = (Gender, Vec<ConsolidatedEntry>);

#[instrument(skip_all, fields(day = %today))]
pub async fn run_daily(
    cfg: &PipelineConfig,
    today: NaiveDate,
    ranking: &dyn RankingSource,
    enricher: &dyn EnrichmentSource,
) -> Result<DailyOutcome> {
    let layout = DailyLayout::new(&cfg.data_dir, today);
    info!(
        target = "pipeline",
        data_dir = %layout.data_dir().display(),
        stamp = layout.stamp(),
        "daily run starting"
    );
    if layout.train_outputs_exist() {
        info!(
            target = "pipeline",
            stamp = layout.stamp(),
            "training outputs for today already exist; nothing to do"
        );
        return Ok(DailyOutcome::AlreadyComplete);
    }

    let reused_snapshots = layout.snapshots_exist();
    let snapshots = if reused_snapshots {
        let snapshots = load_snapshots(&layout)?;
        // an empty gender never gets a training file
        let done = snapshots
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .all(|(gender, _)| layout.train(*gender).is_file());
        if done {
            info!(
                target = "pipeline",
                stamp = layout.stamp(),
                "training outputs exist for every non-empty snapshot; nothing to do"
            );
            return Ok(DailyOutcome::AlreadyComplete);
        }
        info!(target = "pipeline", stamp = layout.stamp(), "reusing today's snapshots");
        snapshots
    } else {
        let snapshots = scrape_snapshots(ranking).await;
        if snapshots.iter().all(|(_, entries)| entries.is_empty()) {
            bail!("no ranking rows collected for any cohort; aborting without writing outputs");
        }
        for (gender, entries) in &snapshots {
            if entries.is_empty() {
                warn!(
                    target = "pipeline",
                    gender = gender.code(),
                    "no ranking rows for this gender; writing a header-only snapshot and no training file"
                );
            }
            write_snapshot(&layout.snapshot(*gender), entries)?;
        }
        snapshots
    };
    if snapshots.iter().all(|(_, entries)| entries.is_empty()) {
        bail!("today's snapshots are empty; nothing to join");
    }

    let mut registry = ContentRegistry::open(layout.contents())?;
    let new_titles = registry.upsert_new(
        snapshots
            .iter()
            .flat_map(|(_, entries)| entries.iter().map(NewTitle::from)),
    );
    registry
        .flush()
        .context("saving registry after new titles")?;
    info!(
        target = "pipeline",
        new_titles,
        total = registry.len(),
        "registry updated"
    );

    let enrichment = EnrichmentScheduler::new(enricher, cfg.scheduler)
        .run(&mut registry)
        .await?;

    let mut train_files = Vec::new();
    for (gender, entries) in &snapshots {
        if entries.is_empty() {
            continue;
        }
        let path = layout.train(*gender);
        write_train(&path, &join_snapshot(entries, &registry))?;
        train_files.push(path);
    }

    let count = |g: Gender| {
        snapshots
            .iter()
            .find(|(gender, _)| *gender == g)
            .map_or(0, |(_, entries)| entries.len())
    };
    let summary = DailySummary {
        stamp: layout.stamp().to_string(),
        reused_snapshots,
        female_rows: count(Gender::Female),
        male_rows: count(Gender::Male),
        new_titles,
        enrichment,
        train_files,
    };
    info!(
        target = "pipeline",
        female_rows = summary.female_rows,
        male_rows = summary.male_rows,
        new_titles = summary.new_titles,
        resolved = summary.enrichment.resolved,
        "daily run complete"
    );
    Ok(DailyOutcome::Completed(summary))
}

fn load_snapshots(layout: &DailyLayout) -> Result<Vec<GenderSnapshot>> {
    Gender::COHORTS
        .iter()
        .map(|g| Ok((*g, read_snapshot(&layout.snapshot(*g))?)))
        .collect()
}

/// Fetch every cohort, consolidate, and split by gender. A failing cohort is
/// logged and contributes nothing.
async fn scrape_snapshots(ranking: &dyn RankingSource) -> Vec<GenderSnapshot> {
    let mut raw: Vec<RankingEntry> = Vec::new();
    for cohort in Cohort::all() {
        match ranking.fetch_cohort(cohort).await {
            Ok(rows) => {
                info!(target = "pipeline", cohort = %cohort, rows = rows.len(), "cohort collected");
                raw.extend(rows);
            }
            Err(err) => warn!(
                target = "pipeline",
                cohort = %cohort,
                error = %err,
                "cohort fetch failed; skipping"
            ),
        }
    }

    let consolidated = consolidate(raw);
    Gender::COHORTS
        .iter()
        .map(|g| {
            let entries = consolidated
                .iter()
                .filter(|e| e.gender == *g)
                .cloned()
                .collect();
            (*g, entries)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::platform::Platform;
    use crate::ranking_ops::enrichment::SchedulerOptions;
    use crate::ranking_ops::model::{AgeGroup, ContentKey, Enrichment, EnrichmentField};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeRanking {
        genders: Vec<Gender>,
        calls: AtomicUsize,
    }

    impl FakeRanking {
        fn for_genders(genders: &[Gender]) -> Self {
            Self {
                genders: genders.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RankingSource for FakeRanking {
        async fn fetch_cohort(&self, cohort: Cohort) -> Result<Vec<RankingEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if cohort.age_group == AgeGroup::Fifty {
                return Err(anyhow!("upstream 503"));
            }
            if !self.genders.contains(&cohort.gender) {
                return Ok(Vec::new());
            }
            let row = |title: &str, platform| RankingEntry {
                rank: 1,
                title: title.to_string(),
                genre: "드라마".to_string(),
                year: "2024".to_string(),
                score: 91.5,
                platform,
                age_group: cohort.age_group,
                gender: cohort.gender,
            };
            Ok(vec![
                row("Foo", Platform::Netflix),
                row("Foo", Platform::Tving),
                row("Bar", Platform::Wavve),
            ])
        }
    }

    struct FakeWiki;

    #[async_trait]
    impl EnrichmentSource for FakeWiki {
        async fn lookup(&self, key: &ContentKey) -> Result<Enrichment> {
            if key.title == "Bar" {
                return Err(anyhow!("timeout"));
            }
            Ok(Enrichment::default().with(EnrichmentField::GenreDetail, "코미디"))
        }
    }

    fn config(dir: &tempfile::TempDir) -> PipelineConfig {
        PipelineConfig {
            data_dir: dir.path().join("data"),
            scheduler: SchedulerOptions {
                batch_size: 20,
                batch_delay: Duration::ZERO,
            },
            ..PipelineConfig::default()
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn full_run_writes_every_output_then_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir);
        let ranking = FakeRanking::for_genders(&[Gender::Female, Gender::Male]);

        let outcome = run_daily(&cfg, day(), &ranking, &FakeWiki).await.unwrap();
        let DailyOutcome::Completed(summary) = outcome else {
            panic!("expected a completed run");
        };
        assert!(!summary.reused_snapshots);
        // four age groups answer, two titles each after platform merge
        assert_eq!(summary.female_rows, 8);
        assert_eq!(summary.male_rows, 8);
        assert_eq!(summary.new_titles, 2);
        assert_eq!(summary.enrichment.resolved, 1);
        assert_eq!(summary.enrichment.failures, 1);
        assert_eq!(summary.train_files.len(), 2);

        let layout = DailyLayout::new(&cfg.data_dir, day());
        assert!(layout.snapshots_exist());
        assert!(layout.train_outputs_exist());
        let snapshot = read_snapshot(&layout.snapshot(Gender::Female)).unwrap();
        assert_eq!(snapshot[0].platform, "netflix, tving");

        let train = std::fs::read_to_string(layout.train(Gender::Male)).unwrap();
        assert!(train.lines().nth(1).unwrap().ends_with(",코미디,,,,,,,,,,"));

        let calls_before = ranking.calls.load(Ordering::SeqCst);
        let again = run_daily(&cfg, day(), &ranking, &FakeWiki).await.unwrap();
        assert!(matches!(again, DailyOutcome::AlreadyComplete));
        assert_eq!(ranking.calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test]
    async fn nothing_scraped_aborts_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir);
        let ranking = FakeRanking::for_genders(&[]);

        let err = run_daily(&cfg, day(), &ranking, &FakeWiki).await.unwrap_err();
        assert!(err.to_string().contains("no ranking rows"));
        assert!(!cfg.data_dir.exists());
    }

    #[tokio::test]
    async fn one_empty_gender_still_produces_the_other() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir);
        let ranking = FakeRanking::for_genders(&[Gender::Male]);

        let outcome = run_daily(&cfg, day(), &ranking, &FakeWiki).await.unwrap();
        let DailyOutcome::Completed(summary) = outcome else {
            panic!("expected a completed run");
        };
        let layout = DailyLayout::new(&cfg.data_dir, day());
        assert_eq!(summary.female_rows, 0);
        assert_eq!(summary.train_files, vec![layout.train(Gender::Male)]);
        assert!(read_snapshot(&layout.snapshot(Gender::Female)).unwrap().is_empty());
        assert!(!layout.train(Gender::Female).exists());

        // a later run the same day neither scrapes nor rewrites anything
        let male_train = std::fs::read_to_string(layout.train(Gender::Male)).unwrap();
        let calls_before = ranking.calls.load(Ordering::SeqCst);
        let again = run_daily(&cfg, day(), &ranking, &FakeWiki).await.unwrap();
        assert!(matches!(again, DailyOutcome::AlreadyComplete));
        assert_eq!(ranking.calls.load(Ordering::SeqCst), calls_before);
        assert_eq!(std::fs::read_to_string(layout.train(Gender::Male)).unwrap(), male_train);
    }

    #[tokio::test]
    async fn existing_snapshots_skip_scraping() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir);
        let seed = FakeRanking::for_genders(&[Gender::Female, Gender::Male]);
        run_daily(&cfg, day(), &seed, &FakeWiki).await.unwrap();

        let layout = DailyLayout::new(&cfg.data_dir, day());
        std::fs::remove_file(layout.train(Gender::Female)).unwrap();

        let ranking = FakeRanking::for_genders(&[Gender::Female, Gender::Male]);
        let outcome = run_daily(&cfg, day(), &ranking, &FakeWiki).await.unwrap();
        let DailyOutcome::Completed(summary) = outcome else {
            panic!("expected a completed run");
        };
        assert!(summary.reused_snapshots);
        assert_eq!(summary.new_titles, 0);
        assert_eq!(ranking.calls.load(Ordering::SeqCst), 0);
        assert!(layout.train_outputs_exist());
    }
}
