//! Batch scheduler that fills registry rows still missing `genre_detail`.
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::model::{ContentKey, Enrichment, EnrichmentField};
use super::registry::ContentRegistry;

/// Field whose absence makes a registry row eligible for enrichment.
pub const TRIGGER_FIELD: EnrichmentField = EnrichmentField::GenreDetail;

pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(15);

/// Secondary reference lookup keyed by title and year.
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    async fn lookup(&self, key: &ContentKey) -> Result<Enrichment>;
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub batch_size: usize,
    /// Idle time between batches; nothing follows the last batch.
    pub batch_delay: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    /// Rows missing the trigger field when the run started.
    pub eligible: usize,
    pub batches: usize,
    pub attempted: usize,
    /// Rows that gained the trigger field.
    pub resolved: usize,
    pub fields_filled: usize,
    pub failures: usize,
}

pub struct EnrichmentScheduler<'a, S: EnrichmentSource + ?Sized> {
    source: &'a S,
    options: SchedulerOptions,
}

impl<'a, S: EnrichmentSource + ?Sized> EnrichmentScheduler<'a, S> {
    pub fn new(source: &'a S, options: SchedulerOptions) -> Self {
        let options = SchedulerOptions {
            batch_size: options.batch_size.max(1),
            ..options
        };
        Self { source, options }
    }

    /// Enrich every row that lacks the trigger field right now, one row at a
    /// time, rewriting the registry after each batch. Lookup failures leave the
    /// row untouched so the next run retries it; a failed checkpoint aborts.
    #[instrument(skip_all, fields(batch_size = self.options.batch_size))]
    pub async fn run(&self, registry: &mut ContentRegistry) -> Result<EnrichmentReport> {
        let pending: Vec<ContentKey> = registry
            .rows_missing(TRIGGER_FIELD)
            .into_iter()
            .map(|r| r.key.clone())
            .collect();

        let mut report = EnrichmentReport {
            eligible: pending.len(),
            ..EnrichmentReport::default()
        };
        if pending.is_empty() {
            info!(target = "enrichment", "no rows missing genre_detail; nothing to collect");
            return Ok(report);
        }

        let total_batches = pending.len().div_ceil(self.options.batch_size);
        info!(
            target = "enrichment",
            eligible = pending.len(),
            batches = total_batches,
            "starting enrichment"
        );

        for (batch_idx, batch) in pending.chunks(self.options.batch_size).enumerate() {
            let first = batch_idx * self.options.batch_size + 1;
            let span = format!("{}~{}/{}", first, first + batch.len() - 1, pending.len());
            info!(
                target = "enrichment",
                batch = batch_idx + 1,
                of = total_batches,
                rows = %span,
                "processing batch"
            );

            for key in batch {
                report.attempted += 1;
                let result = match self.source.lookup(key).await {
                    Ok(result) => result,
                    Err(err) => {
                        warn!(
                            target = "enrichment",
                            title = %key.title,
                            year = %key.year,
                            error = %err,
                            "lookup failed; row stays eligible for the next run"
                        );
                        report.failures += 1;
                        continue;
                    }
                };
                if result.is_empty() {
                    debug!(target = "enrichment", title = %key.title, year = %key.year, "no fields returned");
                    continue;
                }

                let filled = registry.patch_fields(key, &result).unwrap_or(0);
                report.fields_filled += filled;
                let resolved = registry
                    .get(key)
                    .and_then(|r| r.enrichment.get(TRIGGER_FIELD))
                    .is_some();
                if resolved {
                    report.resolved += 1;
                }
                debug!(
                    target = "enrichment",
                    title = %key.title,
                    year = %key.year,
                    filled,
                    resolved,
                    "row patched"
                );
            }

            registry
                .flush()
                .with_context(|| format!("checkpoint after enrichment batch {}", batch_idx + 1))?;
            report.batches += 1;
            info!(
                target = "enrichment",
                batch = batch_idx + 1,
                resolved = report.resolved,
                failures = report.failures,
                "batch checkpointed"
            );

            if batch_idx + 1 < total_batches && !self.options.batch_delay.is_zero() {
                debug!(
                    target = "enrichment",
                    delay_ms = self.options.batch_delay.as_millis() as u64,
                    "idling before next batch"
                );
                tokio::time::sleep(self.options.batch_delay).await;
            }
        }

        info!(
            target = "enrichment",
            attempted = report.attempted,
            resolved = report.resolved,
            fields_filled = report.fields_filled,
            failures = report.failures,
            "enrichment finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking_ops::registry::NewTitle;
    use anyhow::anyhow;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Returns a genre for every title except those listed as failing or empty.
    struct FakeSource {
        failing: HashSet<String>,
        empty: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(failing: &[&str], empty: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                empty: empty.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EnrichmentSource for FakeSource {
        async fn lookup(&self, key: &ContentKey) -> Result<Enrichment> {
            self.calls.lock().unwrap().push(key.title.clone());
            if self.failing.contains(&key.title) {
                return Err(anyhow!("no matching page for {}", key.title));
            }
            if self.empty.contains(&key.title) {
                return Ok(Enrichment::default());
            }
            Ok(Enrichment::default()
                .with(EnrichmentField::GenreDetail, format!("{} 장르", key.title))
                .with(EnrichmentField::Country, "대한민국"))
        }
    }

    fn no_delay(batch_size: usize) -> SchedulerOptions {
        SchedulerOptions {
            batch_size,
            batch_delay: Duration::ZERO,
        }
    }

    fn seeded(dir: &tempfile::TempDir, n: usize) -> ContentRegistry {
        let mut reg = ContentRegistry::open(dir.path().join("contents.csv")).unwrap();
        reg.upsert_new((1..=n).map(|i| NewTitle {
            key: ContentKey::new(format!("t{i:02}"), "2024"),
            genre: "드라마".to_string(),
        }));
        reg
    }

    #[tokio::test]
    async fn failed_row_stays_missing_and_others_fill() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = seeded(&dir, 20);
        let source = FakeSource::new(&["t10"], &[]);

        let report = EnrichmentScheduler::new(&source, no_delay(20))
            .run(&mut reg)
            .await
            .unwrap();

        assert_eq!(report.eligible, 20);
        assert_eq!(report.batches, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(report.resolved, 19);
        assert_eq!(report.fields_filled, 38);
        let missing: Vec<_> = reg
            .rows_missing(TRIGGER_FIELD)
            .iter()
            .map(|r| r.key.title.clone())
            .collect();
        assert_eq!(missing, vec!["t10".to_string()]);

        // the checkpoint made it to disk
        let reopened = ContentRegistry::open(reg.path()).unwrap();
        assert_eq!(reopened.rows_missing(TRIGGER_FIELD).len(), 1);

        // next invocation retries exactly the failed row
        let healed = FakeSource::new(&[], &[]);
        let report = EnrichmentScheduler::new(&healed, no_delay(20))
            .run(&mut reg)
            .await
            .unwrap();
        assert_eq!(healed.calls(), vec!["t10".to_string()]);
        assert_eq!(report.resolved, 1);
        assert!(reg.rows_missing(TRIGGER_FIELD).is_empty());
    }

    #[tokio::test]
    async fn batches_preserve_registry_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = seeded(&dir, 5);
        let source = FakeSource::new(&[], &["t02"]);

        let report = EnrichmentScheduler::new(&source, no_delay(2))
            .run(&mut reg)
            .await
            .unwrap();

        assert_eq!(report.batches, 3);
        assert_eq!(source.calls(), vec!["t01", "t02", "t03", "t04", "t05"]);
        assert_eq!(report.resolved, 4);
        assert_eq!(report.failures, 0);
    }

    #[tokio::test]
    async fn rows_with_trigger_field_are_not_queried() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = seeded(&dir, 3);
        reg.patch_fields(
            &ContentKey::new("t02", "2024"),
            &Enrichment::default().with(EnrichmentField::GenreDetail, "기존"),
        );
        let source = FakeSource::new(&[], &[]);

        EnrichmentScheduler::new(&source, no_delay(20))
            .run(&mut reg)
            .await
            .unwrap();

        assert_eq!(source.calls(), vec!["t01", "t03"]);
        let kept = reg.get(&ContentKey::new("t02", "2024")).unwrap();
        assert_eq!(kept.enrichment.genre_detail.as_deref(), Some("기존"));
    }

    /// Reads the on-disk registry each time it is called.
    struct DiskObserver {
        path: std::path::PathBuf,
        filled_on_disk: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EnrichmentSource for DiskObserver {
        async fn lookup(&self, key: &ContentKey) -> Result<Enrichment> {
            let filled = if self.path.is_file() {
                ContentRegistry::open(&self.path)?
                    .records()
                    .filter(|r| r.enrichment.genre_detail.is_some())
                    .count()
            } else {
                0
            };
            self.filled_on_disk.lock().unwrap().push(filled);
            Ok(Enrichment::default().with(EnrichmentField::GenreDetail, key.title.clone()))
        }
    }

    #[tokio::test]
    async fn each_batch_is_checkpointed_before_the_next() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = seeded(&dir, 6);
        let source = DiskObserver {
            path: reg.path().to_path_buf(),
            filled_on_disk: Mutex::new(Vec::new()),
        };

        EnrichmentScheduler::new(&source, no_delay(2))
            .run(&mut reg)
            .await
            .unwrap();

        let seen = source.filled_on_disk.lock().unwrap().clone();
        assert_eq!(seen, vec![0, 0, 2, 2, 4, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn idles_between_batches_but_not_after_the_last() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = seeded(&dir, 5);
        let source = FakeSource::new(&[], &[]);
        let options = SchedulerOptions {
            batch_size: 2,
            batch_delay: Duration::from_secs(15),
        };

        let started = tokio::time::Instant::now();
        let report = EnrichmentScheduler::new(&source, options)
            .run(&mut reg)
            .await
            .unwrap();

        assert_eq!(report.batches, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn empty_registry_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = seeded(&dir, 0);
        let source = FakeSource::new(&[], &[]);
        let report = EnrichmentScheduler::new(&source, SchedulerOptions::default())
            .run(&mut reg)
            .await
            .unwrap();
        assert_eq!(report, EnrichmentReport::default());
        assert!(!reg.path().exists());
    }
}
