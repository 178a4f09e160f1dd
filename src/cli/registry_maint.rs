//! Registry maintenance passes run outside the daily pipeline.
use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use super::registry_stats;
use crate::ranking_ops::enrichment::{EnrichmentReport, EnrichmentScheduler, EnrichmentSource, SchedulerOptions};
use crate::ranking_ops::registry::ContentRegistry;

/// Re-run the name normalizer over stored `cast`/`director` values and
/// rewrite the file. Returns the number of values that changed.
pub fn normalize_names(registry: &mut ContentRegistry) -> Result<usize> {
    let changed = registry.normalize_person_fields();
    registry
        .flush()
        .context("rewriting registry after name normalization")?;
    info!(
        target = "registry_maint",
        path = %registry.path().display(),
        changed,
        "person names normalized"
    );
    Ok(changed)
}

/// Enrichment alone over the current registry, then report and coverage as JSON.
pub async fn enrich(
    registry: &mut ContentRegistry,
    source: &dyn EnrichmentSource,
    options: SchedulerOptions,
    sample: usize,
) -> Result<EnrichmentReport> {
    let report = EnrichmentScheduler::new(source, options).run(registry).await?;
    let out = json!({
        "report": report,
        "stats": registry_stats::collect(registry, sample),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(report)
}
