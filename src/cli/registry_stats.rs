use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::ranking_ops::enrichment::TRIGGER_FIELD;
use crate::ranking_ops::model::EnrichmentField;
use crate::ranking_ops::registry::ContentRegistry;

pub const DEFAULT_SAMPLE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    pub title: String,
    pub year: String,
    pub genre_detail: Option<String>,
    pub director: Option<String>,
    pub country: Option<String>,
}

/// Registry coverage overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub with_genre_detail: usize,
    pub without_genre_detail: usize,
    /// Percentage, one decimal.
    pub success_rate: f64,
    pub filled_by_field: IndexMap<&'static str, usize>,
    pub sample: Vec<SampleRow>,
}

pub fn collect(registry: &ContentRegistry, sample: usize) -> RegistryStats {
    let total = registry.len();
    let filled_by_field: IndexMap<&'static str, usize> = EnrichmentField::ALL
        .iter()
        .map(|f| {
            let filled = registry
                .records()
                .filter(|r| r.enrichment.get(*f).is_some())
                .count();
            (f.column(), filled)
        })
        .collect();
    let with_genre_detail = filled_by_field
        .get(TRIGGER_FIELD.column())
        .copied()
        .unwrap_or(0);

    let success_rate = if registry.is_empty() {
        0.0
    } else {
        (with_genre_detail as f64 / total as f64 * 1000.0).round() / 10.0
    };

    let sample = registry
        .records()
        .filter(|r| r.enrichment.get(TRIGGER_FIELD).is_some())
        .take(sample)
        .map(|r| SampleRow {
            title: r.key.title.clone(),
            year: r.key.year.clone(),
            genre_detail: r.enrichment.genre_detail.clone(),
            director: r.enrichment.director.clone(),
            country: r.enrichment.country.clone(),
        })
        .collect();

    RegistryStats {
        total,
        with_genre_detail,
        without_genre_detail: total - with_genre_detail,
        success_rate,
        filled_by_field,
        sample,
    }
}

pub fn run(registry: &ContentRegistry, sample: usize) -> Result<()> {
    let stats = collect(registry, sample);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    info!(
        target = "registry_stats",
        path = %registry.path().display(),
        total = stats.total,
        "registry stats done"
    );
    Ok(())
}
