//! Per-cohort ranking charts from the Kinolights ranking pages.
pub mod parse;
pub mod provider;

use anyhow::Result;
use async_trait::async_trait;

use super::model::{Cohort, RankingEntry};

/// Source of raw ranking rows for one cohort, across every platform.
#[async_trait]
pub trait RankingSource: Send + Sync {
    async fn fetch_cohort(&self, cohort: Cohort) -> Result<Vec<RankingEntry>>;
}
