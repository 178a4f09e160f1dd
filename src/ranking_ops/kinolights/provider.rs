use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use super::parse::parse_ranking_cards;
use super::RankingSource;
use crate::config::HttpOptions;
use crate::normalization::platform::Platform;
use crate::ranking_ops::model::{AgeGroup, Cohort, Gender, RankingEntry};

/// Kinolights ranking pages wrapper.
/// One GET per platform; a page that fails is logged and skipped.
pub struct KinolightsProvider {
    client: Client,
    base_url: String,
    page_delay: Duration,
}

impl KinolightsProvider {
    pub fn new(base_url: impl Into<String>, page_delay: Duration, http: &HttpOptions) -> Result<Self> {
        Ok(Self {
            client: http.client()?,
            base_url: base_url.into(),
            page_delay,
        })
    }

    /// `<base>/<platform slug>?ageGroup=<AGE>&gender=<G>`; the `All` sentinels
    /// drop their query parameter.
    pub fn page_url(&self, platform: Platform, cohort: Cohort) -> Result<Url> {
        let raw = format!("{}/{}", self.base_url.trim_end_matches('/'), platform.url_slug());
        let mut url = Url::parse(&raw).with_context(|| format!("invalid ranking url {raw}"))?;
        {
            let mut q = url.query_pairs_mut();
            if cohort.age_group != AgeGroup::All {
                q.append_pair("ageGroup", cohort.age_group.code());
            }
            if cohort.gender != Gender::All {
                q.append_pair("gender", cohort.gender.code());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    async fn fetch_page(&self, url: &Url) -> Result<String> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        resp.text().await.context("reading ranking page body")
    }
}

#[async_trait]
impl RankingSource for KinolightsProvider {
    async fn fetch_cohort(&self, cohort: Cohort) -> Result<Vec<RankingEntry>> {
        let mut out = Vec::new();

        for (idx, platform) in Platform::ALL.iter().copied().enumerate() {
            if idx > 0 && !self.page_delay.is_zero() {
                sleep(self.page_delay).await;
            }
            let url = self.page_url(platform, cohort)?;
            debug!(target = "kinolights", url = %url, "fetching ranking page");

            match self.fetch_page(&url).await {
                Ok(html) => {
                    let rows = parse_ranking_cards(&html, platform, cohort);
                    if rows.is_empty() {
                        warn!(
                            target = "kinolights",
                            platform = %platform,
                            cohort = %cohort,
                            "no ranking cards on page"
                        );
                    }
                    info!(
                        target = "kinolights",
                        platform = %platform,
                        cohort = %cohort,
                        count = rows.len(),
                        "platform ranking collected"
                    );
                    out.extend(rows);
                }
                Err(err) => warn!(
                    target = "kinolights",
                    platform = %platform,
                    cohort = %cohort,
                    error = %err,
                    "ranking page failed; skipping platform"
                ),
            }
        }
        Ok(out)
    }
}
