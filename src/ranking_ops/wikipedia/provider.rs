use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::infobox::{is_missing_article, parse_infobox};
use crate::config::HttpOptions;
use crate::ranking_ops::enrichment::{EnrichmentSource, TRIGGER_FIELD};
use crate::ranking_ops::model::{ContentKey, Enrichment};

/// Korean Wikipedia lookup. Candidates are tried in order, their infobox
/// values layered over each other, until one yields `genre_detail`.
pub struct WikipediaProvider {
    client: Client,
    base_url: String,
    request_delay: Duration,
}

impl WikipediaProvider {
    pub fn new(base_url: impl Into<String>, request_delay: Duration, http: &HttpOptions) -> Result<Self> {
        Ok(Self {
            client: http.client()?,
            base_url: base_url.into(),
            request_delay,
        })
    }

    /// Article URLs to try for a title, most specific disambiguations last.
    pub fn candidate_urls(&self, key: &ContentKey) -> Vec<String> {
        let base = self.base_url.trim_end_matches('/');
        candidate_names(key)
            .iter()
            .map(|name| format!("{base}/{}", urlencoding::encode(name)))
            .collect()
    }

    /// `Ok(None)` for any non-200 answer.
    async fn fetch_article(&self, url: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        if resp.status() != StatusCode::OK {
            debug!(target = "wikipedia", url, status = %resp.status(), "article not served");
            return Ok(None);
        }
        let body = resp.text().await.context("reading article body")?;
        Ok(Some(body))
    }
}

fn candidate_names(key: &ContentKey) -> Vec<String> {
    let (title, year) = (&key.title, &key.year);
    vec![
        title.clone(),
        format!("{title}_({year}년_영화)"),
        format!("{title}_({year}년_드라마)"),
        format!("{title}_({year})"),
        format!("{title} ({year})"),
    ]
}

#[async_trait]
impl EnrichmentSource for WikipediaProvider {
    async fn lookup(&self, key: &ContentKey) -> Result<Enrichment> {
        let mut info = Enrichment::default();

        for url in self.candidate_urls(key) {
            let html = match self.fetch_article(&url).await {
                Ok(Some(html)) => html,
                Ok(None) => continue,
                Err(err) => {
                    warn!(target = "wikipedia", url = %url, error = %err, "candidate failed");
                    continue;
                }
            };
            if is_missing_article(&html) {
                debug!(target = "wikipedia", url = %url, "no article under this name");
                continue;
            }
            let Some(found) = parse_infobox(&html) else {
                debug!(target = "wikipedia", url = %url, "article has no infobox");
                continue;
            };
            debug!(
                target = "wikipedia",
                url = %url,
                fields = found.filled_count(),
                "infobox parsed"
            );
            info.overlay(&found);
            if info.get(TRIGGER_FIELD).is_some() {
                break;
            }
        }

        if info.get(TRIGGER_FIELD).is_some() {
            info!(
                target = "wikipedia",
                title = %key.title,
                year = %key.year,
                genre_detail = info.genre_detail.as_deref().unwrap_or_default(),
                "genre found"
            );
        }

        if !self.request_delay.is_zero() {
            sleep(self.request_delay).await;
        }
        Ok(info)
    }
}
