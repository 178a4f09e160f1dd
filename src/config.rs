//! Runtime configuration read from the environment (after `.env`).
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::ranking_ops::enrichment::{SchedulerOptions, DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE};
use crate::util::env::{env_duration_ms, env_opt, env_parse};

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_RANKING_BASE_URL: &str = "https://www.kinolights.com/ranking";
pub const DEFAULT_WIKI_BASE_URL: &str = "https://ko.wikipedia.org/wiki";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpOptions {
    pub fn client(&self) -> Result<Client> {
        Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .build()
            .context("building http client")
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub scheduler: SchedulerOptions,
    pub ranking_base_url: String,
    pub ranking_page_delay: Duration,
    pub wiki_base_url: String,
    pub wiki_request_delay: Duration,
    pub http: HttpOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            scheduler: SchedulerOptions::default(),
            ranking_base_url: DEFAULT_RANKING_BASE_URL.to_string(),
            ranking_page_delay: Duration::from_millis(3000),
            wiki_base_url: DEFAULT_WIKI_BASE_URL.to_string(),
            wiki_request_delay: Duration::from_millis(1500),
            http: HttpOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: env_opt("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            scheduler: SchedulerOptions {
                batch_size: env_parse("ENRICH_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1),
                batch_delay: env_duration_ms("ENRICH_BATCH_DELAY_MS", DEFAULT_BATCH_DELAY),
            },
            ranking_base_url: env_opt("RANKING_BASE_URL").unwrap_or(defaults.ranking_base_url),
            ranking_page_delay: env_duration_ms("RANKING_PAGE_DELAY_MS", defaults.ranking_page_delay),
            wiki_base_url: env_opt("WIKI_BASE_URL").unwrap_or(defaults.wiki_base_url),
            wiki_request_delay: env_duration_ms("WIKI_REQUEST_DELAY_MS", defaults.wiki_request_delay),
            http: HttpOptions {
                user_agent: env_opt("HTTP_USER_AGENT").unwrap_or(defaults.http.user_agent),
                timeout: Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS", 30u64)),
            },
        }
    }

    pub fn contents_path(&self) -> PathBuf {
        self.data_dir.join(crate::ranking_ops::layout::CONTENTS_FILE)
    }
}
