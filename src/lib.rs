pub mod cli;
pub mod config;
pub mod normalization;
pub mod pipeline;
pub mod ranking_ops;

pub mod util {
    pub mod env;
    pub mod logging;
}

pub use config::PipelineConfig;
pub use pipeline::{run_daily, DailyOutcome};
