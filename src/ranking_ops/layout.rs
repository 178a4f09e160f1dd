//! File naming inside the data directory.
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::model::Gender;

pub const CONTENTS_FILE: &str = "contents.csv";

/// Paths of every file one daily run reads or writes.
#[derive(Debug, Clone)]
pub struct DailyLayout {
    data_dir: PathBuf,
    stamp: String,
}

impl DailyLayout {
    pub fn new(data_dir: impl Into<PathBuf>, day: NaiveDate) -> Self {
        Self {
            data_dir: data_dir.into(),
            stamp: day.format("%y%m%d").to_string(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// `YYMMDD` suffix shared by the day's files.
    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// `daily_<GENDER>_<YYMMDD>.csv`
    pub fn snapshot(&self, gender: Gender) -> PathBuf {
        self.data_dir
            .join(format!("daily_{}_{}.csv", gender.code(), self.stamp))
    }

    /// `<gender>_train_<YYMMDD>.csv`
    pub fn train(&self, gender: Gender) -> PathBuf {
        self.data_dir.join(format!(
            "{}_train_{}.csv",
            gender.code().to_ascii_lowercase(),
            self.stamp
        ))
    }

    pub fn contents(&self) -> PathBuf {
        self.data_dir.join(CONTENTS_FILE)
    }

    pub fn snapshots_exist(&self) -> bool {
        Gender::COHORTS.iter().all(|g| self.snapshot(*g).is_file())
    }

    pub fn train_outputs_exist(&self) -> bool {
        Gender::COHORTS.iter().all(|g| self.train(*g).is_file())
    }
}
