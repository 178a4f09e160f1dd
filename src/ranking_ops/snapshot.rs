//! Daily cohort snapshot files (`daily_<GENDER>_<YYMMDD>.csv`).
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer, WriterBuilder};
use itertools::Itertools;
use tracing::{info, warn};

use super::model::ConsolidatedEntry;
use crate::normalization::platform::Platform;

/// Write a CSV through a sibling temp file and rename it into place, so a
/// reader never observes a half-written file.
pub fn write_csv_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut Writer<File>) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data dir {}", parent.display()))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out.csv".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    if let Err(err) = fill_file(&tmp, fill) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err)
            .with_context(|| format!("replacing {} with {}", path.display(), tmp.display()));
    }
    Ok(())
}

fn fill_file<F>(tmp: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut Writer<File>) -> Result<()>,
{
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_path(tmp)
        .with_context(|| format!("opening {}", tmp.display()))?;
    fill(&mut wtr)?;
    wtr.flush()
        .with_context(|| format!("flushing {}", tmp.display()))?;
    Ok(())
}

pub const SNAPSHOT_HEADER: [&str; 8] = [
    "rank",
    "title",
    "genre",
    "year",
    "score",
    "platform",
    "age_group",
    "gender",
];

pub fn write_snapshot(path: &Path, entries: &[ConsolidatedEntry]) -> Result<()> {
    write_csv_atomic(path, |wtr| {
        wtr.write_record(SNAPSHOT_HEADER)?;
        for entry in entries {
            wtr.serialize(entry)?;
        }
        Ok(())
    })?;
    info!(
        target = "snapshot",
        path = %path.display(),
        rows = entries.len(),
        "wrote cohort snapshot"
    );
    Ok(())
}

/// Read a snapshot back. Rows that do not deserialize are skipped with a warning;
/// platform labels are resolved to their keys (`"Disney+, NETFLIX"` reads as
/// `"disney, netflix"`).
pub fn read_snapshot(path: &Path) -> Result<Vec<ConsolidatedEntry>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening snapshot {}", path.display()))?;

    let mut out = Vec::new();
    for (idx, row) in rdr.deserialize::<ConsolidatedEntry>().enumerate() {
        match row {
            Ok(mut entry) => {
                entry.platform = canonical_platforms(&entry.platform);
                out.push(entry);
            }
            Err(err) => warn!(
                target = "snapshot",
                path = %path.display(),
                row = idx + 1,
                error = %err,
                "skipping unreadable snapshot row"
            ),
        }
    }
    Ok(out)
}

/// Sorted, de-duplicated platform keys. Unknown labels are kept as written.
fn canonical_platforms(raw: &str) -> String {
    let mut keys: BTreeSet<String> = BTreeSet::new();
    for label in raw.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        match Platform::from_label(label) {
            Some(platform) => {
                keys.insert(platform.key().to_string());
            }
            None => {
                warn!(target = "snapshot", label, "unrecognized platform label kept as-is");
                keys.insert(label.to_string());
            }
        }
    }
    keys.into_iter().join(", ")
}
