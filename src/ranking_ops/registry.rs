//! Long-lived per-title registry backed by `contents.csv`.
//!
//! The whole file is loaded by [`ContentRegistry::open`] and rewritten by
//! [`ContentRegistry::flush`]; callers flush after every mutating step so the
//! file on disk always reflects a complete pass or batch.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::model::{non_blank, ConsolidatedEntry, ContentKey, ContentRecord, Enrichment, EnrichmentField};
use super::snapshot::write_csv_atomic;
use crate::normalization::names::normalize_names;

/// A title seen in a ranking snapshot, as offered to [`ContentRegistry::upsert_new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTitle {
    pub key: ContentKey,
    pub genre: String,
}

impl From<&ConsolidatedEntry> for NewTitle {
    fn from(entry: &ConsolidatedEntry) -> Self {
        Self {
            key: entry.content_key(),
            genre: entry.genre.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ContentRegistry {
    path: PathBuf,
    rows: IndexMap<ContentKey, ContentRecord>,
}

impl ContentRegistry {
    /// Load the registry at `path`; a missing file yields an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows = if path.is_file() {
            load_rows(&path)?
        } else {
            info!(
                target = "registry",
                path = %path.display(),
                "no registry file yet; starting empty"
            );
            IndexMap::new()
        };
        Ok(Self { path, rows })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &ContentKey) -> Option<&ContentRecord> {
        self.rows.get(key)
    }

    /// Records in registry order.
    pub fn records(&self) -> impl Iterator<Item = &ContentRecord> {
        self.rows.values()
    }

    /// Insert a blank record for every key not yet present. Existing records are
    /// left untouched, genre included. Returns the number of records created.
    pub fn upsert_new<I>(&mut self, titles: I) -> usize
    where
        I: IntoIterator<Item = NewTitle>,
    {
        let mut created = 0usize;
        for title in titles {
            if self.rows.contains_key(&title.key) {
                continue;
            }
            let record = ContentRecord::new(title.key.clone(), title.genre);
            self.rows.insert(title.key, record);
            created += 1;
        }
        debug!(target = "registry", created, total = self.rows.len(), "upsert pass");
        created
    }

    /// Fill the record's null fields from the non-null values in `fields`.
    /// Already-filled fields are never changed. Returns the number of fields
    /// filled, or `None` when the key is not in the registry.
    pub fn patch_fields(&mut self, key: &ContentKey, fields: &Enrichment) -> Option<usize> {
        let record = self.rows.get_mut(key)?;
        Some(record.enrichment.fill_missing_from(fields))
    }

    /// Records whose `field` is still null, in registry order.
    pub fn rows_missing(&self, field: EnrichmentField) -> Vec<&ContentRecord> {
        self.rows
            .values()
            .filter(|r| r.enrichment.get(field).is_none())
            .collect()
    }

    /// Rewrite the whole registry file.
    pub fn flush(&self) -> Result<()> {
        write_csv_atomic(&self.path, |wtr| {
            let mut header: Vec<&str> = vec!["title", "year", "genre"];
            header.extend(EnrichmentField::ALL.iter().map(|f| f.column()));
            wtr.write_record(&header)?;

            for record in self.rows.values() {
                let mut row: Vec<&str> = vec![
                    record.key.title.as_str(),
                    record.key.year.as_str(),
                    record.genre.as_str(),
                ];
                row.extend(
                    EnrichmentField::ALL
                        .iter()
                        .map(|f| record.enrichment.get(*f).unwrap_or("")),
                );
                wtr.write_record(&row)?;
            }
            Ok(())
        })
        .with_context(|| format!("rewriting registry {}", self.path.display()))?;
        debug!(
            target = "registry",
            path = %self.path.display(),
            rows = self.rows.len(),
            "registry flushed"
        );
        Ok(())
    }

    /// Re-run the name normalizer over stored `cast` and `director` values.
    /// Maintenance pass for rows written before normalization existed; not part
    /// of enrichment. Returns the number of values that changed.
    pub fn normalize_person_fields(&mut self) -> usize {
        let mut changed = 0usize;
        for record in self.rows.values_mut() {
            for field in [EnrichmentField::Cast, EnrichmentField::Director] {
                let slot = record.enrichment.slot_mut(field);
                let Some(current) = slot.as_deref() else {
                    continue;
                };
                let normalized = normalize_names(Some(current));
                if normalized.as_deref() != Some(current) {
                    *slot = normalized;
                    changed += 1;
                }
            }
        }
        changed
    }
}

fn load_rows(path: &Path) -> Result<IndexMap<ContentKey, ContentRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening registry {}", path.display()))?;

    let headers = rdr
        .headers()
        .with_context(|| format!("reading registry header {}", path.display()))?
        .clone();
    let columns = ColumnMap::from_headers(&headers);
    let Some(idx_title) = columns.title else {
        bail!("registry {} has no title column", path.display());
    };
    if !columns.unknown.is_empty() {
        warn!(
            target = "registry",
            path = %path.display(),
            columns = ?columns.unknown,
            "ignoring unknown registry columns; they will be dropped on the next rewrite"
        );
    }

    let mut rows: IndexMap<ContentKey, ContentRecord> = IndexMap::new();
    let mut rec = StringRecord::new();
    let mut duplicates = 0usize;
    while rdr.read_record(&mut rec)? {
        let cell = |idx: Option<usize>| idx.and_then(|i| rec.get(i)).map(str::trim).unwrap_or("");
        let title = cell(Some(idx_title));
        if title.is_empty() {
            continue;
        }
        let key = ContentKey::new(title, cell(columns.year));
        if rows.contains_key(&key) {
            duplicates += 1;
            continue;
        }
        let mut record = ContentRecord::new(key.clone(), cell(columns.genre));
        for (field, idx) in &columns.fields {
            *record.enrichment.slot_mut(*field) = non_blank(cell(Some(*idx)).to_string());
        }
        rows.insert(key, record);
    }

    if duplicates > 0 {
        warn!(
            target = "registry",
            path = %path.display(),
            duplicates,
            "duplicate (title, year) rows in registry; kept the first of each"
        );
    }
    info!(
        target = "registry",
        path = %path.display(),
        rows = rows.len(),
        "registry loaded"
    );
    Ok(rows)
}

/// Header positions of the columns we understand. Absent columns read as null.
struct ColumnMap {
    title: Option<usize>,
    year: Option<usize>,
    genre: Option<usize>,
    fields: Vec<(EnrichmentField, usize)>,
    unknown: Vec<String>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut map = ColumnMap {
            title: None,
            year: None,
            genre: None,
            fields: Vec::new(),
            unknown: Vec::new(),
        };
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            let name = name.trim();
            if seen.insert(name, idx).is_some() {
                continue;
            }
            match name {
                "title" => map.title = Some(idx),
                "year" => map.year = Some(idx),
                "genre" => map.genre = Some(idx),
                other => match EnrichmentField::from_column(other) {
                    Some(field) => map.fields.push((field, idx)),
                    None => map.unknown.push(other.to_string()),
                },
            }
        }
        map
    }
}
