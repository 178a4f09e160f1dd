use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::model::{ConsolidatedEntry, Enrichment, EnrichmentField};
use super::registry::ContentRegistry;
use super::snapshot::{write_csv_atomic, SNAPSHOT_HEADER};

/// One output row: a consolidated ranking entry plus its registry metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainRow {
    pub entry: ConsolidatedEntry,
    /// All `None` when the title has no registry row.
    pub enrichment: Enrichment,
    pub matched: bool,
}

/// Left-join a cohort's entries with the registry on `(title, year)`.
/// Entry order and fields are preserved; the registry is only read.
pub fn join_snapshot(entries: &[ConsolidatedEntry], registry: &ContentRegistry) -> Vec<TrainRow> {
    let rows: Vec<TrainRow> = entries
        .iter()
        .map(|entry| match registry.get(&entry.content_key()) {
            Some(record) => TrainRow {
                entry: entry.clone(),
                enrichment: record.enrichment.clone(),
                matched: true,
            },
            None => TrainRow {
                entry: entry.clone(),
                enrichment: Enrichment::default(),
                matched: false,
            },
        })
        .collect();

    let unmatched = rows.iter().filter(|r| !r.matched).count();
    if unmatched > 0 {
        warn!(
            target = "join",
            unmatched,
            "snapshot rows without a registry entry; enrichment columns left empty"
        );
    }
    rows
}

/// Write joined rows: snapshot columns followed by the enrichment columns.
pub fn write_train(path: &Path, rows: &[TrainRow]) -> Result<()> {
    write_csv_atomic(path, |wtr| {
        let mut header: Vec<&str> = SNAPSHOT_HEADER.to_vec();
        header.extend(EnrichmentField::ALL.iter().map(|f| f.column()));
        wtr.write_record(&header)?;

        for row in rows {
            let e = &row.entry;
            let mut record = vec![
                e.rank.to_string(),
                e.title.clone(),
                e.genre.clone(),
                e.year.clone(),
                // same rendering as the snapshot files (always keeps a fraction)
                format!("{:?}", e.score),
                e.platform.clone(),
                e.age_group.code().to_string(),
                e.gender.code().to_string(),
            ];
            record.extend(
                EnrichmentField::ALL
                    .iter()
                    .map(|f| row.enrichment.get(*f).unwrap_or("").to_string()),
            );
            wtr.write_record(&record)?;
        }
        Ok(())
    })
    .with_context(|| format!("writing training output {}", path.display()))?;

    info!(
        target = "join",
        path = %path.display(),
        rows = rows.len(),
        "wrote training dataset"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking_ops::model::{AgeGroup, ContentKey, Gender};
    use crate::ranking_ops::registry::NewTitle;
    use std::fs;

    fn entry(title: &str, year: &str) -> ConsolidatedEntry {
        ConsolidatedEntry {
            rank: 1,
            title: title.to_string(),
            genre: "드라마".to_string(),
            year: year.to_string(),
            score: 88.0,
            platform: "netflix, tving".to_string(),
            age_group: AgeGroup::Forties,
            gender: Gender::Female,
        }
    }

    fn registry(dir: &tempfile::TempDir) -> ContentRegistry {
        let mut reg = ContentRegistry::open(dir.path().join("contents.csv")).unwrap();
        reg.upsert_new(vec![
            NewTitle {
                key: ContentKey::new("Foo", "2023"),
                genre: "드라마".to_string(),
            },
            NewTitle {
                key: ContentKey::new("Bar", "2020"),
                genre: "영화".to_string(),
            },
        ]);
        reg.patch_fields(
            &ContentKey::new("Foo", "2023"),
            &Enrichment::default()
                .with(EnrichmentField::GenreDetail, "스릴러")
                .with(EnrichmentField::Cast, "A B")
                .with(EnrichmentField::Language, "한국어"),
        );
        reg
    }

    #[test]
    fn matched_rows_carry_registry_values_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let entries = vec![entry("Foo", "2023"), entry("Bar", "2020")];

        let rows = join_snapshot(&entries, &reg);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(row.matched);
            let stored = &reg.get(&row.entry.content_key()).unwrap().enrichment;
            for field in EnrichmentField::ALL {
                assert_eq!(row.enrichment.get(field), stored.get(field));
            }
        }
        assert_eq!(rows[0].entry, entries[0]);
    }

    #[test]
    fn unmatched_rows_keep_entry_and_empty_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let rows = join_snapshot(&[entry("Foo", "2024")], &reg);
        assert!(!rows[0].matched);
        assert!(rows[0].enrichment.is_empty());
        assert_eq!(rows[0].entry.title, "Foo");
    }

    #[test]
    fn train_file_has_snapshot_then_enrichment_columns() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let rows = join_snapshot(&[entry("Foo", "2023")], &reg);
        let path = dir.path().join("female_train_250101.csv");
        write_train(&path, &rows).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "rank,title,genre,year,score,platform,age_group,gender,genre_detail,director,\
             runtime,streaming,production,rating,broadcast_period,episodes,cast,country,language"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,Foo,드라마,2023,88.0,\"netflix, tving\",FORTIES,FEMALE,스릴러,,,,,,,,A B,,한국어"
        );
    }
}
