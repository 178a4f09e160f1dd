use std::collections::BTreeSet;

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::debug;

use super::model::{ConsolidatedEntry, EntryKey, RankingEntry};

/// Merge listings of the same title within one cohort snapshot.
///
/// One output row per `(title, year, age_group, gender)`, in first-seen order.
/// Scalar fields (rank, genre, score) come from the first occurrence; the
/// platform column becomes the sorted union of every platform the title was
/// listed on.
pub fn consolidate<I>(entries: I) -> Vec<ConsolidatedEntry>
where
    I: IntoIterator<Item = RankingEntry>,
{
    let mut groups: IndexMap<EntryKey, (RankingEntry, BTreeSet<&'static str>)> = IndexMap::new();
    let mut seen = 0usize;

    for entry in entries {
        seen += 1;
        let platform = entry.platform.key();
        groups
            .entry(entry.entry_key())
            .and_modify(|(_, platforms)| {
                platforms.insert(platform);
            })
            .or_insert_with(|| (entry, BTreeSet::from([platform])));
    }

    debug!(
        target = "consolidate",
        input = seen,
        output = groups.len(),
        "merged cross-platform duplicates"
    );

    groups
        .into_values()
        .map(|(first, platforms)| ConsolidatedEntry {
            rank: first.rank,
            title: first.title,
            genre: first.genre,
            year: first.year,
            score: first.score,
            platform: platforms.into_iter().join(", "),
            age_group: first.age_group,
            gender: first.gender,
        })
        .collect()
}
