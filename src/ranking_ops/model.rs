//! Row shapes shared by the scrape, consolidation, registry and join stages.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalization::platform::Platform;

/// Age cohorts offered by the ranking site. `All` is the unsegmented chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgeGroup {
    #[serde(alias = "10대")]
    Teenage,
    #[serde(alias = "20대")]
    Twenties,
    #[serde(alias = "30대")]
    Thirties,
    #[serde(alias = "40대")]
    Forties,
    #[serde(alias = "50대")]
    Fifty,
    #[serde(alias = "전체")]
    All,
}

impl AgeGroup {
    /// Segmented cohorts, in scrape order.
    pub const COHORTS: [AgeGroup; 5] = [
        AgeGroup::Teenage,
        AgeGroup::Twenties,
        AgeGroup::Thirties,
        AgeGroup::Forties,
        AgeGroup::Fifty,
    ];

    pub fn code(self) -> &'static str {
        match self {
            AgeGroup::Teenage => "TEENAGE",
            AgeGroup::Twenties => "TWENTIES",
            AgeGroup::Thirties => "THIRTIES",
            AgeGroup::Forties => "FORTIES",
            AgeGroup::Fifty => "FIFTY",
            AgeGroup::All => "ALL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    #[serde(alias = "여성")]
    Female,
    #[serde(alias = "남성")]
    Male,
    #[serde(alias = "전체")]
    All,
}

impl Gender {
    /// Segmented genders, in scrape order.
    pub const COHORTS: [Gender; 2] = [Gender::Female, Gender::Male];

    pub fn code(self) -> &'static str {
        match self {
            Gender::Female => "FEMALE",
            Gender::Male => "MALE",
            Gender::All => "ALL",
        }
    }
}

/// One (age group, gender) audience segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cohort {
    pub age_group: AgeGroup,
    pub gender: Gender,
}

impl Cohort {
    pub fn new(age_group: AgeGroup, gender: Gender) -> Self {
        Self { age_group, gender }
    }

    /// Every segmented cohort: genders outer, age groups inner.
    pub fn all() -> Vec<Cohort> {
        Gender::COHORTS
            .iter()
            .flat_map(|g| AgeGroup::COHORTS.iter().map(move |a| Cohort::new(*a, *g)))
            .collect()
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.age_group.code(), self.gender.code())
    }
}

/// Registry identity of a title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey {
    pub title: String,
    pub year: String,
}

impl ContentKey {
    pub fn new(title: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: year.into(),
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.title, self.year)
    }
}

/// Consolidation identity of a title within one cohort snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub content: ContentKey,
    pub age_group: AgeGroup,
    pub gender: Gender,
}

/// One title's position in one platform listing for one cohort.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub rank: u32,
    pub title: String,
    pub genre: String,
    pub year: String,
    pub score: f64,
    pub platform: Platform,
    pub age_group: AgeGroup,
    pub gender: Gender,
}

impl RankingEntry {
    pub fn entry_key(&self) -> EntryKey {
        EntryKey {
            content: ContentKey::new(self.title.clone(), self.year.clone()),
            age_group: self.age_group,
            gender: self.gender,
        }
    }
}

/// A title's standing in one cohort after merging its platform listings.
/// Field order is the column order of the daily snapshot files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedEntry {
    pub rank: u32,
    pub title: String,
    pub genre: String,
    pub year: String,
    pub score: f64,
    /// Sorted, `", "`-joined platform keys.
    pub platform: String,
    pub age_group: AgeGroup,
    pub gender: Gender,
}

impl ConsolidatedEntry {
    pub fn content_key(&self) -> ContentKey {
        ContentKey::new(self.title.clone(), self.year.clone())
    }
}

/// Enrichment attributes stored per title, in registry column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichmentField {
    GenreDetail,
    Director,
    Runtime,
    Streaming,
    Production,
    Rating,
    BroadcastPeriod,
    Episodes,
    Cast,
    Country,
    Language,
}

impl EnrichmentField {
    pub const ALL: [EnrichmentField; 11] = [
        EnrichmentField::GenreDetail,
        EnrichmentField::Director,
        EnrichmentField::Runtime,
        EnrichmentField::Streaming,
        EnrichmentField::Production,
        EnrichmentField::Rating,
        EnrichmentField::BroadcastPeriod,
        EnrichmentField::Episodes,
        EnrichmentField::Cast,
        EnrichmentField::Country,
        EnrichmentField::Language,
    ];

    pub fn column(self) -> &'static str {
        match self {
            EnrichmentField::GenreDetail => "genre_detail",
            EnrichmentField::Director => "director",
            EnrichmentField::Runtime => "runtime",
            EnrichmentField::Streaming => "streaming",
            EnrichmentField::Production => "production",
            EnrichmentField::Rating => "rating",
            EnrichmentField::BroadcastPeriod => "broadcast_period",
            EnrichmentField::Episodes => "episodes",
            EnrichmentField::Cast => "cast",
            EnrichmentField::Country => "country",
            EnrichmentField::Language => "language",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.column() == name)
    }
}

/// Fixed-shape set of optional enrichment values. Used both for what a
/// lookup returned and for what a registry row currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub genre_detail: Option<String>,
    pub director: Option<String>,
    pub runtime: Option<String>,
    pub streaming: Option<String>,
    pub production: Option<String>,
    pub rating: Option<String>,
    pub broadcast_period: Option<String>,
    pub episodes: Option<String>,
    pub cast: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
}

impl Enrichment {
    pub fn get(&self, field: EnrichmentField) -> Option<&str> {
        let slot = match field {
            EnrichmentField::GenreDetail => &self.genre_detail,
            EnrichmentField::Director => &self.director,
            EnrichmentField::Runtime => &self.runtime,
            EnrichmentField::Streaming => &self.streaming,
            EnrichmentField::Production => &self.production,
            EnrichmentField::Rating => &self.rating,
            EnrichmentField::BroadcastPeriod => &self.broadcast_period,
            EnrichmentField::Episodes => &self.episodes,
            EnrichmentField::Cast => &self.cast,
            EnrichmentField::Country => &self.country,
            EnrichmentField::Language => &self.language,
        };
        slot.as_deref()
    }

    pub fn slot_mut(&mut self, field: EnrichmentField) -> &mut Option<String> {
        match field {
            EnrichmentField::GenreDetail => &mut self.genre_detail,
            EnrichmentField::Director => &mut self.director,
            EnrichmentField::Runtime => &mut self.runtime,
            EnrichmentField::Streaming => &mut self.streaming,
            EnrichmentField::Production => &mut self.production,
            EnrichmentField::Rating => &mut self.rating,
            EnrichmentField::BroadcastPeriod => &mut self.broadcast_period,
            EnrichmentField::Episodes => &mut self.episodes,
            EnrichmentField::Cast => &mut self.cast,
            EnrichmentField::Country => &mut self.country,
            EnrichmentField::Language => &mut self.language,
        }
    }

    /// Builder-style setter; blank values are stored as `None`.
    pub fn with(mut self, field: EnrichmentField, value: impl Into<String>) -> Self {
        *self.slot_mut(field) = non_blank(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }

    pub fn filled_count(&self) -> usize {
        EnrichmentField::ALL
            .iter()
            .filter(|f| self.get(**f).is_some())
            .count()
    }

    /// Copy every non-blank value of `other` into slots that are still `None`.
    /// Filled slots are never touched. Returns the number of slots filled.
    pub fn fill_missing_from(&mut self, other: &Enrichment) -> usize {
        let mut filled = 0;
        for field in EnrichmentField::ALL {
            let Some(value) = other.get(field).and_then(|v| non_blank(v.to_string())) else {
                continue;
            };
            let slot = self.slot_mut(field);
            if slot.is_none() {
                *slot = Some(value);
                filled += 1;
            }
        }
        filled
    }

    /// Overwrite slots with every non-blank value of `other` (later source wins).
    pub fn overlay(&mut self, other: &Enrichment) {
        for field in EnrichmentField::ALL {
            if let Some(value) = other.get(field).and_then(|v| non_blank(v.to_string())) {
                *self.slot_mut(field) = Some(value);
            }
        }
    }
}

pub(crate) fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// One persistent registry row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub key: ContentKey,
    /// Coarse genre from the ranking listing; fixed at creation.
    pub genre: String,
    pub enrichment: Enrichment,
}

impl ContentRecord {
    pub fn new(key: ContentKey, genre: impl Into<String>) -> Self {
        Self {
            key,
            genre: genre.into(),
            enrichment: Enrichment::default(),
        }
    }
}
