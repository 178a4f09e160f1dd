use std::fmt;

use strsim::jaro_winkler;

/// Minimum similarity score (Jaro-Winkler) required for a free-text label
/// to be accepted as a known platform when no exact key or slug matches.
pub const MIN_PLATFORM_SIMILARITY: f64 = 0.90;

/// Streaming platforms the ranking site publishes per-cohort charts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Netflix,
    Tving,
    Coupang,
    Wavve,
    Disney,
    Watcha,
    BoxOffice,
}

impl Platform {
    /// Iteration order used when scraping a cohort; consolidation keeps the
    /// first-seen entry, so this order is part of the output contract.
    pub const ALL: [Platform; 7] = [
        Platform::Netflix,
        Platform::Tving,
        Platform::Coupang,
        Platform::Wavve,
        Platform::Disney,
        Platform::Watcha,
        Platform::BoxOffice,
    ];

    /// Short identifier written into snapshot files.
    pub fn key(self) -> &'static str {
        match self {
            Platform::Netflix => "netflix",
            Platform::Tving => "tving",
            Platform::Coupang => "coupang",
            Platform::Wavve => "wavve",
            Platform::Disney => "disney",
            Platform::Watcha => "watcha",
            Platform::BoxOffice => "boxoffice",
        }
    }

    /// Path segment of the platform's ranking page.
    pub fn url_slug(self) -> &'static str {
        match self {
            Platform::Coupang => "coupangplay",
            Platform::Disney => "disneyplus",
            other => other.key(),
        }
    }

    /// Resolve a free-text label ("Disney+", "Coupang Play", "NETFLIX").
    ///
    /// Normalization steps:
    /// - lowercase and keep ASCII alphanumerics only
    /// - exact match against keys, then URL slugs
    /// - Jaro-Winkler fallback against keys above [`MIN_PLATFORM_SIMILARITY`]
    pub fn from_label(raw: &str) -> Option<Self> {
        let token = canonical_token(raw);
        if token.is_empty() {
            return None;
        }
        if let Some(p) = Self::ALL.iter().find(|p| p.key() == token) {
            return Some(*p);
        }
        if let Some(p) = Self::ALL.iter().find(|p| p.url_slug() == token) {
            return Some(*p);
        }
        Self::ALL
            .iter()
            .map(|p| (*p, jaro_winkler(&token, p.key())))
            .filter(|(_, score)| *score >= MIN_PLATFORM_SIMILARITY)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn canonical_token(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_keys_case_insensitively() {
        assert_eq!(Platform::from_label("NETFLIX"), Some(Platform::Netflix));
        assert_eq!(Platform::from_label(" tving "), Some(Platform::Tving));
        assert_eq!(Platform::from_label("box office"), Some(Platform::BoxOffice));
    }

    #[test]
    fn resolves_url_slugs_and_branding() {
        assert_eq!(Platform::from_label("Disney+"), Some(Platform::Disney));
        assert_eq!(Platform::from_label("disneyplus"), Some(Platform::Disney));
        assert_eq!(Platform::from_label("Coupang Play"), Some(Platform::Coupang));
    }

    #[test]
    fn tolerates_small_typos_only() {
        assert_eq!(Platform::from_label("netflx"), Some(Platform::Netflix));
        assert_eq!(Platform::from_label("youtube"), None);
        assert_eq!(Platform::from_label(""), None);
    }

    #[test]
    fn slug_differs_only_where_site_uses_brand_path() {
        assert_eq!(Platform::Coupang.url_slug(), "coupangplay");
        assert_eq!(Platform::Disney.url_slug(), "disneyplus");
        assert_eq!(Platform::Watcha.url_slug(), "watcha");
    }
}
