//! Ranking card extraction from a rendered listing page.
//!
//! Each listing item is a `content-list-card content-list-card--md` block
//! holding the rank number, the title, a `genre · year` subtitle and the
//! platform score. Cards missing any of those are skipped.
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::debug;

use crate::normalization::html::fragment_text;
use crate::normalization::platform::Platform;
use crate::ranking_ops::model::{Cohort, RankingEntry};

const CARD_MARKER: &str = "content-list-card content-list-card--md";

struct CardPatterns {
    rank: Regex,
    title: Regex,
    subtitle: Regex,
    score: Regex,
}

static PATTERNS: OnceLock<CardPatterns> = OnceLock::new();

fn class_value(class: &str) -> String {
    // element whose class list contains `class`, capturing its text up to the next tag
    format!(r#"(?s)class="(?:[^"]*\s)?{class}(?:\s[^"]*)?"[^>]*>\s*(?:<[^>]+>\s*)*([^<]+)"#)
}

fn patterns() -> &'static CardPatterns {
    PATTERNS.get_or_init(|| CardPatterns {
        rank: Regex::new(&class_value("rank__number")).expect("static regex"),
        title: Regex::new(&class_value("info__title")).expect("static regex"),
        subtitle: Regex::new(&class_value("info__subtitle")).expect("static regex"),
        score: Regex::new(&class_value("score__number")).expect("static regex"),
    })
}

/// Extract every parseable card from one platform page.
pub fn parse_ranking_cards(html: &str, platform: Platform, cohort: Cohort) -> Vec<RankingEntry> {
    let starts: Vec<usize> = html.match_indices(CARD_MARKER).map(|(i, _)| i).collect();
    let mut out = Vec::with_capacity(starts.len());

    for (n, start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(html.len());
        match parse_card(&html[*start..end], platform, cohort) {
            Ok(entry) => out.push(entry),
            Err(err) => debug!(
                target = "kinolights",
                platform = %platform,
                card = n + 1,
                error = %err,
                "skipping unparseable card"
            ),
        }
    }
    out
}

fn parse_card(card: &str, platform: Platform, cohort: Cohort) -> Result<RankingEntry> {
    let p = patterns();
    let rank: u32 = capture_text(&p.rank, card, "rank")?
        .parse()
        .context("rank is not an integer")?;
    let title = capture_text(&p.title, card, "title")?;
    let subtitle = capture_text(&p.subtitle, card, "subtitle")?;
    let (genre, year) = split_subtitle(&subtitle)
        .ok_or_else(|| anyhow!("subtitle {subtitle:?} is not `genre · year`"))?;
    let score: f64 = capture_text(&p.score, card, "score")?
        .parse()
        .context("score is not a number")?;

    if rank == 0 {
        return Err(anyhow!("rank must be 1-based"));
    }
    Ok(RankingEntry {
        rank,
        title,
        genre,
        year,
        score,
        platform,
        age_group: cohort.age_group,
        gender: cohort.gender,
    })
}

fn capture_text(re: &Regex, card: &str, what: &str) -> Result<String> {
    let raw = re
        .captures(card)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| anyhow!("{what} not found"))?;
    let text = fragment_text(raw).replace('\n', " ");
    if text.is_empty() {
        return Err(anyhow!("{what} is empty"));
    }
    Ok(text)
}

fn split_subtitle(subtitle: &str) -> Option<(String, String)> {
    let mut parts = subtitle.split('·').map(str::trim);
    let genre = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() || genre.is_empty() || year.is_empty() {
        return None;
    }
    Some((genre.to_string(), year.to_string()))
}
