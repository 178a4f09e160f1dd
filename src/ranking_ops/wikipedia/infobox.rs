//! Infobox extraction. Header labels are matched by substring, first
//! matching rule wins, and a later row overwrites an earlier one for the
//! same field.
use std::sync::OnceLock;

use regex::Regex;

use crate::normalization::html::{decode_entities, fragment_text};
use crate::normalization::names::normalize_names;
use crate::ranking_ops::model::{Enrichment, EnrichmentField};

/// Body text of the "no article with this name" page.
pub const MISSING_ARTICLE_MARKER: &str = "위키백과에 이 이름의 문서가 없습니다";

const HEADER_RULES: &[(&[&str], EnrichmentField)] = &[
    (&["장르"], EnrichmentField::GenreDetail),
    (&["연출", "감독"], EnrichmentField::Director),
    (&["방송 분량", "상영 시간", "러닝타임"], EnrichmentField::Runtime),
    (&["추가 채널", "스트리밍"], EnrichmentField::Streaming),
    (&["제작사"], EnrichmentField::Production),
    (&["등급"], EnrichmentField::Rating),
    (&["방송 기간"], EnrichmentField::BroadcastPeriod),
    (&["방송 횟수", "에피소드"], EnrichmentField::Episodes),
    (&["출연", "주연", "배우"], EnrichmentField::Cast),
    (&["국가", "제작 국가"], EnrichmentField::Country),
    (&["언어", "원어"], EnrichmentField::Language),
];

static INFOBOX_RE: OnceLock<Regex> = OnceLock::new();
static ROW_RE: OnceLock<Regex> = OnceLock::new();
static TH_RE: OnceLock<Regex> = OnceLock::new();
static TD_RE: OnceLock<Regex> = OnceLock::new();
static IMG_ALT_RE: OnceLock<Regex> = OnceLock::new();

fn infobox_re() -> &'static Regex {
    INFOBOX_RE.get_or_init(|| {
        Regex::new(r#"(?is)<table[^>]*\bclass="(?:[^"]*\s)?infobox(?:\s[^"]*)?"[^>]*>(.*?)</table>"#)
            .expect("static regex")
    })
}

fn row_re() -> &'static Regex {
    ROW_RE.get_or_init(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("static regex"))
}

fn th_re() -> &'static Regex {
    TH_RE.get_or_init(|| Regex::new(r"(?is)<th\b[^>]*>(.*?)</th>").expect("static regex"))
}

fn td_re() -> &'static Regex {
    TD_RE.get_or_init(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("static regex"))
}

fn img_alt_re() -> &'static Regex {
    IMG_ALT_RE.get_or_init(|| Regex::new(r#"(?is)<img\b[^>]*\balt="([^"]*)""#).expect("static regex"))
}

pub fn is_missing_article(html: &str) -> bool {
    html.contains(MISSING_ARTICLE_MARKER)
}

/// Field a header label maps to, if any.
pub fn classify_header(header: &str) -> Option<EnrichmentField> {
    HEADER_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| header.contains(n)))
        .map(|(_, field)| *field)
}

/// Parse the first infobox on the page. `None` when the page has no infobox.
pub fn parse_infobox(html: &str) -> Option<Enrichment> {
    let body = infobox_re().captures(html)?.get(1)?.as_str();
    let mut info = Enrichment::default();

    for row in row_re().captures_iter(body) {
        let row = &row[1];
        let Some(th) = th_re().captures(row) else { continue };
        let Some(td) = td_re().captures(row) else { continue };
        let header = fragment_text(&th[1]).replace('\n', " ");
        let Some(field) = classify_header(&header) else { continue };
        let cell = &td[1];

        let value = match field {
            EnrichmentField::Director | EnrichmentField::Cast => {
                normalize_names(Some(&fragment_text(cell)))
            }
            EnrichmentField::Rating => cell_value(cell).or_else(|| {
                img_alt_re()
                    .captures(cell)
                    .map(|c| decode_entities(c[1].trim()))
                    .filter(|alt| !alt.is_empty())
            }),
            _ => cell_value(cell),
        };
        if let Some(value) = value {
            *info.slot_mut(field) = Some(value);
        }
    }
    Some(info)
}

fn cell_value(cell: &str) -> Option<String> {
    let text = fragment_text(cell)
        .lines()
        .collect::<Vec<_>>()
        .join(", ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
<html><body>
<table class="infobox vevent" style="width:22em">
  <tbody>
    <tr><th colspan="2" class="infobox-above">오징어 게임</th></tr>
    <tr><th scope="row">장르</th><td><a href="/wiki/스릴러">스릴러</a><br />서바이벌</td></tr>
    <tr><th scope="row">연출</th><td><a href="/wiki/황동혁">황동혁</a></td></tr>
    <tr><th scope="row">출연</th><td><a>이정재</a><br/><a>박해수</a><br/>위하준</td></tr>
    <tr><th scope="row">제작 국가</th><td>대한민국</td></tr>
    <tr><th scope="row">언어</th><td>한국어</td></tr>
    <tr><th scope="row">방송 횟수</th><td>9부작</td></tr>
    <tr><th scope="row">시청 등급</th><td><img src="x.png" alt="청소년 관람불가" /></td></tr>
    <tr><th scope="row">방송 분량</th><td>60분</td></tr>
    <tr><th scope="row">추가 채널</th><td>넷플릭스</td></tr>
    <tr><th scope="row">제작사</th><td>싸이런픽쳐스</td></tr>
    <tr><th scope="row">방송 기간</th><td>2021년 9월 17일</td></tr>
    <tr><th scope="row">각본</th><td>황동혁</td></tr>
  </tbody>
</table>
</body></html>"#;

    #[test]
    fn maps_korean_headers_to_fields() {
        let info = parse_infobox(FIXTURE).unwrap();
        assert_eq!(info.genre_detail.as_deref(), Some("스릴러, 서바이벌"));
        assert_eq!(info.director.as_deref(), Some("황동혁"));
        assert_eq!(info.cast.as_deref(), Some("이정재 박해수 위하준"));
        assert_eq!(info.country.as_deref(), Some("대한민국"));
        assert_eq!(info.language.as_deref(), Some("한국어"));
        assert_eq!(info.episodes.as_deref(), Some("9부작"));
        assert_eq!(info.rating.as_deref(), Some("청소년 관람불가"));
        assert_eq!(info.runtime.as_deref(), Some("60분"));
        assert_eq!(info.streaming.as_deref(), Some("넷플릭스"));
        assert_eq!(info.production.as_deref(), Some("싸이런픽쳐스"));
        assert_eq!(info.broadcast_period.as_deref(), Some("2021년 9월 17일"));
    }

    #[test]
    fn page_without_infobox_yields_none() {
        assert!(parse_infobox("<p>동음이의어 문서</p>").is_none());
    }

    #[test]
    fn headers_resolve_in_rule_order() {
        assert_eq!(classify_header("감독"), Some(EnrichmentField::Director));
        assert_eq!(classify_header("제작 국가"), Some(EnrichmentField::Country));
        assert_eq!(classify_header("원어"), Some(EnrichmentField::Language));
        assert_eq!(classify_header("각본"), None);
    }

    #[test]
    fn missing_article_marker_is_detected() {
        let page = format!("<div>{MISSING_ARTICLE_MARKER}. 새 문서를 만드세요.</div>");
        assert!(is_missing_article(&page));
        assert!(!is_missing_article(FIXTURE));
    }
}
