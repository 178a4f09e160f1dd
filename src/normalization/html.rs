//! Tolerant HTML-to-text helpers shared by the page parsers.
use regex::Regex;
use std::sync::OnceLock;

static TAG_RE: OnceLock<Regex> = OnceLock::new();
static BLOCK_BREAK_RE: OnceLock<Regex> = OnceLock::new();
static WS_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"))
}

fn block_break_re() -> &'static Regex {
    BLOCK_BREAK_RE.get_or_init(|| {
        Regex::new(r"(?i)<\s*(br|/p|/li|/div)\s*/?\s*>").expect("static regex")
    })
}

fn ws_re() -> &'static Regex {
    WS_RE.get_or_init(|| Regex::new(r"[ \t\r\f\v\u{a0}]+").expect("static regex"))
}

/// Replace every tag with a space. Line breaks already in the source survive.
pub fn strip_tags(raw: &str) -> String {
    tag_re().replace_all(raw, " ").into_owned()
}

/// Visible text of an HTML fragment: `<br>`/block ends become line breaks,
/// other tags are dropped, entities decoded, horizontal whitespace collapsed,
/// and blank lines removed.
pub fn fragment_text(raw: &str) -> String {
    let with_breaks = block_break_re().replace_all(raw, "\n");
    let no_tags = tag_re().replace_all(&with_breaks, " ");
    let decoded = decode_entities(&no_tags);
    decoded
        .lines()
        .map(|line| ws_re().replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode named and numeric character references (`&ndash;`, `&#58;`, `&#x2026;`).
pub fn decode_entities(raw: &str) -> String {
    html_escape::decode_html_entities(raw).into_owned()
}
