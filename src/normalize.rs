//! Value normalizers: raw display text in, typed values out.
//!
//! Every function here is total. Unparsable input resolves to `None` (absent)
//! or an empty collection, never to an error.

use crate::record::Tag;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

/// Placeholder sources use for "no data".
pub const NO_DATA: &str = "—";

// Safety: the patterns and selectors below are compile-time constants.
static MAGNITUDE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d[\d,]*(?:\.\d+)?|\.\d+)([KM]\b)?").unwrap()
});

static INTEGER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static LEADING_ARTIFACTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s;,\u{00a0}\u{200b}]+").unwrap()
});

static TAG_COLOR_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"bg-(green|blue|red)-100").unwrap()
});

static SPAN_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());

static TAG_ICON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"img[alt="tool-icon"]"#).unwrap()
});

static TOOLTIP_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.hidden.absolute.bg-indigo-900").unwrap()
});

/// Parse a leading number with an optional `K`/`M` unit, e.g. `"$8.33K"` → 8330.
///
/// Only the first numeric token is consumed; anything after it is ignored.
/// Thousands separators inside the token are accepted.
pub fn parse_magnitude(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() || text == NO_DATA {
        return None;
    }

    let upper = text.to_uppercase();
    let caps = MAGNITUDE_PATTERN.captures(&upper)?;
    let value: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str()) {
        Some("K") => 1_000.0,
        Some("M") => 1_000_000.0,
        _ => 1.0,
    };
    Some(value * multiplier)
}

/// First run of digits in `text`, e.g. `"Built in 45 days"` → 45.
pub fn first_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() || text == NO_DATA {
        return None;
    }
    INTEGER_PATTERN.find(text)?.as_str().parse().ok()
}

/// Collapse every whitespace run (NBSP included) to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// Remove a case-insensitive `prefix` such as `"Ünvan:"` and tidy the rest.
///
/// After removal, leading punctuation/NBSP/zero-width artifacts are dropped and
/// whitespace runs collapse to one space. Text that does not start with the
/// prefix is returned unchanged.
pub fn strip_labeled_prefix(text: &str, prefix: &str) -> String {
    let trimmed = text.trim();
    match strip_prefix_ignore_case(trimmed, prefix) {
        Some(rest) => {
            let rest = LEADING_ARTIFACTS.replace(rest, "");
            collapse_whitespace(&rest)
        }
        None => text.to_string(),
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut text_chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = text_chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let consumed = text_chars.next().map_or(text.len(), |(idx, _)| idx);
    Some(&text[consumed..])
}

/// Text nodes of `element`, each trimmed, concatenated without a separator.
pub fn compact_text(element: &ElementRef) -> String {
    element.text().map(str::trim).collect::<String>()
}

/// Text nodes of `element` joined by single spaces with whitespace collapsed.
pub fn spaced_text(element: &ElementRef) -> String {
    let joined = element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    collapse_whitespace(&joined)
}

/// Prefer the hover-revealed detail text of a cell over its truncated visible text.
pub fn extract_tooltip_text(element: &ElementRef) -> String {
    match element.select(&TOOLTIP_SELECTOR).next() {
        Some(tooltip) => spaced_text(&tooltip),
        None => collapse_whitespace(&compact_text(element)),
    }
}

/// Collect the color-coded tag spans of a fragment in display order.
///
/// Trailing ellipsis markers are stripped from names. Duplicates are kept.
pub fn extract_tags(fragment: &ElementRef) -> Vec<Tag> {
    fragment
        .select(&SPAN_SELECTOR)
        .filter(|span| {
            span.value()
                .attr("class")
                .is_some_and(|class| TAG_COLOR_CLASS.is_match(class))
        })
        .map(|span| {
            let text = compact_text(&span);
            let name = text
                .trim_end_matches("...")
                .trim_end_matches('…')
                .trim()
                .to_string();
            let icon = span
                .select(&TAG_ICON_SELECTOR)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(str::to_string);
            Tag { name, icon }
        })
        .collect()
}

/// Resolve a logo/file reference against `base`.
///
/// Absolute `http(s)` references pass through unchanged; bare file names and
/// relative paths are joined onto `base`, which is always treated as a
/// directory. Spaces and non-ASCII characters in the reference come back
/// percent-encoded.
pub fn resolve_asset_url(base: &str, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if reference.starts_with("http") {
        return Some(reference.to_string());
    }
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    match Url::parse(&base).and_then(|b| b.join(reference)) {
        Ok(url) => Some(url.to_string()),
        Err(_) => Some(format!("{}{}", base, reference)),
    }
}
