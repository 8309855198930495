//! Extract [[wikilinks]] and #tags from markdown body content via regex.
//!
//! Pure functions over in-memory text; nothing here touches the filesystem.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// A parsed `[[Target]]` or `[[Target|Alias]]` reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WikiLink {
    /// The full span including brackets
    pub raw: String,
    pub target: String,
    pub alias: Option<String>,
    /// Lowercased, trimmed target used for backlink comparison
    pub normalized_target: String,
}

// Regex patterns for extraction
static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]\n]+)\]\]").unwrap());
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{1,6}\s").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w/])(#[\p{L}\p{N}]+(?:/[\p{L}\p{N}]+)*)").unwrap()
});

/// Extract [[wikilinks]] from text. Empty targets (`[[|alias]]`, `[[  ]]`) are dropped.
pub fn parse_wikilinks(text: &str) -> Vec<WikiLink> {
    WIKILINK_RE
        .captures_iter(text)
        .filter_map(|cap| {
            let inner = cap[1].trim();
            let (target, alias) = match inner.split_once('|') {
                Some((target, alias)) => {
                    let alias = alias.trim();
                    (target.trim(), (!alias.is_empty()).then(|| alias.to_string()))
                }
                None => (inner, None),
            };
            if target.is_empty() {
                return None;
            }
            Some(WikiLink {
                raw: cap[0].to_string(),
                target: target.to_string(),
                alias,
                normalized_target: normalize_link_target(target),
            })
        })
        .collect()
}

pub fn normalize_link_target(target: &str) -> String {
    target.trim().to_lowercase()
}

/// Whether a line is a markdown heading (`#` through `######` then whitespace)
pub fn is_heading(line: &str) -> bool {
    HEADING_RE.is_match(line.trim_start())
}

/// Extract #tags from text: lowercased, deduplicated, sorted.
///
/// Heading lines are skipped entirely. A `#` only starts a tag at line start or
/// after a character that is neither a word character nor `/`, so `a#b` and
/// `http://x/#frag` do not produce tags.
pub fn extract_tags(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let mut tags = BTreeSet::new();

    for line in normalized.split('\n') {
        if is_heading(line) {
            continue;
        }
        for cap in TAG_RE.captures_iter(line) {
            tags.insert(cap[1].to_lowercase());
        }
    }

    tags.into_iter().collect()
}

/// Normalize a tag query: trimmed, lowercased, `#`-prefixed. `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim().trim_start_matches('#').trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(format!("#{}", trimmed.to_lowercase()))
}
