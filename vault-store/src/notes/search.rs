//! Search, backlinks, and tag lookups over the vault.
//!
//! Built entirely on [`VaultStore::recursive_list`] and [`VaultStore::read`], so the
//! same sandbox and visibility rules apply. A file that cannot be read is simply
//! left out of the results.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{AsRefStr, EnumString};

use super::markdown::{self, WikiLink};
use super::{Entry, VaultStore};

/// What a search query is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SearchMode {
    /// File and directory names
    Name,
    /// Contents of regular files
    Content,
    /// Name first, content only when the name misses
    #[default]
    Both,
}

impl VaultStore {
    /// Case-insensitive substring search under `folder` (empty = whole store).
    /// A blank query matches nothing.
    pub fn search(&self, query: &str, folder: &str, mode: SearchMode) -> Vec<Entry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.recursive_list(folder)
            .into_iter()
            .filter(|entry| {
                let name_hit = || entry.name.to_lowercase().contains(&needle);
                let content_hit = || !entry.is_dir && self.content_contains(&entry.path, &needle);
                match mode {
                    SearchMode::Name => name_hit(),
                    SearchMode::Content => content_hit(),
                    SearchMode::Both => name_hit() || content_hit(),
                }
            })
            .collect()
    }

    /// Files under `folder` containing a wikilink to `target` (case-insensitive, alias ignored)
    pub fn find_backlinks(&self, target: &str, folder: &str) -> Vec<Entry> {
        let wanted = markdown::normalize_link_target(target);
        if wanted.is_empty() {
            return Vec::new();
        }

        self.documents(folder)
            .filter(|(_, content)| {
                markdown::parse_wikilinks(content)
                    .iter()
                    .any(|link| link.normalized_target == wanted)
            })
            .map(|(entry, _)| entry)
            .collect()
    }

    /// Files under `folder` carrying `tag` (with or without the leading `#`)
    pub fn search_by_tag(&self, tag: &str, folder: &str) -> Vec<Entry> {
        let Some(wanted) = markdown::normalize_tag(tag) else {
            return Vec::new();
        };

        self.documents(folder)
            .filter(|(_, content)| markdown::extract_tags(content).contains(&wanted))
            .map(|(entry, _)| entry)
            .collect()
    }

    /// All distinct tags under `folder` with the number of documents carrying each,
    /// most used first
    pub fn list_tags(&self, folder: &str) -> Vec<(String, usize)> {
        let mut tag_counts: HashMap<String, usize> = HashMap::new();
        for (_, content) in self.documents(folder) {
            for tag in markdown::extract_tags(&content) {
                *tag_counts.entry(tag).or_insert(0) += 1;
            }
        }

        let mut tags: Vec<(String, usize)> = tag_counts.into_iter().collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        tags
    }

    /// Outgoing wikilinks of one document
    pub fn links(&self, path: &str) -> Vec<WikiLink> {
        self.read(path)
            .map(|content| markdown::parse_wikilinks(&content))
            .unwrap_or_default()
    }

    /// Regular files under `folder` paired with their content; unreadable files are skipped
    fn documents<'a>(&'a self, folder: &str) -> impl Iterator<Item = (Entry, String)> + 'a {
        self.recursive_list(folder)
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .filter_map(move |entry| {
                let content = self.read(&entry.path)?;
                Some((entry, content))
            })
    }

    fn content_contains(&self, path: &str, needle: &str) -> bool {
        self.read(path)
            .map(|content| content.to_lowercase().contains(needle))
            .unwrap_or(false)
    }
}
