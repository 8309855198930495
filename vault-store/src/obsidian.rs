//! Read-only view of the vault's `.obsidian/` configuration, cached behind a
//! cheap structural fingerprint.
//!
//! The fingerprint is the sorted list of visible top-level folders plus size and
//! mtime of each config file we read. While it is unchanged, the last summary is
//! served from a single mutex-guarded slot owned by the store instance.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::UNIX_EPOCH;
use strum::{AsRefStr, EnumString};

use crate::daily::template_file_path;
use crate::notes::VaultStore;

pub const CONFIG_DIR: &str = ".obsidian";
const APP_CONFIG: &str = ".obsidian/app.json";
const DAILY_NOTES_CONFIG: &str = ".obsidian/daily-notes.json";
const TEMPLATES_CONFIG: &str = ".obsidian/templates.json";
const CORE_PLUGINS_CONFIG: &str = ".obsidian/core-plugins.json";
const DAILY_NOTES_PLUGIN: &str = "daily-notes";

/// Config files whose size and mtime feed the fingerprint
const FINGERPRINT_FILES: [&str; 4] = [
    APP_CONFIG,
    DAILY_NOTES_CONFIG,
    TEMPLATES_CONFIG,
    CORE_PLUGINS_CONFIG,
];

/// Where Obsidian puts newly created notes (`newFileLocation`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NewNotePlacement {
    /// Same folder as the active note
    Current,
    /// A fixed folder (`newFileFolderPath`)
    Folder,
    Root,
    /// Not configured or unrecognized
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkStyle {
    #[default]
    Wikilink,
    Markdown,
}

/// Digest of the vault's daily-note, attachment, and link conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub daily_folder: Option<String>,
    pub daily_format: Option<String>,
    pub daily_template: Option<String>,
    pub daily_plugin_enabled: bool,
    pub new_note_placement: NewNotePlacement,
    pub new_note_folder: Option<String>,
    pub attachment_folder: Option<String>,
    pub link_style: LinkStyle,
    pub templates_folder: Option<String>,
    /// Human-readable coherence problems, empty when the config is consistent
    pub warnings: Vec<String>,
}

impl Default for ConfigSummary {
    fn default() -> Self {
        Self {
            daily_folder: None,
            daily_format: None,
            daily_template: None,
            // Obsidian ships with the daily-notes core plugin on
            daily_plugin_enabled: true,
            new_note_placement: NewNotePlacement::default(),
            new_note_folder: None,
            attachment_folder: None,
            link_style: LinkStyle::default(),
            templates_folder: None,
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppConfig {
    new_file_location: Option<String>,
    new_file_folder_path: Option<String>,
    attachment_folder_path: Option<String>,
    use_markdown_links: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct DailyNotesConfig {
    folder: Option<String>,
    format: Option<String>,
    template: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TemplatesConfig {
    folder: Option<String>,
}

/// Older vaults store a list of enabled ids, newer ones an id -> enabled map
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorePlugins {
    List(Vec<String>),
    Map(HashMap<String, bool>),
}

impl CorePlugins {
    fn is_enabled(&self, id: &str) -> bool {
        match self {
            CorePlugins::List(ids) => ids.iter().any(|p| p == id),
            CorePlugins::Map(flags) => flags.get(id).copied().unwrap_or(false),
        }
    }
}

struct CachedSummary {
    fingerprint: String,
    summary: ConfigSummary,
}

/// Single-slot cache, owned by one store instance
pub struct ConfigCache {
    slot: Mutex<Option<CachedSummary>>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Cached summary if it was built for exactly this fingerprint
    fn lookup(&self, fingerprint: &str) -> Option<ConfigSummary> {
        let slot = self.slot.lock();
        slot.as_ref()
            .filter(|cached| cached.fingerprint == fingerprint)
            .map(|cached| cached.summary.clone())
    }

    fn store(&self, fingerprint: String, summary: ConfigSummary) {
        *self.slot.lock() = Some(CachedSummary {
            fingerprint,
            summary,
        });
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl VaultStore {
    /// Structural digest of the vault layout and its Obsidian config files
    pub fn fingerprint(&self) -> String {
        let mut folders: Vec<String> = self
            .list("")
            .into_iter()
            .filter(|e| e.is_dir)
            .map(|e| e.name)
            .collect();
        folders.sort();

        let files: Vec<String> = FINGERPRINT_FILES
            .iter()
            .map(|path| match self.metadata(path) {
                Some(meta) => {
                    let modified = meta
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                        .map(|d| d.as_millis())
                        .unwrap_or(0);
                    format!("{}:{}:{}", path, meta.len(), modified)
                }
                None => format!("{}:missing", path),
            })
            .collect();

        format!("{}|{}", folders.join(","), files.join("|"))
    }

    /// Summary of the vault's Obsidian config. The second value is `true` when it
    /// was served from cache. `force_refresh` always rebuilds.
    ///
    /// Only the parsed config is cached. Warnings about missing daily-note folders
    /// and templates depend on paths the fingerprint does not cover, so they are
    /// checked on every call.
    pub fn get_config_summary(&self, force_refresh: bool) -> (ConfigSummary, bool) {
        let fingerprint = self.fingerprint();
        let cached = if force_refresh {
            None
        } else {
            self.config_cache().lookup(&fingerprint)
        };
        let cache_hit = cached.is_some();

        let mut summary = match cached {
            Some(summary) => summary,
            None => {
                let summary = self.build_config_summary();
                log::debug!(
                    "[OBSIDIAN] Rebuilt config summary ({} config warnings)",
                    summary.warnings.len()
                );
                self.config_cache().store(fingerprint, summary.clone());
                summary
            }
        };
        let missing = self.missing_path_warnings(&summary);
        summary.warnings.extend(missing);
        (summary, cache_hit)
    }

    fn build_config_summary(&self) -> ConfigSummary {
        let app: AppConfig = self.read_json(APP_CONFIG).unwrap_or_default();
        let daily: DailyNotesConfig = self.read_json(DAILY_NOTES_CONFIG).unwrap_or_default();
        let templates: TemplatesConfig = self.read_json(TEMPLATES_CONFIG).unwrap_or_default();
        let core_plugins: Option<CorePlugins> = self.read_json(CORE_PLUGINS_CONFIG);

        let new_note_placement = app
            .new_file_location
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default();
        let link_style = if app.use_markdown_links.unwrap_or(false) {
            LinkStyle::Markdown
        } else {
            LinkStyle::Wikilink
        };
        let attachment_root = app
            .attachment_folder_path
            .as_deref()
            .map(|p| matches!(p.trim(), "" | "/"))
            .unwrap_or(false);

        let mut summary = ConfigSummary {
            daily_folder: non_blank(daily.folder),
            daily_format: non_blank(daily.format),
            daily_template: non_blank(daily.template),
            daily_plugin_enabled: core_plugins
                .as_ref()
                .map(|p| p.is_enabled(DAILY_NOTES_PLUGIN))
                .unwrap_or(true),
            new_note_placement,
            new_note_folder: non_blank(app.new_file_folder_path),
            attachment_folder: non_blank(app.attachment_folder_path),
            link_style,
            templates_folder: non_blank(templates.folder),
            warnings: Vec::new(),
        };

        if !summary.daily_plugin_enabled {
            summary
                .warnings
                .push("daily-notes core plugin is disabled".to_string());
        }
        if summary.new_note_placement == NewNotePlacement::Folder && summary.new_note_folder.is_none() {
            summary
                .warnings
                .push("new notes are placed in a folder but no folder is configured".to_string());
        }
        if attachment_root {
            summary
                .warnings
                .push("attachments are configured at the store root".to_string());
        }

        summary
    }

    /// Configured daily-note folder and template that are absent on disk
    fn missing_path_warnings(&self, summary: &ConfigSummary) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(folder) = summary.daily_folder.as_deref() {
            let folder = folder.trim_matches('/');
            if !folder.is_empty() && !self.metadata(folder).is_some_and(|m| m.is_dir()) {
                warnings.push(format!("daily-notes folder '{}' does not exist", folder));
            }
        }
        if let Some(template) = summary.daily_template.as_deref().and_then(template_file_path) {
            if !self.metadata(&template).is_some_and(|m| m.is_file()) {
                warnings.push(format!("daily-notes template '{}' does not exist", template));
            }
        }
        warnings
    }

    /// Parse a JSON config file. Missing or malformed files count as absent.
    fn read_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let raw = self.read(path)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("[OBSIDIAN] Ignoring malformed {}: {}", path, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, VaultStore) {
        let dir = tempdir().unwrap();
        let store = VaultStore::open_at(dir.path().join("vault")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_empty_vault_summary() {
        let (_dir, store) = store();
        let (summary, hit) = store.get_config_summary(false);
        assert!(!hit);
        assert_eq!(summary, ConfigSummary::default());
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn test_cache_hit_then_miss_on_new_folder() {
        let (_dir, store) = store();
        assert!(!store.get_config_summary(false).1);
        assert!(store.get_config_summary(false).1);

        fs::create_dir(store.root().join("projects")).unwrap();
        assert!(!store.get_config_summary(false).1);
        assert!(store.get_config_summary(false).1);
    }

    #[test]
    fn test_force_refresh_bypasses_cache() {
        let (_dir, store) = store();
        store.get_config_summary(false);
        assert!(!store.get_config_summary(true).1);
        assert!(store.get_config_summary(false).1);
    }

    #[test]
    fn test_hidden_folders_do_not_change_fingerprint() {
        let (_dir, store) = store();
        let before = store.fingerprint();
        fs::create_dir(store.root().join(".trash")).unwrap();
        assert_eq!(store.fingerprint(), before);
    }

    #[test]
    fn test_fingerprint_tracks_config_files() {
        let (_dir, store) = store();
        let before = store.fingerprint();
        assert!(before.contains(".obsidian/app.json:missing"));

        store.write(APP_CONFIG, "{}");
        let after = store.fingerprint();
        assert_ne!(before, after);
        assert!(after.contains(".obsidian/app.json:2:"));
    }

    #[test]
    fn test_full_summary() {
        let (_dir, store) = store();
        store.write(
            APP_CONFIG,
            r#"{"newFileLocation": "folder", "newFileFolderPath": "inbox",
                "attachmentFolderPath": "resources/attachments", "useMarkdownLinks": true}"#,
        );
        store.write(
            DAILY_NOTES_CONFIG,
            r#"{"folder": "daily", "format": "YYYY-MM-DD", "template": "templates/day"}"#,
        );
        store.write(TEMPLATES_CONFIG, r#"{"folder": "templates"}"#);
        store.write(CORE_PLUGINS_CONFIG, r#"["file-explorer", "daily-notes"]"#);
        store.write("templates/day.md", "# {{date}}");
        fs::create_dir(store.root().join("daily")).unwrap();

        let (summary, _) = store.get_config_summary(false);
        assert_eq!(summary.daily_folder.as_deref(), Some("daily"));
        assert_eq!(summary.daily_format.as_deref(), Some("YYYY-MM-DD"));
        assert_eq!(summary.daily_template.as_deref(), Some("templates/day"));
        assert!(summary.daily_plugin_enabled);
        assert_eq!(summary.new_note_placement, NewNotePlacement::Folder);
        assert_eq!(summary.new_note_folder.as_deref(), Some("inbox"));
        assert_eq!(summary.attachment_folder.as_deref(), Some("resources/attachments"));
        assert_eq!(summary.link_style, LinkStyle::Markdown);
        assert_eq!(summary.templates_folder.as_deref(), Some("templates"));
        assert!(summary.warnings.is_empty(), "{:?}", summary.warnings);
    }

    #[test]
    fn test_coherence_warnings() {
        let (_dir, store) = store();
        store.write(
            APP_CONFIG,
            r#"{"newFileLocation": "folder", "attachmentFolderPath": "/"}"#,
        );
        store.write(DAILY_NOTES_CONFIG, r#"{"folder": "journal", "template": "missing"}"#);
        store.write(CORE_PLUGINS_CONFIG, r#"{"daily-notes": false, "graph": true}"#);

        let (summary, _) = store.get_config_summary(false);
        assert!(!summary.daily_plugin_enabled);
        assert_eq!(
            summary.warnings,
            vec![
                "daily-notes core plugin is disabled".to_string(),
                "new notes are placed in a folder but no folder is configured".to_string(),
                "attachments are configured at the store root".to_string(),
                "daily-notes folder 'journal' does not exist".to_string(),
                "daily-notes template 'missing.md' does not exist".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_path_warnings_clear_without_rebuild() {
        let (_dir, store) = store();
        store.write(
            DAILY_NOTES_CONFIG,
            r#"{"folder": "notes/daily", "template": "templates/day"}"#,
        );
        store.write("templates/other.md", "");
        store.write("notes/readme.md", "");

        let (summary, _) = store.get_config_summary(false);
        assert_eq!(
            summary.warnings,
            vec![
                "daily-notes folder 'notes/daily' does not exist".to_string(),
                "daily-notes template 'templates/day.md' does not exist".to_string(),
            ]
        );

        store.write("templates/day.md", "# {{title}}");
        fs::create_dir(store.root().join("notes/daily")).unwrap();
        let (summary, hit) = store.get_config_summary(false);
        assert!(hit);
        assert!(summary.warnings.is_empty(), "{:?}", summary.warnings);
    }

    #[test]
    fn test_template_with_extension_checked_as_is() {
        let (_dir, store) = store();
        store.write(DAILY_NOTES_CONFIG, r#"{"template": "templates/day.txt"}"#);
        store.write("templates/day.txt", "{{date}}");

        let (summary, _) = store.get_config_summary(false);
        assert!(summary.warnings.is_empty(), "{:?}", summary.warnings);

        store.write(DAILY_NOTES_CONFIG, r#"{"template": "templates/gone.txt"}"#);
        let (summary, _) = store.get_config_summary(false);
        assert_eq!(
            summary.warnings,
            vec!["daily-notes template 'templates/gone.txt' does not exist".to_string()]
        );
    }

    #[test]
    fn test_malformed_json_is_absent() {
        let (_dir, store) = store();
        store.write(APP_CONFIG, "{ not json");
        store.write(DAILY_NOTES_CONFIG, r#"{"folder": 42}"#);
        store.write(CORE_PLUGINS_CONFIG, "\"daily-notes\"");

        let (summary, _) = store.get_config_summary(false);
        assert_eq!(summary.new_note_placement, NewNotePlacement::Unknown);
        assert_eq!(summary.daily_folder, None);
        assert!(summary.daily_plugin_enabled);
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn test_unknown_placement_value() {
        let (_dir, store) = store();
        store.write(APP_CONFIG, r#"{"newFileLocation": "sideways"}"#);
        let (summary, _) = store.get_config_summary(false);
        assert_eq!(summary.new_note_placement, NewNotePlacement::Unknown);
        assert_eq!(summary.new_note_placement.as_ref(), "unknown");
    }

    #[test]
    fn test_concurrent_summaries_agree() {
        let (_dir, store) = store();
        store.write(DAILY_NOTES_CONFIG, r#"{"folder": "daily"}"#);

        let results: Vec<ConfigSummary> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| store.get_config_summary(false).0))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|s| s.daily_folder.as_deref() == Some("daily")));
        assert!(store.get_config_summary(false).1);
    }
}
