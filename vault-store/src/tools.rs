//! Action boundary for collaborators (chat tools, the CLI).
//!
//! A single `action`-tagged request type covers every collaborator-facing store
//! operation. Results never carry the cause of a failure: a path that was
//! blocked, missing, or unwritable reports the same message.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::notes::{Entry, SearchMode, VaultStore};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StoreAction {
    Read {
        path: String,
    },
    Write {
        path: String,
        content: String,
    },
    Append {
        path: String,
        content: String,
    },
    List {
        #[serde(default)]
        folder: String,
        #[serde(default)]
        recursive: bool,
    },
    Search {
        query: String,
        #[serde(default)]
        folder: String,
        #[serde(default)]
        mode: SearchMode,
    },
    Move {
        from: String,
        to: String,
    },
    Stats,
    /// Read a daily note (today when no date is given)
    ReadDaily {
        date: Option<NaiveDate>,
    },
    AppendDaily {
        text: String,
    },
    UpsertTracking {
        metric: String,
        value: String,
    },
    ConfigSummary {
        #[serde(default)]
        force_refresh: bool,
    },
    Backlinks {
        target: String,
        #[serde(default)]
        folder: String,
    },
    /// List all tags, or the documents carrying `tag`
    Tags {
        tag: Option<String>,
        #[serde(default)]
        folder: String,
    },
    Init,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Parse raw JSON parameters and dispatch them
pub fn dispatch_json(store: &VaultStore, params: Value) -> ActionResult {
    match serde_json::from_value::<StoreAction>(params) {
        Ok(action) => dispatch(store, action),
        Err(e) => ActionResult::error(format!("Invalid parameters: {}", e)),
    }
}

pub fn dispatch(store: &VaultStore, action: StoreAction) -> ActionResult {
    match action {
        StoreAction::Read { path } => match store.read(&path) {
            Some(content) => ActionResult::success(content).with_data(json!({ "path": path })),
            None => ActionResult::error(format!("Could not read `{}`", path)),
        },

        StoreAction::Write { path, content } => {
            if store.write(&path, &content) {
                ActionResult::success(format!("Wrote `{}` ({} bytes)", path, content.len()))
                    .with_data(json!({ "path": path }))
            } else {
                ActionResult::error(format!("Could not write `{}`", path))
            }
        }

        StoreAction::Append { path, content } => {
            if store.append(&path, &content) {
                ActionResult::success(format!("Appended to `{}`", path))
                    .with_data(json!({ "path": path }))
            } else {
                ActionResult::error(format!("Could not append to `{}`", path))
            }
        }

        StoreAction::List { folder, recursive } => {
            let entries = if recursive {
                store.recursive_list(&folder)
            } else {
                store.list(&folder)
            };
            if entries.is_empty() {
                return ActionResult::success(format!("No entries in `{}`", display_folder(&folder)))
                    .with_data(json!([]));
            }
            let mut output = format!(
                "## {} ({} entries)\n\n",
                display_folder(&folder),
                entries.len()
            );
            output.push_str(&entry_lines(&entries));
            ActionResult::success(output).with_data(json!(entries))
        }

        StoreAction::Search {
            query,
            folder,
            mode,
        } => {
            let query = query.trim();
            if query.is_empty() {
                return ActionResult::error("Query is required for search action.");
            }
            let hits = store.search(query, &folder, mode);
            if hits.is_empty() {
                return ActionResult::success(format!("No matches for \"{}\"", query))
                    .with_data(json!([]));
            }
            let mut output = format!(
                "## Search Results\n**Query:** \"{}\" ({})\n**Found:** {} result(s)\n\n",
                query,
                mode.as_ref(),
                hits.len()
            );
            output.push_str(&entry_lines(&hits));
            ActionResult::success(output).with_data(json!(hits))
        }

        StoreAction::Move { from, to } => {
            if store.move_path(&from, &to) {
                ActionResult::success(format!("Moved `{}` to `{}`", from, to))
                    .with_data(json!({ "from": from, "to": to }))
            } else {
                ActionResult::error(format!("Could not move `{}` to `{}`", from, to))
            }
        }

        StoreAction::Stats => {
            let stats = store.stats();
            let last = stats
                .last_modified
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            ActionResult::success(format!(
                "{} entries, {} bytes, last modified {}",
                stats.total_files, stats.total_size, last
            ))
            .with_data(json!(stats))
        }

        StoreAction::ReadDaily { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let path = store.daily_note_path(date);
            match store.read(&path) {
                Some(content) => ActionResult::success(content).with_data(json!({ "path": path })),
                None => ActionResult::error(format!("No daily note for {}", date)),
            }
        }

        StoreAction::AppendDaily { text } => {
            if store.append_to_daily(&text) {
                ActionResult::success("Added to today's timeline")
            } else {
                ActionResult::error("Could not update today's daily note")
            }
        }

        StoreAction::UpsertTracking { metric, value } => {
            if store.upsert_daily_tracking(&metric, &value) {
                ActionResult::success(format!("Tracked {}: {}", metric.trim(), value.trim()))
            } else {
                ActionResult::error("Could not update today's daily note")
            }
        }

        StoreAction::ConfigSummary { force_refresh } => {
            let (summary, cached) = store.get_config_summary(force_refresh);
            let mut output = format!(
                "Daily notes: folder `{}`, format `{}`, plugin {}\nNew notes: {}\nLinks: {}",
                summary.daily_folder.as_deref().unwrap_or("(default)"),
                summary.daily_format.as_deref().unwrap_or("(default)"),
                if summary.daily_plugin_enabled { "enabled" } else { "disabled" },
                summary.new_note_placement.as_ref(),
                summary.link_style.as_ref(),
            );
            for warning in &summary.warnings {
                output.push_str(&format!("\nWarning: {}", warning));
            }
            ActionResult::success(output).with_data(json!({
                "summary": summary,
                "cached": cached,
            }))
        }

        StoreAction::Backlinks { target, folder } => {
            let hits = store.find_backlinks(&target, &folder);
            if hits.is_empty() {
                return ActionResult::success(format!("No notes link to [[{}]]", target.trim()))
                    .with_data(json!([]));
            }
            let mut output = format!("## Backlinks to [[{}]]\n\n", target.trim());
            output.push_str(&entry_lines(&hits));
            ActionResult::success(output).with_data(json!(hits))
        }

        StoreAction::Tags { tag: Some(tag), folder } => {
            let hits = store.search_by_tag(&tag, &folder);
            if hits.is_empty() {
                return ActionResult::success(format!("No notes tagged {}", tag.trim()))
                    .with_data(json!([]));
            }
            let mut output = format!("## Notes tagged {}\n\n", tag.trim());
            output.push_str(&entry_lines(&hits));
            ActionResult::success(output).with_data(json!(hits))
        }

        StoreAction::Tags { tag: None, folder } => {
            let tags = store.list_tags(&folder);
            if tags.is_empty() {
                return ActionResult::success("No tags found").with_data(json!([]));
            }
            let mut output = format!("## Tags ({})\n\n", tags.len());
            for (tag, count) in &tags {
                output.push_str(&format!("- {} ({})\n", tag, count));
            }
            let data: Vec<Value> = tags
                .iter()
                .map(|(tag, count)| json!({ "tag": tag, "count": count }))
                .collect();
            ActionResult::success(output).with_data(Value::Array(data))
        }

        StoreAction::Init => {
            if store.ensure_layout() {
                ActionResult::success(format!(
                    "Layout ready: {}",
                    store.config().layout.folders().join(", ")
                ))
            } else {
                ActionResult::error("Could not create the store layout")
            }
        }
    }
}

fn display_folder(folder: &str) -> &str {
    if folder.trim().is_empty() { "/" } else { folder }
}

fn entry_lines(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|e| {
            if e.is_dir {
                format!("- `{}/`\n", e.path)
            } else {
                format!("- `{}` ({} bytes)\n", e.path, e.size)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, VaultStore) {
        let dir = tempdir().unwrap();
        let store = VaultStore::open_at(dir.path().join("vault")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_parse_actions() {
        let action: StoreAction =
            serde_json::from_value(json!({"action": "search", "query": "rust"})).unwrap();
        assert_eq!(
            action,
            StoreAction::Search {
                query: "rust".to_string(),
                folder: String::new(),
                mode: SearchMode::Both,
            }
        );

        let action: StoreAction = serde_json::from_value(
            json!({"action": "read_daily", "date": "2025-03-15"}),
        )
        .unwrap();
        assert_eq!(
            action,
            StoreAction::ReadDaily {
                date: NaiveDate::from_ymd_opt(2025, 3, 15)
            }
        );

        let action: StoreAction = serde_json::from_value(json!({"action": "stats"})).unwrap();
        assert_eq!(action, StoreAction::Stats);
    }

    #[test]
    fn test_invalid_parameters() {
        let (_dir, store) = store();
        let result = dispatch_json(&store, json!({"action": "explode"}));
        assert!(!result.success);
        assert!(result.message.starts_with("Invalid parameters:"));

        let result = dispatch_json(&store, json!({"action": "read"}));
        assert!(!result.success);
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, store) = store();
        let result = dispatch_json(
            &store,
            json!({"action": "write", "path": "inbox/a.md", "content": "hello"}),
        );
        assert!(result.success, "{}", result.message);

        let result = dispatch_json(&store, json!({"action": "read", "path": "inbox/a.md"}));
        assert!(result.success);
        assert_eq!(result.message, "hello");
    }

    #[test]
    fn test_failures_are_indistinguishable() {
        let (_dir, store) = store();
        let missing = dispatch(
            &store,
            StoreAction::Read {
                path: "nope.md".to_string(),
            },
        );
        let escaped = dispatch(
            &store,
            StoreAction::Read {
                path: "../nope.md".to_string(),
            },
        );
        assert!(!missing.success && !escaped.success);
        assert_eq!(missing.data, None);
        assert_eq!(
            missing.message.replace("nope.md", ""),
            escaped.message.replace("../nope.md", "")
        );
    }

    #[test]
    fn test_list_and_search_data() {
        let (_dir, store) = store();
        store.write("projects/plan.md", "ship it #work");
        store.write("inbox/idea.md", "see [[plan]]");

        let result = dispatch(
            &store,
            StoreAction::List {
                folder: String::new(),
                recursive: true,
            },
        );
        assert!(result.success);
        assert_eq!(result.data.unwrap().as_array().unwrap().len(), 4);
        assert!(result.message.contains("- `inbox/`"));

        let result = dispatch_json(
            &store,
            json!({"action": "search", "query": "ship", "mode": "content"}),
        );
        assert!(result.success);
        assert_eq!(result.data.unwrap()[0]["path"], "projects/plan.md");

        let result = dispatch_json(&store, json!({"action": "search", "query": "  "}));
        assert!(!result.success);
    }

    #[test]
    fn test_backlinks_and_tags() {
        let (_dir, store) = store();
        store.write("projects/plan.md", "ship it #work");
        store.write("inbox/idea.md", "see [[Plan]] #work #idea");

        let result = dispatch_json(&store, json!({"action": "backlinks", "target": "plan"}));
        assert_eq!(result.data.unwrap()[0]["path"], "inbox/idea.md");

        let result = dispatch_json(&store, json!({"action": "tags"}));
        let data = result.data.unwrap();
        assert_eq!(data[0], json!({"tag": "#work", "count": 2}));

        let result = dispatch_json(&store, json!({"action": "tags", "tag": "idea"}));
        assert_eq!(result.data.unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_daily_actions() {
        let (_dir, store) = store();
        let result = dispatch_json(&store, json!({"action": "append_daily", "text": "standup"}));
        assert!(result.success);
        let result = dispatch_json(
            &store,
            json!({"action": "upsert_tracking", "metric": "mood", "value": "7"}),
        );
        assert!(result.success);

        let result = dispatch_json(&store, json!({"action": "read_daily"}));
        assert!(result.success);
        assert!(result.message.contains("standup"));
        assert!(result.message.contains("- mood: 7"));

        let result = dispatch_json(
            &store,
            json!({"action": "upsert_tracking", "metric": "mood", "value": ""}),
        );
        assert!(!result.success);
    }

    #[test]
    fn test_config_summary_reports_cache() {
        let (_dir, store) = store();
        let first = dispatch_json(&store, json!({"action": "config_summary"}));
        let second = dispatch_json(&store, json!({"action": "config_summary"}));
        assert_eq!(first.data.unwrap()["cached"], false);
        assert_eq!(second.data.unwrap()["cached"], true);

        let forced = dispatch_json(&store, json!({"action": "config_summary", "force_refresh": true}));
        assert_eq!(forced.data.unwrap()["cached"], false);
    }

    #[test]
    fn test_init_and_stats() {
        let (_dir, store) = store();
        assert!(dispatch(&store, StoreAction::Init).success);
        let result = dispatch(&store, StoreAction::Stats);
        assert!(result.success);
        assert_eq!(result.data.unwrap()["total_files"], 6);
    }
}
