//! Daily notes: one markdown file per day with a Timeline and a Tracking section.
//!
//! Folder, file-name pattern, and template come from `.obsidian/daily-notes.json`
//! when set there, else from the service defaults in [`StoreConfig`]. All file
//! access goes through the sandboxed [`VaultStore`] operations.

pub mod date_format;
pub mod sections;

use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

use crate::config::{StoreConfig, defaults};
use crate::error::StoreError;
use crate::notes::{VaultStore, log_failure};
use crate::obsidian::ConfigSummary;

pub use date_format::format_date;

/// Effective daily-note settings for one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyNoteSettings {
    /// Store-relative folder, no leading or trailing slash; may be empty (root)
    pub folder: String,
    pub format: String,
    /// Store-relative template path as configured
    pub template: Option<String>,
}

impl DailyNoteSettings {
    /// Merge vault config over service defaults; blank fields fall back
    pub fn resolve(config: &StoreConfig, summary: &ConfigSummary) -> Self {
        let folder = non_blank(summary.daily_folder.as_deref())
            .unwrap_or(config.daily_folder.as_str())
            .trim_matches('/')
            .to_string();
        let format = non_blank(summary.daily_format.as_deref())
            .unwrap_or(config.daily_format.as_str())
            .to_string();
        let template = non_blank(summary.daily_template.as_deref())
            .or_else(|| non_blank(config.daily_template.as_deref()))
            .map(str::to_string);

        Self {
            folder,
            format,
            template,
        }
    }

    /// Store-relative path of the note for `date`
    pub fn note_path(&self, date: &NaiveDateTime) -> String {
        let name = format_date(date, &self.format);
        if self.folder.is_empty() {
            format!("{}.md", name)
        } else {
            format!("{}/{}.md", self.folder, name)
        }
    }

    /// Template path with Obsidian's implicit `.md` extension filled in
    pub fn template_path(&self) -> Option<String> {
        template_file_path(self.template.as_deref()?)
    }
}

/// Store-relative template file for a configured template name. `None` when blank.
pub fn template_file_path(template: &str) -> Option<String> {
    let template = template.trim().trim_start_matches('/');
    if template.is_empty() {
        None
    } else if Path::new(template).extension().is_some() {
        Some(template.to_string())
    } else {
        Some(format!("{}.md", template))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

static TEMPLATE_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(date|time|title)\s*(?::([^}]*))?\}\}").unwrap()
});

/// Expand `{{date}}`, `{{time}}`, `{{title}}` and the `{{date:PATTERN}}` /
/// `{{time:PATTERN}}` forms the way Obsidian's core templates plugin does
pub fn render_template(template: &str, now: &NaiveDateTime, date_format: &str) -> String {
    TEMPLATE_VAR_RE
        .replace_all(template, |cap: &Captures| {
            let custom = cap.get(2).map(|m| m.as_str().trim()).filter(|p| !p.is_empty());
            match (&cap[1], custom) {
                ("title", _) => format_date(now, date_format),
                ("date", Some(pattern)) | ("time", Some(pattern)) => format_date(now, pattern),
                ("date", None) => format_date(now, date_format),
                _ => format_date(now, "HH:mm"),
            }
        })
        .into_owned()
}

/// Built-in note used when no template is configured
pub fn skeleton(title: &str, metrics: &[String]) -> String {
    let mut out = format!(
        "# {}\n\n{}\n\n{}\n",
        title,
        defaults::TIMELINE_HEADING,
        defaults::TRACKING_HEADING
    );
    for metric in metrics {
        out.push_str(&sections::format_tracking_line(metric, ""));
        out.push('\n');
    }
    out
}

/// Collapse multi-line input into one line so it cannot break section structure
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl VaultStore {
    /// Current daily-note settings (reads the config cache)
    pub fn daily_settings(&self) -> DailyNoteSettings {
        let (summary, _) = self.get_config_summary(false);
        DailyNoteSettings::resolve(self.config(), &summary)
    }

    pub fn daily_note_path(&self, date: NaiveDate) -> String {
        let settings = self.daily_settings();
        date.and_hms_opt(0, 0, 0)
            .map(|midnight| settings.note_path(&midnight))
            .unwrap_or_default()
    }

    /// Read the daily note for `date`, if it exists
    pub fn read_daily(&self, date: NaiveDate) -> Option<String> {
        self.read(&self.daily_note_path(date))
    }

    /// Append `- HH:MM <text>` to today's Timeline, creating the note if needed
    pub fn append_to_daily(&self, text: &str) -> bool {
        self.append_to_daily_at(text, Local::now().naive_local())
    }

    pub fn append_to_daily_at(&self, text: &str, now: NaiveDateTime) -> bool {
        let text = single_line(text);
        if text.is_empty() {
            log::debug!("[DAILY] Rejected blank timeline entry");
            return false;
        }

        let settings = self.daily_settings();
        let path = settings.note_path(&now);
        let Some(doc) = self.load_or_bootstrap(&path, &settings, &now) else {
            return false;
        };
        let doc = sections::ensure_section(&doc, defaults::TIMELINE_HEADING);
        let doc = sections::ensure_section(&doc, defaults::TRACKING_HEADING);

        let entry = format!("- {} {}", format_date(&now, "HH:mm"), text);
        let doc = sections::append_line_to_section(&doc, defaults::TIMELINE_HEADING, &entry);

        let ok = self.write(&path, &doc);
        if ok {
            log::debug!("[DAILY] Appended timeline entry to {}", path);
        }
        ok
    }

    /// Set `metric: value` in today's Tracking section, creating the note if needed
    pub fn upsert_daily_tracking(&self, metric: &str, value: &str) -> bool {
        self.upsert_daily_tracking_at(metric, value, Local::now().naive_local())
    }

    pub fn upsert_daily_tracking_at(&self, metric: &str, value: &str, now: NaiveDateTime) -> bool {
        let metric = single_line(metric);
        let value = single_line(value);
        if metric.is_empty() || value.is_empty() {
            log::debug!("[DAILY] Rejected tracking update with blank metric or value");
            return false;
        }
        // The key is everything before the first colon when parsed back
        if metric.contains(':') {
            log::debug!("[DAILY] Rejected tracking metric containing ':': {:?}", metric);
            return false;
        }

        let settings = self.daily_settings();
        let path = settings.note_path(&now);
        let Some(doc) = self.load_or_bootstrap(&path, &settings, &now) else {
            return false;
        };
        let doc = sections::ensure_section(&doc, defaults::TIMELINE_HEADING);
        let doc = sections::upsert_tracking_line(&doc, defaults::TRACKING_HEADING, &metric, &value);

        let ok = self.write(&path, &doc);
        if ok {
            log::debug!("[DAILY] Tracked {} = {} in {}", metric, value, path);
        }
        ok
    }

    /// Existing note content, or fresh content when the note does not exist yet.
    /// `None` when the note exists but cannot be read, so it is never overwritten.
    fn load_or_bootstrap(
        &self,
        path: &str,
        settings: &DailyNoteSettings,
        now: &NaiveDateTime,
    ) -> Option<String> {
        match self.try_read(path) {
            Ok(existing) => Some(existing),
            Err(StoreError::NotFound) => {
                log::info!("[DAILY] Creating daily note {}", path);
                Some(self.bootstrap_daily(settings, now))
            }
            Err(e) => {
                log_failure("load daily note", path, &e);
                None
            }
        }
    }

    /// Initial content for a new daily note: the template if one is configured and
    /// non-blank (with both sections guaranteed), otherwise the built-in skeleton
    fn bootstrap_daily(&self, settings: &DailyNoteSettings, now: &NaiveDateTime) -> String {
        let template = settings
            .template_path()
            .and_then(|path| self.read(&path))
            .filter(|content| !content.trim().is_empty());

        match template {
            Some(template) => {
                let doc = render_template(&template, now, &settings.format);
                let doc = sections::ensure_section(&doc, defaults::TIMELINE_HEADING);
                sections::ensure_section(&doc, defaults::TRACKING_HEADING)
            }
            None => skeleton(
                &format_date(now, &settings.format),
                &self.config().tracking_metrics,
            ),
        }
    }
}
