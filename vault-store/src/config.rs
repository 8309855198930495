use std::env;
use std::path::PathBuf;

/// Environment variable names - single source of truth
pub mod env_vars {
    /// Directory the store is sandboxed beneath
    pub const ROOT: &str = "VAULT_ROOT";
    /// Folder naming preset: "vault" (default) or "workspace"
    pub const LAYOUT: &str = "VAULT_LAYOUT";
    /// Service defaults for daily notes, used when the vault config leaves a field blank
    pub const DAILY_FOLDER: &str = "VAULT_DAILY_FOLDER";
    pub const DAILY_FORMAT: &str = "VAULT_DAILY_FORMAT";
    pub const DAILY_TEMPLATE: &str = "VAULT_DAILY_TEMPLATE";
}

/// Default values
pub mod defaults {
    pub const ROOT: &str = "vault";
    pub const DAILY_FORMAT: &str = "YYYY-MM-DD";
    pub const TIMELINE_HEADING: &str = "## Timeline";
    pub const TRACKING_HEADING: &str = "## Tracking";
    pub const TRACKING_METRICS: &[&str] = &["mood", "energy", "sleep"];
}

/// Directory naming convention for a store.
///
/// Vault and workspace flavours only differ in what the daily folder is
/// called; everything else about the engine is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub inbox: String,
    pub daily: String,
    pub projects: String,
    pub areas: String,
    pub resources: String,
    pub archive: String,
}

impl StoreLayout {
    pub fn vault() -> Self {
        Self {
            inbox: "inbox".to_string(),
            daily: "daily".to_string(),
            projects: "projects".to_string(),
            areas: "areas".to_string(),
            resources: "resources".to_string(),
            archive: "archive".to_string(),
        }
    }

    pub fn workspace() -> Self {
        Self {
            daily: "journal".to_string(),
            ..Self::vault()
        }
    }

    /// Parse a preset name, defaulting to the vault layout if unrecognized
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "workspace" => Self::workspace(),
            _ => Self::vault(),
        }
    }

    /// All folders in creation order
    pub fn folders(&self) -> Vec<&str> {
        vec![
            self.inbox.as_str(),
            self.daily.as_str(),
            self.projects.as_str(),
            self.areas.as_str(),
            self.resources.as_str(),
            self.archive.as_str(),
        ]
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self::vault()
    }
}

/// Configuration for a single sandboxed store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store root; canonicalized when the store is opened
    pub root: PathBuf,
    pub layout: StoreLayout,
    /// Fallback daily-note folder (default: the layout's daily folder)
    pub daily_folder: String,
    /// Fallback date pattern for daily-note file names
    pub daily_format: String,
    /// Fallback template path, relative to the root
    pub daily_template: Option<String>,
    /// Placeholder metrics written into a fresh Tracking section
    pub tracking_metrics: Vec<String>,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let layout = StoreLayout::vault();
        Self {
            root: root.into(),
            daily_folder: layout.daily.clone(),
            layout,
            daily_format: defaults::DAILY_FORMAT.to_string(),
            daily_template: None,
            tracking_metrics: defaults::TRACKING_METRICS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }

    /// Swap the folder layout; the daily fallback follows the new layout
    pub fn with_layout(mut self, layout: StoreLayout) -> Self {
        self.daily_folder = layout.daily.clone();
        self.layout = layout;
        self
    }

    pub fn with_daily_format(mut self, format: impl Into<String>) -> Self {
        self.daily_format = format.into();
        self
    }

    pub fn with_daily_template(mut self, template: impl Into<String>) -> Self {
        self.daily_template = Some(template.into());
        self
    }

    pub fn from_env() -> Self {
        let root = non_blank_var(env_vars::ROOT).unwrap_or_else(|| defaults::ROOT.to_string());
        let layout = non_blank_var(env_vars::LAYOUT)
            .map(|name| StoreLayout::from_name(&name))
            .unwrap_or_default();

        let mut config = Self::new(root).with_layout(layout);
        if let Some(folder) = non_blank_var(env_vars::DAILY_FOLDER) {
            config.daily_folder = folder;
        }
        if let Some(format) = non_blank_var(env_vars::DAILY_FORMAT) {
            config.daily_format = format;
        }
        config.daily_template = non_blank_var(env_vars::DAILY_TEMPLATE);
        config
    }
}

/// Read an env var, treating unset and whitespace-only the same
fn non_blank_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
