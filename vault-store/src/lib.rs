//! Sandboxed markdown document store with Obsidian-compatible daily notes.
//!
//! Every path a caller hands in is confined to one root directory. Reads and
//! writes that would leave it, through `..` or through a symlink, fail the same
//! way a missing file does.

pub mod config;
pub mod daily;
pub mod error;
pub mod notes;
pub mod obsidian;
pub mod sandbox;
pub mod tools;

pub use config::{StoreConfig, StoreLayout};
pub use daily::DailyNoteSettings;
pub use error::{StoreError, StoreResult};
pub use notes::{Entry, SearchMode, StoreStats, VaultStore, WikiLink};
pub use obsidian::{ConfigSummary, LinkStyle, NewNotePlacement};
pub use tools::{ActionResult, StoreAction, dispatch, dispatch_json};
