use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;

use vault_store::{SearchMode, StoreAction, StoreConfig, StoreLayout, VaultStore, dispatch};

#[derive(Parser)]
#[command(name = "vault-store")]
#[command(about = "Sandboxed markdown vault with daily notes", long_about = None)]
#[command(version)]
struct Cli {
    /// Store root directory (default: $VAULT_ROOT, then ./vault)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Use the workspace folder layout (journal/ instead of daily/)
    #[arg(long, global = true)]
    workspace: bool,

    /// Print the full result as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a document
    Read { path: String },

    /// Replace a document's content
    Write { path: String, content: String },

    /// Append to a document, creating it if missing
    Append { path: String, content: String },

    /// List a folder (root when omitted)
    List {
        #[arg(default_value = "")]
        folder: String,

        #[arg(short, long)]
        recursive: bool,
    },

    /// Case-insensitive search by name and/or content
    Search {
        query: String,

        #[arg(short, long, default_value = "")]
        folder: String,

        /// name, content, or both
        #[arg(short, long, default_value = "both")]
        mode: SearchMode,
    },

    /// Move or rename a file or folder
    Move { from: String, to: String },

    /// File count, total size, and last modification
    Stats,

    /// Add a timeline entry to today's note, or print a daily note
    Daily {
        /// Entry text; prints the note when omitted
        text: Option<String>,

        /// Date to print (YYYY-MM-DD), default today
        #[arg(long, conflicts_with = "text")]
        date: Option<NaiveDate>,
    },

    /// Set a metric in today's Tracking section
    Track { metric: String, value: String },

    /// Notes linking to a target via [[wikilinks]]
    Backlinks {
        target: String,

        #[arg(short, long, default_value = "")]
        folder: String,
    },

    /// List tags, or notes carrying one tag
    Tags {
        tag: Option<String>,

        #[arg(short, long, default_value = "")]
        folder: String,
    },

    /// Summarize the vault's .obsidian configuration
    Config {
        /// Ignore the cached summary
        #[arg(long)]
        refresh: bool,
    },

    /// Create the standard folder layout
    Init,
}

impl Commands {
    fn into_action(self) -> StoreAction {
        match self {
            Commands::Read { path } => StoreAction::Read { path },
            Commands::Write { path, content } => StoreAction::Write { path, content },
            Commands::Append { path, content } => StoreAction::Append { path, content },
            Commands::List { folder, recursive } => StoreAction::List { folder, recursive },
            Commands::Search {
                query,
                folder,
                mode,
            } => StoreAction::Search {
                query,
                folder,
                mode,
            },
            Commands::Move { from, to } => StoreAction::Move { from, to },
            Commands::Stats => StoreAction::Stats,
            Commands::Daily {
                text: Some(text), ..
            } => StoreAction::AppendDaily { text },
            Commands::Daily { text: None, date } => StoreAction::ReadDaily { date },
            Commands::Track { metric, value } => StoreAction::UpsertTracking { metric, value },
            Commands::Backlinks { target, folder } => StoreAction::Backlinks { target, folder },
            Commands::Tags { tag, folder } => StoreAction::Tags { tag, folder },
            Commands::Config { refresh } => StoreAction::ConfigSummary {
                force_refresh: refresh,
            },
            Commands::Init => StoreAction::Init,
        }
    }
}

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let mut config = StoreConfig::from_env();
    if let Some(root) = cli.root {
        config.root = root;
    }
    if cli.workspace {
        // Keep an explicit VAULT_DAILY_FOLDER over the layout's default
        let daily_override = (config.daily_folder != config.layout.daily)
            .then(|| config.daily_folder.clone());
        config = config.with_layout(StoreLayout::workspace());
        if let Some(folder) = daily_override {
            config.daily_folder = folder;
        }
    }

    let store = match VaultStore::open(config) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to open store: {}", e);
            eprintln!("Failed to open store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = dispatch(&store, cli.command.into_action());

    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Failed to encode result: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }

    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
