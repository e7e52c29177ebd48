use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::scrapers::zap::Timeouts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Supabase over its REST API
    Supabase,
    /// JSON file in, JSON files out
    Local,
}

#[derive(Debug, Parser)]
#[command(name = "zap-scout")]
#[command(about = "Find re-advertisements of tracked properties on Zap Imóveis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Where reference properties come from and results go
    #[arg(long, env = "ZAP_SCOUT_STORE", value_enum, default_value = "supabase", global = true)]
    pub store: StoreKind,

    #[arg(long, env = "SUPABASE_URL", global = true)]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true, global = true)]
    pub supabase_service_key: Option<String>,

    /// Reference properties (JSON array) for the local store
    #[arg(long, env = "ZAP_SCOUT_PROPERTIES", default_value = "properties.json", global = true)]
    pub properties_file: PathBuf,

    /// Run results for the local store
    #[arg(long, env = "ZAP_SCOUT_OUTPUT_DIR", default_value = "results", global = true)]
    pub output_dir: PathBuf,

    #[arg(long, env = "ZAP_SCOUT_HEADLESS", default_value_t = true, action = clap::ArgAction::Set, global = true)]
    pub headless: bool,

    /// Ceiling for each field read on a card
    #[arg(long, env = "ZAP_SCOUT_FIELD_TIMEOUT_MS", default_value_t = 5_000, global = true)]
    pub field_timeout_ms: u64,

    /// Save each results page here for `replay`
    #[arg(long, env = "ZAP_SCOUT_DUMP_HTML", global = true)]
    pub dump_html: Option<PathBuf>,

    /// Maximum properties a run processes
    #[arg(long, env = "ZAP_SCOUT_LIMIT", default_value_t = 10, global = true)]
    pub limit: usize,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "ZAP_SCOUT_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Scrape and match active reference properties
    Run,
    /// Print the search URL for a reference property
    Url { dna_id: String },
    /// Extract and score cards from a saved results page
    Replay {
        html: PathBuf,
        #[arg(long)]
        dna_id: String,
    },
}

impl Cli {
    /// `run` when no subcommand is given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            field_read: Duration::from_millis(self.field_timeout_ms),
            ..Timeouts::default()
        }
    }
}
