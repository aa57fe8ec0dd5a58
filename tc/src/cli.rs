//! CLI command definitions and session file handling

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ChatTurn, DestinationType, Place, TripResult};

/// tripcraft - conversational travel-itinerary planner
#[derive(Parser)]
#[command(
    name = "tc",
    about = "Conversational travel-itinerary planner",
    version,
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan a trip from a natural-language request
    Plan {
        /// The trip request, e.g. "3 days in Hanoi for food and coffee"
        text: String,

        /// Apply the premium-tier day cap
        #[arg(long)]
        premium: bool,

        /// Session file to create for follow-up turns
        #[arg(short, long)]
        session: Option<PathBuf>,
    },

    /// Continue a planned trip with a question or modification
    Continue {
        /// The follow-up instruction or question
        instruction: String,

        /// Session file written by a previous turn
        #[arg(short, long)]
        session: PathBuf,

        /// Apply the premium-tier day cap
        #[arg(long)]
        premium: bool,
    },
}

/// On-disk session state between turns
///
/// The core is stateless; this file is the caller-side persistence that gets
/// handed back on every follow-up turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    pub original_request: String,
    pub destination: String,
    pub destination_type: DestinationType,
    pub interests: String,
    pub days: u32,
    pub places: Vec<Place>,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

impl SessionFile {
    /// Build the initial session from a fresh generation turn
    pub fn from_result(original_request: impl Into<String>, result: &TripResult) -> Self {
        debug!("SessionFile::from_result: called");
        Self {
            original_request: original_request.into(),
            destination: result.destination.clone(),
            destination_type: result.destination_type,
            interests: result.interests.clone(),
            days: result.days,
            places: result.places.clone(),
            chat_history: Vec::new(),
        }
    }

    /// Fold a follow-up turn into the session
    pub fn absorb_turn(&mut self, instruction: &str, result: &TripResult) {
        debug!("SessionFile::absorb_turn: called");
        self.places = result.places.clone();
        self.chat_history.push(ChatTurn::new("user", instruction));
        if let Some(ref turn) = result.turn {
            self.chat_history.push(ChatTurn::new("assistant", turn.response.clone()));
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "SessionFile::load: called");
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read session file {}", path.display()))?;
        serde_json::from_str(&text)
            .wrap_err_with(|| format!("Failed to parse session file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "SessionFile::save: called");
        let text = serde_json::to_string_pretty(self).wrap_err("Failed to serialize session")?;
        std::fs::write(path, text)
            .wrap_err_with(|| format!("Failed to write session file {}", path.display()))
    }
}
