//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Tablo - live route feed and progress bar engine for passenger displays
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: tablo.toml)
    #[arg(short = 'C', long, global = true, default_value = "tablo.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Connect to the feed and drive the display
    #[command(visible_alias = "w")]
    Watch {
        /// Feed address, overrides `[feed] url`
        #[arg(short, long, value_hint = clap::ValueHint::Url)]
        url: Option<String>,

        /// Write render commands as JSON lines to stdout
        #[arg(short, long)]
        json: bool,
    },

    /// Decode recorded frames (one JSON frame per line)
    #[command(visible_alias = "d")]
    Decode {
        /// Frame log to read; stdin when omitted or `-`
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: Option<PathBuf>,
    },
}

impl Cli {
    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }

    /// Feed address given on the command line
    pub fn url_override(&self) -> Option<&str> {
        match &self.command {
            Commands::Watch { url, .. } => url.as_deref(),
            Commands::Decode { .. } => None,
        }
    }
}
