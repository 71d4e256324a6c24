//! Tablo - live route feed and progress bar engine for passenger displays.

#![allow(dead_code)]

mod actor;
mod animate;
mod cli;
mod config;
mod core;
mod feed;
mod layout;
mod logger;
mod protocol;
mod route;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::DisplayConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match &cli.command {
        Commands::Watch { json, .. } => {
            let config = DisplayConfig::load(&cli)?;
            cli::watch::watch(config, *json)
        }
        Commands::Decode { path } => cli::decode::decode_file(path.as_deref()),
    }
}
