//! CLI interface for oracle-subscriber
//!
//! Provides subcommands for:
//! - `run`: Subscribe to the price account and stream decoded prices
//! - `decode`: Decode a single base64 account payload
//! - `config`: Show the effective configuration

mod decode;
mod run;

pub use decode::DecodeArgs;
pub use run::{OutputFormat, RunArgs};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "oracle-subscriber")]
#[command(about = "Stream decoded oracle prices from a live account subscription")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Subscribe and stream price updates until interrupted
    Run(RunArgs),
    /// Decode one base64 account payload and print it as JSON
    Decode(DecodeArgs),
    /// Show configuration
    Config,
}
