use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "keycheck")]
#[command(about = "Manual test harness for WebAuthn registration and authentication")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
    /// Config file to use instead of ~/.keycheck/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep registrations in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List scenarios with their expected outcomes
    Scenarios,
    /// Run scenarios and show how each one settled
    ///
    /// Ids remembered by one scenario (the identified registration, the
    /// expected discoverable credential) are saved with the registrations, so
    /// later runs can use them. With --ephemeral they last for this run only.
    Run(RunArgs),
    /// Show saved registrations
    Registrations,
    /// Forget every saved registration
    Clear,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario selectors, run in the order given
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub selectors: Vec<String>,

    /// Run the whole catalogue in order
    #[arg(long)]
    pub all: bool,
}
