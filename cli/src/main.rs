//! keycheck CLI - binary entry point.
//!
//! Wires configuration, storage and the virtual authenticator into a
//! [`ScenarioRunner`] and renders the result as plain tables:
//!
//! ```text
//! main() -> Cli::parse() -> init_tracing() -> KeycheckConfig -> Harness
//!                                                                  |
//!                           scenarios | run | registrations | clear
//! ```
//!
//! Logs go to a file so the tables on stdout stay clean.

mod cli;
mod table;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use keycheck_config::{KeycheckConfig, config_dir};
use keycheck_core::{
    BlobStore, FileBlobStore, MemoryBlobStore, REGISTRATION_HEADERS, Registry, RegistryFilter,
    ThreadRandom, registration_rows, render_table,
};
use keycheck_engine::{
    CATALOGUE, HarnessContext, ScenarioRunner, Session, VirtualPlatform, attach_catalogue,
};
use keycheck_types::RelyingParty;

use crate::cli::{Cli, Command, RunArgs};
use crate::table::{TableView, render_catalogue};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: drop logs rather than interleave them with table output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.keycheck/logs/keycheck.log
    if let Some(dir) = config_dir() {
        candidates.push(dir.join("logs").join("keycheck.log"));
    }

    // Fallback: ./.keycheck/logs/keycheck.log
    candidates.push(PathBuf::from(".keycheck").join("logs").join("keycheck.log"));

    candidates
}

fn load_config(cli: &Cli) -> Result<KeycheckConfig> {
    let config = match &cli.config {
        Some(path) => KeycheckConfig::load_from(path)?,
        None => KeycheckConfig::load()?,
    };
    Ok(config)
}

fn open_store(cli: &Cli, config: &KeycheckConfig) -> Arc<dyn BlobStore> {
    if cli.ephemeral {
        tracing::info!("Using in-memory storage");
        return Arc::new(MemoryBlobStore::new());
    }
    let dir = config
        .storage_dir()
        .unwrap_or_else(|| PathBuf::from(".keycheck").join("state"));
    tracing::info!(dir = %dir.display(), "Using file storage");
    Arc::new(FileBlobStore::new(dir))
}

fn build_context(store: Arc<dyn BlobStore>, config: &KeycheckConfig) -> HarnessContext {
    let random = Arc::new(ThreadRandom);
    HarnessContext {
        registry: Registry::new(store.clone(), config.registry_slot()),
        ceremony: Arc::new(VirtualPlatform::new(store, random.clone())),
        random,
        relying_party: RelyingParty {
            name: config.relying_party_name().to_string(),
        },
        id_prefix_len: config.id_prefix_len(),
    }
}

async fn run_scenarios(ctx: HarnessContext, session: Session, args: &RunArgs) -> Result<ExitCode> {
    let id_prefix_len = ctx.id_prefix_len;
    let view = Arc::new(TableView::default());
    let mut runner = ScenarioRunner::new(view.clone(), id_prefix_len);
    attach_catalogue(&mut runner, Arc::new(ctx), Arc::new(session))
        .context("attaching scenario catalogue")?;

    let selectors: Vec<&str> = if args.all {
        CATALOGUE.iter().map(|spec| spec.selector).collect()
    } else {
        args.selectors.iter().map(String::as_str).collect()
    };
    if let Some(unknown) = selectors
        .iter()
        .find(|selector| runner.trigger(selector).is_none())
    {
        bail!("unknown scenario: {unknown} (see `keycheck scenarios`)");
    }

    let mut mismatches = 0usize;
    for selector in &selectors {
        let settlement = runner.activate(selector).await?;
        if !settlement.matched {
            mismatches += 1;
        }
    }

    print!("{}", view.render(&selectors));
    if mismatches > 0 {
        println!("\n{mismatches} of {} scenarios did not match", selectors.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn show_registrations(ctx: &HarnessContext) {
    let records = ctx.registry.list(RegistryFilter::default());
    if records.is_empty() {
        println!("No registrations.");
        return;
    }
    let rows: Vec<Vec<String>> = registration_rows(&records, ctx.id_prefix_len)
        .iter()
        .map(|row| row.cells())
        .collect();
    print!("{}", render_table(&REGISTRATION_HEADERS, &rows));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let store = open_store(&cli, &config);
    let session = Session::new(store.clone());
    let ctx = build_context(store, &config);

    match &cli.command {
        Command::Scenarios => {
            print!("{}", render_catalogue(&CATALOGUE));
            Ok(ExitCode::SUCCESS)
        }
        Command::Run(args) => run_scenarios(ctx, session, args).await,
        Command::Registrations => {
            show_registrations(&ctx);
            Ok(ExitCode::SUCCESS)
        }
        Command::Clear => {
            let count = ctx.registry.len();
            ctx.registry.clear();
            println!("Cleared {count} registrations.");
            Ok(ExitCode::SUCCESS)
        }
    }
}
