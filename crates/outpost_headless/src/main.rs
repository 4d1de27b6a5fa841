//! Headless driver binary.
//!
//! Run with: `cargo run -p outpost_headless -- <command>`

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use outpost_core::offline::catch_up;
use outpost_headless::loader::{
    content_or_default, load_content, load_snapshot, snapshot_or_default, write_snapshot,
};
use outpost_headless::{HeadlessError, HeadlessRunner, Result};

#[derive(Parser)]
#[command(name = "outpost")]
#[command(about = "Headless driver for the Outpost station simulation")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON-lines protocol on stdin/stdout
    Run {
        /// Snapshot JSON to load (new game if omitted)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Content RON to load (built-in catalog if omitted)
        #[arg(short, long)]
        content: Option<PathBuf>,
    },

    /// Tick the engine and print or write the resulting snapshot
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value = "60")]
        ticks: u64,

        /// Snapshot JSON to load (new game if omitted)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Content RON to load (built-in catalog if omitted)
        #[arg(short, long)]
        content: Option<PathBuf>,

        /// Write the final snapshot here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report what offline catch-up would credit for a snapshot
    CatchUp {
        /// Snapshot JSON to inspect
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Content RON to load (built-in catalog if omitted)
        #[arg(short, long)]
        content: Option<PathBuf>,

        /// Reference time, RFC 3339 (defaults to the current time)
        #[arg(long)]
        now: Option<String>,
    },

    /// Parse and validate a content file
    Validate {
        /// Content RON to check
        content: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Some(Commands::Run { snapshot, content }) => {
            cmd_run(snapshot.as_deref(), content.as_deref())
        }
        Some(Commands::Simulate {
            ticks,
            snapshot,
            content,
            output,
        }) => cmd_simulate(ticks, snapshot.as_deref(), content.as_deref(), output.as_deref()),
        Some(Commands::CatchUp {
            snapshot,
            content,
            now,
        }) => cmd_catch_up(&snapshot, content.as_deref(), now.as_deref()),
        Some(Commands::Validate { content }) => cmd_validate(&content),
        None => {
            // Default: protocol on a new game
            cmd_run(None, None)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// Serve the protocol.
fn cmd_run(snapshot: Option<&Path>, content: Option<&Path>) -> Result<()> {
    tracing::info!("Starting protocol session");

    let content = content_or_default(content)?;
    let snapshot = snapshot_or_default(snapshot)?;
    let (mut runner, offline) = HeadlessRunner::load(&snapshot, content, Utc::now());

    let stdin = io::stdin();
    runner.serve(stdin.lock(), io::stdout().lock(), &offline)
}

/// Tick a fixed number of times.
fn cmd_simulate(
    ticks: u64,
    snapshot: Option<&Path>,
    content: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let content = content_or_default(content)?;
    let snapshot = snapshot_or_default(snapshot)?;
    let (mut runner, _) = HeadlessRunner::load(&snapshot, content, Utc::now());

    runner.simulate(ticks);
    tracing::info!(autosaves = runner.autosaves(), "Autosave points crossed");

    let saved = runner.save();
    match output {
        Some(path) => write_snapshot(path, &saved),
        None => {
            println!("{}", saved.to_json_string()?);
            Ok(())
        }
    }
}

/// Print the offline report for a snapshot.
fn cmd_catch_up(snapshot: &Path, content: Option<&Path>, now: Option<&str>) -> Result<()> {
    let content = content_or_default(content)?;
    let snapshot = load_snapshot(snapshot)?;
    let now = match now {
        Some(text) => parse_timestamp(text)?,
        None => Utc::now(),
    };

    let report = catch_up(
        &snapshot.resources,
        snapshot.last_online,
        now,
        content.settings.max_offline_minutes,
        &content,
    );

    println!("Minutes offline: {}", report.minutes_passed);
    if report.has_gains() {
        for (resource, gain) in &report.gains {
            println!("  {:<8} +{gain:.1}", resource.as_str());
        }
    } else {
        println!("  no gains");
    }
    Ok(())
}

/// Validate a content file.
fn cmd_validate(path: &Path) -> Result<()> {
    let content = load_content(path)?;
    println!(
        "OK: {} resources, {} upgrades, {} enemies, {} logs",
        content.resources.len(),
        content.upgrades.len(),
        content.enemies.len(),
        content.logs.len()
    );
    Ok(())
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| HeadlessError::Timestamp {
            value: text.to_string(),
            message: e.to_string(),
        })
}
