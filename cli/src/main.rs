//! generational-events - run the generational events engine from the shell
//!
//! Loads a JSON scenario, runs a range of cycles against an in-memory
//! registry and ledger, and prints one `CycleOutcome` JSON line per cycle.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use generational_events_core::{EngineSnapshot, Orchestrator, Severity};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod scenario;

use scenario::Scenario;

/// generational-events - cycle-based life milestone simulation
#[derive(Parser, Debug)]
#[command(name = "generational-events")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run cycles from a scenario file
    Run {
        /// Scenario JSON (config, citizens, ledger columns, calendar, crisis)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of cycles to run
        #[arg(short = 'n', long, default_value = "1")]
        cycles: u64,

        /// First cycle number (defaults to 0, or the cycle after a resumed snapshot)
        #[arg(long)]
        start_cycle: Option<u64>,

        /// Write cycle outcomes here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Resume from a snapshot written by --checkpoint
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Write an engine snapshot after the last cycle
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Validate a scenario's engine config and exit
    CheckConfig {
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

/// Final line of a run
#[derive(Serialize)]
struct RunSummary {
    cycles: u64,
    events: usize,
    held: usize,
    transitions: usize,
    critical_findings: usize,
    warnings: usize,
    ledger_rows: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            cycles,
            start_cycle,
            out,
            resume,
            checkpoint,
        } => run(scenario, cycles, start_cycle, out, resume, checkpoint),
        Commands::CheckConfig { scenario } => {
            let scenario = Scenario::from_file(&scenario)?;
            println!(
                "ok: {} citizens, base seed {}",
                scenario.citizens.len(),
                scenario.config.base_seed
            );
            Ok(())
        }
    }
}

fn run(
    scenario_path: PathBuf,
    cycles: u64,
    start_cycle: Option<u64>,
    out: Option<PathBuf>,
    resume: Option<PathBuf>,
    checkpoint: Option<PathBuf>,
) -> Result<()> {
    let scenario = Scenario::from_file(&scenario_path)?;
    let calendar = scenario.calendar()?;
    let mut ledger = scenario.ledger();

    let (mut orchestrator, mut registry) = match &resume {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            let snapshot = EngineSnapshot::from_json(&text).context("invalid snapshot")?;
            let registry = snapshot.registry();
            let orchestrator =
                Orchestrator::load_state(scenario.config.clone(), snapshot).context("failed to restore engine")?;
            (orchestrator, registry)
        }
        None => (
            Orchestrator::new(scenario.config.clone()).context("failed to create engine")?,
            generational_events_core::InMemoryRegistry::new(scenario.citizens.clone()),
        ),
    };

    let first = start_cycle.unwrap_or_else(|| orchestrator.last_cycle().map_or(0, |c| c + 1));

    let mut writer: Box<dyn Write> = match &out {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut summary = RunSummary {
        cycles,
        events: 0,
        held: 0,
        transitions: 0,
        critical_findings: 0,
        warnings: 0,
        ledger_rows: 0,
    };

    for cycle in first..first + cycles {
        let outcome = orchestrator
            .run_cycle(cycle, &calendar, &mut registry, &mut ledger, scenario.crisis.clone())
            .with_context(|| format!("cycle {} failed", cycle))?;

        summary.events += outcome.rows_written;
        summary.held += outcome.publication.held.len();
        summary.transitions += outcome.transitions.len();
        summary.critical_findings += outcome.publication.report.count(Severity::Critical);
        summary.warnings += outcome.publication.report.count(Severity::Warning);

        serde_json::to_writer(&mut writer, &outcome).context("failed to write cycle outcome")?;
        writeln!(writer)?;
    }
    summary.ledger_rows = ledger.len();

    serde_json::to_writer(&mut writer, &summary).context("failed to write summary")?;
    writeln!(writer)?;
    writer.flush()?;

    if let Some(path) = checkpoint {
        let snapshot = orchestrator.save_state().context("failed to snapshot engine")?;
        std::fs::write(&path, snapshot.to_json()?)
            .with_context(|| format!("failed to write checkpoint {}", path.display()))?;
        tracing::info!(path = %path.display(), "checkpoint written");
    }

    Ok(())
}
