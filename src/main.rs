//! ncsched command line
//!
//! Loads a scenario (TOML, JSON or Rhai script), builds the network and runs
//! one of the analyses, exporting result matrices as delimited files.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ncsched::{
    config::ScenarioFile, DelayReport, ExperimentConfig, NcSession, ResultMatrix, ScenarioScript,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Network-calculus delay bounds for scheduled networks")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Experiment configuration overriding the one in the scenario
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for exported result matrices
    #[arg(long, global = true, default_value = "experiments")]
    out: PathBuf,

    /// Also write logs to daily files in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the network and report per-service delays
    Analyze { scenario: PathBuf },
    /// Analyze every supported combination of multiplexing, analysis method,
    /// arrival bounding and scheduling policy
    Sweep { scenario: PathBuf },
    /// Analyze with the first 1, 2, ... N declared flows
    Incremental { scenario: PathBuf },
    /// Analyze every ordered tuple of declared flows
    Combinations {
        scenario: PathBuf,
        /// Number of flows per combination
        #[arg(long, default_value_t = 2)]
        depth: usize,
    },
    /// Print the synthesized service curves of every edge
    Curves { scenario: PathBuf },
}

impl Command {
    fn scenario(&self) -> &Path {
        match self {
            Command::Analyze { scenario }
            | Command::Sweep { scenario }
            | Command::Incremental { scenario }
            | Command::Combinations { scenario, .. }
            | Command::Curves { scenario } => scenario,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging; the guard flushes the file writer on exit
    let (file_layer, _guard) = match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "ncsched.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ncsched=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    let mut session = load_session(cli.command.scenario(), cli.config.as_deref())?;

    let torn = match &cli.command {
        Command::Analyze { .. } => {
            session.build_network()?;
            let report = session.delay_report()?;
            print_report(&report);

            let mut matrix = ResultMatrix::new();
            matrix.push_report(session.config(), &report);
            export(&matrix, &cli.out, "analysis")?;
            report.deadline_torn()
        }
        Command::Sweep { .. } => {
            let matrix = session.run_full_experiment_sweep()?;
            export(&matrix, &cli.out, "sweep")?;
            false
        }
        Command::Incremental { .. } => {
            let matrix = session.run_incremental_flows()?;
            export(&matrix, &cli.out, "incremental")?;
            false
        }
        Command::Combinations { depth, .. } => {
            let matrix = session.run_flow_combinations(*depth)?;
            export(&matrix, &cli.out, &format!("combinations{}_", depth))?;
            false
        }
        Command::Curves { .. } => {
            for (edge, curves) in session.service_curves()? {
                let curves: Vec<String> = curves.iter().map(|c| c.to_string()).collect();
                println!("{}: {}", edge, curves.join(" | "));
            }
            false
        }
    };

    Ok(if torn {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn load_session(scenario: &Path, config: Option<&Path>) -> anyhow::Result<NcSession> {
    let file = if scenario.extension().is_some_and(|ext| ext == "rhai") {
        ScenarioScript::new().run_file(scenario)?
    } else {
        ScenarioFile::load(scenario)?
    };

    let mut session = NcSession::default();
    file.apply_to(&mut session)
        .with_context(|| format!("Failed to apply scenario {:?}", scenario))?;

    if let Some(path) = config {
        let config = ExperimentConfig::load(path)
            .with_context(|| format!("Failed to load configuration {:?}", path))?;
        session.set_config(config)?;
    }
    session.config().log_summary();
    Ok(session)
}

fn print_report(report: &DelayReport) {
    if let Some(reason) = report.structural_failure() {
        println!("analysis failed: {}", reason);
    }
    for service in report.services() {
        let delay = service
            .max_delay_ms()
            .map_or_else(|| "n/a".to_string(), |d| format!("{:.3} ms", d));
        println!(
            "{:<16} {:<6} {:>14} (deadline {} ms){}",
            service.name,
            service.priority,
            delay,
            service.deadline_ms,
            if service.deadline_torn() { "  TORN" } else { "" }
        );
    }
    println!("deadline torn: {}", report.deadline_torn());
}

fn export(matrix: &ResultMatrix, dir: &Path, prefix: &str) -> anyhow::Result<()> {
    let path = matrix.export(dir, prefix)?;
    println!("{} rows written to {}", matrix.len(), path.display());
    Ok(())
}
