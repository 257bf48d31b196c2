//! Chronos CLI
//!
//! Runs the built-in bank model as a replicated experiment and prints a
//! summary line per replication.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chronos::demo::BankModel;
use chronos::{CalendarKind, ExperimentConfig, Executive, ReplicationController};

#[derive(Parser)]
#[command(name = "chronos")]
#[command(about = "Discrete-event simulation of a bank queue")]
#[command(version)]
struct Cli {
    /// Experiment configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of replications
    #[arg(short, long)]
    replications: Option<u32>,

    /// Replication length in simulated time
    #[arg(short, long)]
    length: Option<f64>,

    /// Warm-up period
    #[arg(long)]
    warm_up: Option<f64>,

    /// Calendar backing (heap, tree, list, leftist)
    #[arg(long)]
    calendar: Option<CalendarKind>,

    /// Print the execution trace of the last replication
    #[arg(long)]
    trace: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(replications) = cli.replications {
        config.replications = replications;
    }
    if let Some(length) = cli.length {
        config.length = length;
    }
    if let Some(warm_up) = cli.warm_up {
        config.warm_up = warm_up;
    }
    if let Some(calendar) = cli.calendar {
        config.calendar = calendar;
    }
    config.trace |= cli.trace;
    config.validate()?;

    tracing::info!(
        experiment = %config.name,
        calendar = %config.calendar,
        replications = config.replications,
        "starting experiment"
    );

    let mut exec = Executive::with_calendar(config.calendar);
    if config.trace {
        exec.enable_trace();
    }
    let mut bank = BankModel::build(&mut exec, &config.demo)?;
    let mut controller = ReplicationController::from_config(&config);
    let report = controller.run(&mut exec, &mut bank)?;

    println!("{} ({} calendar)", report.name, config.calendar);
    let mut history = bank.history.iter();
    for replication in &report.replications {
        if replication.is_completed() {
            match history.next() {
                Some(stats) => println!("  {}  {}", replication, stats),
                None => println!("  {}", replication),
            }
        } else {
            println!("  {}", replication);
        }
    }
    println!(
        "  {} completed, {} failed",
        report.completed().count(),
        report.failed().count()
    );

    if let Some(trace) = exec.trace() {
        println!();
        for entry in trace.entries() {
            println!("{}", entry);
        }
    }
    Ok(())
}
