//! Roster Server Entry Point

use clap::{Parser, Subcommand};
use roster::{Config, RosterService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

/// Roster: recurring shift materialization and staff assignment
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the background synchronizer until interrupted (default behavior)
    Serve {
        /// Enable JSON logging format
        #[arg(long)]
        json_logs: bool,
    },
    /// Materialize workdays once
    Sync {
        /// Number of weeks to materialize (defaults to sync.weeks_ahead)
        #[arg(short, long)]
        weeks: Option<u32>,
        /// Start from the week containing this date (YYYY-MM-DD)
        #[arg(short, long)]
        from: Option<String>,
    },
    /// List the workdays of a department on a date
    Workdays {
        /// Department ID
        department: String,
        /// Date (YYYY-MM-DD)
        date: String,
    },
    /// List persons of a department, optionally filtered by eligibility
    Persons {
        /// Department ID
        department: String,
        /// Only persons qualified for this workplace
        #[arg(short, long)]
        workplace: Option<String>,
        /// Only persons available on this weekday (MON..SUN)
        #[arg(short = 'd', long)]
        weekday: Option<String>,
        /// Only persons not absent on this date (YYYY-MM-DD)
        #[arg(short = 'a', long)]
        available_on: Option<String>,
    },
    /// Assign a person to a workday
    Assign {
        person: String,
        department: String,
        workplace: String,
        timeslot: String,
        /// Date (YYYY-MM-DD)
        date: String,
    },
    /// Remove a person's assignment from a workday
    Unassign {
        person: String,
        department: String,
        workplace: String,
        timeslot: String,
        /// Date (YYYY-MM-DD)
        date: String,
    },
    /// Record an absence, removing the person's assignments on that date
    Absence {
        person: String,
        /// Date (YYYY-MM-DD)
        date: String,
        /// Reason for the absence
        #[arg(short, long, default_value = "")]
        reason: String,
    },
    /// Show graph statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(path) = &args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // For CLI commands (non-serve), use minimal logging
    let is_serve = matches!(args.command, Some(Command::Serve { .. }) | None);
    if !is_serve {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::stderr)
            .init();
    }

    match args.command {
        Some(Command::Serve { json_logs }) => run_server(config, json_logs).await,
        Some(Command::Sync { weeks, from }) => {
            cli::run_sync(&config, weeks, from, args.json).await
        }
        Some(Command::Workdays { department, date }) => {
            cli::run_workdays(&config, department, date, args.json).await
        }
        Some(Command::Persons {
            department,
            workplace,
            weekday,
            available_on,
        }) => cli::run_persons(&config, department, workplace, weekday, available_on, args.json)
            .await,
        Some(Command::Assign {
            person,
            department,
            workplace,
            timeslot,
            date,
        }) => {
            cli::run_assign(&config, person, department, workplace, timeslot, date, args.json)
                .await
        }
        Some(Command::Unassign {
            person,
            department,
            workplace,
            timeslot,
            date,
        }) => {
            cli::run_unassign(&config, person, department, workplace, timeslot, date, args.json)
                .await
        }
        Some(Command::Absence {
            person,
            date,
            reason,
        }) => cli::run_absence(&config, person, date, reason, args.json).await,
        Some(Command::Stats) => cli::run_stats(&config, args.json).await,
        None => run_server(config, false).await,
    }
}

/// Run the synchronizer in the background until ctrl-c.
async fn run_server(config: Config, json_logs: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    if json_logs || config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Roster v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        persist = config.storage.persist,
        weeks_ahead = config.sync.weeks_ahead,
        interval_hours = config.sync.interval_hours,
        policy = ?config.assignment.policy,
        "Configuration loaded"
    );

    let service = RosterService::from_config(&config).await?;
    let scheduler = service.start_scheduler();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    let stats = scheduler.shutdown().await;
    tracing::info!(
        runs = stats.runs,
        failures = stats.failures,
        "Roster stopped"
    );
    Ok(())
}
