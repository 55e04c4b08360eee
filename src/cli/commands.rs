//! CLI command handlers.
//!
//! Commands run against the persisted graph named by the configuration.
//! They refuse to run without `storage.persist`, since an in-memory graph
//! would start empty and be discarded when the command exits.

use anyhow::Result;
use roster::{Config, RosterService};

use super::output;

async fn open(config: &Config) -> Result<RosterService> {
    if !config.storage.persist {
        anyhow::bail!(
            "storage.persist is disabled; enable it to run commands against the roster graph"
        );
    }
    Ok(RosterService::from_config(config).await?)
}

/// Run the sync command.
pub async fn run_sync(
    config: &Config,
    weeks_ahead: Option<u32>,
    from: Option<String>,
    json_output: bool,
) -> Result<()> {
    let service = open(config).await?;
    let report = match from {
        Some(from) => {
            let weeks = weeks_ahead.unwrap_or(config.sync.weeks_ahead);
            service.synchronize_from(&from, weeks).await?
        }
        None => service.synchronize(weeks_ahead).await?,
    };
    output::print_sync_report(&report, json_output)
}

/// Run the workdays command.
pub async fn run_workdays(
    config: &Config,
    department_id: String,
    date: String,
    json_output: bool,
) -> Result<()> {
    let service = open(config).await?;
    let workdays = service
        .get_workdays_for_department_and_date(&department_id, &date)
        .await?;
    output::print_workdays(&workdays, json_output)
}

/// Run the persons command.
pub async fn run_persons(
    config: &Config,
    department_id: String,
    workplace_id: Option<String>,
    weekday: Option<String>,
    date: Option<String>,
    json_output: bool,
) -> Result<()> {
    let service = open(config).await?;
    let persons = service
        .find_all_persons_by(
            &department_id,
            workplace_id.as_deref(),
            weekday.as_deref(),
            date.as_deref(),
        )
        .await?;
    output::print_persons(&persons, json_output)
}

/// Run the assign command.
pub async fn run_assign(
    config: &Config,
    person_id: String,
    department_id: String,
    workplace_id: String,
    timeslot_name: String,
    date: String,
    json_output: bool,
) -> Result<()> {
    let service = open(config).await?;
    let workday = service
        .assign_person_to_workday(
            &person_id,
            &department_id,
            &workplace_id,
            &timeslot_name,
            &date,
        )
        .await?;
    output::print_workday(&workday, json_output)
}

/// Run the unassign command.
pub async fn run_unassign(
    config: &Config,
    person_id: String,
    department_id: String,
    workplace_id: String,
    timeslot_name: String,
    date: String,
    json_output: bool,
) -> Result<()> {
    let service = open(config).await?;
    service
        .unassign_person_from_workday(
            &person_id,
            &department_id,
            &workplace_id,
            &timeslot_name,
            &date,
        )
        .await?;
    let workday = service
        .get_workday(&department_id, &workplace_id, &timeslot_name, &date)
        .await?;
    output::print_workday(&workday, json_output)
}

/// Run the absence command.
pub async fn run_absence(
    config: &Config,
    person_id: String,
    date: String,
    reason: String,
    json_output: bool,
) -> Result<()> {
    let service = open(config).await?;
    let absence = service
        .add_absence_to_person(&person_id, &date, &reason)
        .await?;
    output::print_absence(&absence, json_output)
}

/// Run the stats command.
pub async fn run_stats(config: &Config, json_output: bool) -> Result<()> {
    let service = open(config).await?;
    let stats = service.stats().await?;
    output::print_stats(&stats, json_output)
}
