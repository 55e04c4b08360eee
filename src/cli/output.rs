//! Output formatting for CLI commands.
//!
//! This module handles formatting output as either JSON or human-readable text.

use anyhow::Result;
use roster::{Absence, GraphStats, Person, SyncReport, Workday};
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a synchronization report.
pub fn print_sync_report(report: &SyncReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    if let Some(start) = report.start {
        println!("Synchronized {} weeks from {}", report.weeks_ahead, start);
    } else {
        println!("Nothing to synchronize");
    }
    println!("Dates processed:   {}", report.dates_processed);
    println!("Workdays created:  {}", report.workdays_created);
    println!("Workdays existing: {}", report.workdays_existing);
    Ok(())
}

/// Print workdays, one per line.
pub fn print_workdays(workdays: &[Workday], json: bool) -> Result<()> {
    if json {
        return print_json(workdays);
    }
    if workdays.is_empty() {
        println!("No workdays found.");
        return Ok(());
    }
    for workday in workdays {
        print_workday_line(workday);
    }
    Ok(())
}

pub fn print_workday(workday: &Workday, json: bool) -> Result<()> {
    if json {
        return print_json(workday);
    }
    print_workday_line(workday);
    Ok(())
}

fn print_workday_line(workday: &Workday) {
    let assignee = workday
        .person
        .as_ref()
        .map(|p| format!("{} {} ({})", p.first_name, p.last_name, p.id))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} {}  {}/{}  {}-{} ({} min)  {}",
        workday.date,
        workday.weekday,
        workday.workplace_id,
        workday.timeslot_name,
        workday.start_time.format("%H:%M"),
        workday.end_time.format("%H:%M"),
        workday.duration_minutes,
        assignee
    );
    if !workday.comment.is_empty() {
        println!("    {}", workday.comment);
    }
}

/// Print persons with their eligibility summary.
pub fn print_persons(persons: &[Person], json: bool) -> Result<()> {
    if json {
        return print_json(persons);
    }
    println!("Found {} persons\n", persons.len());
    for person in persons {
        let weekdays: Vec<&str> = person.weekdays.iter().map(|w| w.code()).collect();
        println!(
            "{}  {} {} <{}>",
            person.id, person.first_name, person.last_name, person.email
        );
        println!("    workplaces: {}", person.workplaces.join(", "));
        println!("    weekdays:   {}", weekdays.join(", "));
    }
    Ok(())
}

pub fn print_absence(absence: &Absence, json: bool) -> Result<()> {
    if json {
        return print_json(absence);
    }
    println!(
        "{} absent on {}: {}",
        absence.person_id, absence.date, absence.reason
    );
    Ok(())
}

/// Print graph statistics.
pub fn print_stats(stats: &GraphStats, json: bool) -> Result<()> {
    if json {
        return print_json(stats);
    }
    println!("Roster Statistics");
    println!("{}", "=".repeat(40));
    println!("Nodes:         {}", stats.node_count);
    println!("Deleted nodes: {}", stats.deleted_node_count);
    println!("Edges:         {}", stats.edge_count);

    let mut labels: Vec<_> = stats.nodes_by_label.iter().collect();
    labels.sort();
    for (label, count) in labels {
        println!("  {:<12} {}", label, count);
    }
    let mut edge_types: Vec<_> = stats.edges_by_type.iter().collect();
    edge_types.sort();
    for (edge_type, count) in edge_types {
        println!("  {:<16} {}", edge_type, count);
    }
    Ok(())
}
