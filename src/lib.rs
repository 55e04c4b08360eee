//! Roster: recurring shift materialization and staff assignment.
//!
//! Departments define recurring timeslots per workplace and weekday. The
//! synchronizer turns them into dated workdays on a rolling horizon, and
//! persons are assigned to workdays subject to the eligibility graph of
//! department membership, workplace qualification, weekday availability
//! and recorded absences.

pub mod config;
pub mod error;
pub mod graph;
pub mod roster;
pub mod scheduler;
pub mod service;

pub use config::{AssignmentPolicy, Config};
pub use error::{ErrorKind, Result, RosterError};
pub use graph::{EmbeddedGraphStore, GraphStats, GraphStore};
pub use roster::{
    Absence, AssignmentManager, CalendarEnsurer, Department, EligibilityFilter, EligibilityGraph,
    Offering, Person, PersonDirectory, PersonInput, SyncReport, Synchronizer, TemplateStore,
    Timeslot, Weekday, Workday, WorkdayKey, WorkdayUpdate, Workplace,
};
pub use scheduler::{SchedulerHandle, SchedulerStats, SyncScheduler};
pub use service::RosterService;
