//! Roster domain: templates, persons, eligibility, workdays and assignments.
//!
//! Departments own workplaces, workplaces own timeslots, and timeslots are
//! offered on weekdays with a start and end time. The [`Synchronizer`]
//! projects those recurring offerings onto calendar dates as workdays,
//! which persons are then assigned to.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Roster Layer                          │
//! │  ┌──────────────┐ ┌──────────────┐ ┌───────────────────────┐ │
//! │  │  Templates   │ │   Persons    │ │  Eligibility Graph    │ │
//! │  │ dept/wp/ts   │ │  directory   │ │ works/qualified/avail │ │
//! │  └──────┬───────┘ └──────────────┘ └───────────┬───────────┘ │
//! │         │ offerings                            │ filters     │
//! │  ┌──────▼───────┐ ┌──────────────┐ ┌───────────▼───────────┐ │
//! │  │ Synchronizer ├─►   Calendar   │ │  Assignment Manager   │ │
//! │  │  (workdays)  │ │ (dates/week) │ │  (ASSIGNED_TO links)  │ │
//! │  └──────────────┘ └──────────────┘ └───────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod assignments;
mod calendar;
mod eligibility;
mod persons;
mod sync;
mod templates;
mod types;

pub use assignments::AssignmentManager;
pub use calendar::{iso_week, monday_of, CalendarEnsurer};
pub use eligibility::EligibilityGraph;
pub use persons::{EligibilityFilter, PersonDirectory};
pub use sync::{SyncReport, Synchronizer};
pub use templates::TemplateStore;
pub use types::{
    date_ref, department_ref, duration_minutes, format_date, format_time, parse_date, parse_time,
    person_ref, timeslot_ref, workplace_ref, Absence, Assignee, Department, Offering, Person,
    PersonInput, Timeslot, Weekday, Workday, WorkdayKey, WorkdayUpdate, Workplace, DATE_FORMAT,
    TIME_FORMAT,
};
