//! Roster service facade.
//!
//! [`RosterService`] wires the graph store to every roster component and
//! exposes the string-keyed operations callers use: dates are `YYYY-MM-DD`
//! and weekdays are three letter codes such as `MON`.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::Config;
use crate::error::Result;
use crate::graph::{EmbeddedGraphStore, GraphStats, GraphStore};
use crate::roster::{
    parse_date, Absence, AssignmentManager, CalendarEnsurer, EligibilityFilter, EligibilityGraph,
    Person, PersonDirectory, SyncReport, Synchronizer, TemplateStore, Weekday, Workday,
    WorkdayKey,
};
use crate::scheduler::{SchedulerHandle, SyncScheduler};

#[derive(Clone)]
pub struct RosterService {
    config: Config,
    store: Arc<dyn GraphStore>,
    calendar: CalendarEnsurer,
    templates: TemplateStore,
    persons: PersonDirectory,
    eligibility: EligibilityGraph,
    assignments: AssignmentManager,
    synchronizer: Synchronizer,
}

impl RosterService {
    /// Open the store described by `config` and build the service on it.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn GraphStore> = if config.storage.persist {
            let data_dir = config.data_dir();
            tracing::info!(data_dir = %data_dir.display(), "Opening persisted roster graph");
            Arc::new(EmbeddedGraphStore::with_persistence(&data_dir).await?)
        } else {
            Arc::new(EmbeddedGraphStore::new())
        };
        Self::new(store, config.clone()).await
    }

    /// Build the service on an existing store. Weekday records are seeded.
    pub async fn new(store: Arc<dyn GraphStore>, config: Config) -> Result<Self> {
        let calendar = CalendarEnsurer::new(store.clone());
        calendar.seed_weekdays().await?;

        Ok(Self {
            templates: TemplateStore::new(store.clone()),
            persons: PersonDirectory::new(store.clone()),
            eligibility: EligibilityGraph::new(store.clone()),
            assignments: AssignmentManager::new(store.clone())
                .with_policy(config.assignment.policy),
            synchronizer: Synchronizer::new(store.clone()),
            calendar,
            config,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn persons(&self) -> &PersonDirectory {
        &self.persons
    }

    pub fn eligibility(&self) -> &EligibilityGraph {
        &self.eligibility
    }

    pub fn assignments(&self) -> &AssignmentManager {
        &self.assignments
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    // ========================================================================
    // Calendar & Synchronization
    // ========================================================================

    pub async fn ensure_date_exists(&self, date: &str) -> Result<NaiveDate> {
        self.calendar.ensure_date_exists(date).await
    }

    /// Synchronize from this week's Monday. `None` uses the configured
    /// horizon.
    pub async fn synchronize(&self, weeks_ahead: Option<u32>) -> Result<SyncReport> {
        self.synchronizer
            .synchronize(weeks_ahead.unwrap_or(self.config.sync.weeks_ahead))
            .await
    }

    /// Synchronize from the Monday of the week containing `today`.
    pub async fn synchronize_from(&self, today: &str, weeks_ahead: u32) -> Result<SyncReport> {
        self.synchronizer
            .synchronize_from(parse_date(today)?, weeks_ahead)
            .await
    }

    /// Materialize workdays for a single date.
    pub async fn create_workdays_for_date(&self, date: &str) -> Result<(usize, usize)> {
        let date = parse_date(date)?;
        self.synchronizer
            .create_workdays_for_weekday(date, Weekday::from_date(date))
            .await
    }

    /// Start the background scheduler using the configured horizons.
    pub fn start_scheduler(&self) -> SchedulerHandle {
        SyncScheduler::new(self.synchronizer.clone(), &self.config.sync).start()
    }

    // ========================================================================
    // Workdays & Assignments
    // ========================================================================

    pub async fn get_workday(
        &self,
        department_id: &str,
        workplace_id: &str,
        timeslot_name: &str,
        date: &str,
    ) -> Result<Workday> {
        let key = WorkdayKey::parse(department_id, workplace_id, timeslot_name, date)?;
        self.assignments.get_workday(&key).await
    }

    pub async fn get_workdays_for_department_and_date(
        &self,
        department_id: &str,
        date: &str,
    ) -> Result<Vec<Workday>> {
        self.assignments
            .get_workdays_for_department_and_date(department_id, parse_date(date)?)
            .await
    }

    pub async fn assign_person_to_workday(
        &self,
        person_id: &str,
        department_id: &str,
        workplace_id: &str,
        timeslot_name: &str,
        date: &str,
    ) -> Result<Workday> {
        let key = WorkdayKey::parse(department_id, workplace_id, timeslot_name, date)?;
        self.assignments.assign(person_id, &key).await?;
        self.assignments.get_workday(&key).await
    }

    pub async fn unassign_person_from_workday(
        &self,
        person_id: &str,
        department_id: &str,
        workplace_id: &str,
        timeslot_name: &str,
        date: &str,
    ) -> Result<()> {
        let key = WorkdayKey::parse(department_id, workplace_id, timeslot_name, date)?;
        self.assignments.unassign(person_id, &key).await
    }

    // ========================================================================
    // Persons & Eligibility
    // ========================================================================

    pub async fn find_all_persons(&self, department_id: &str) -> Result<Vec<Person>> {
        self.persons.find_all(department_id).await
    }

    /// Persons of a department, optionally narrowed by workplace
    /// qualification, weekday availability and absence on a date.
    pub async fn find_all_persons_by(
        &self,
        department_id: &str,
        workplace_id: Option<&str>,
        weekday: Option<&str>,
        not_absent_on: Option<&str>,
    ) -> Result<Vec<Person>> {
        let mut filter = EligibilityFilter::new(department_id);
        if let Some(workplace_id) = workplace_id {
            filter = filter.qualified_for(workplace_id);
        }
        if let Some(weekday) = weekday {
            filter = filter.available_on(Weekday::from_code(weekday)?);
        }
        if let Some(date) = not_absent_on {
            filter = filter.not_absent_on(parse_date(date)?);
        }
        self.persons.find_all_by(&filter).await
    }

    pub async fn add_department_to_person(
        &self,
        person_id: &str,
        department_id: &str,
    ) -> Result<()> {
        self.eligibility
            .add_department_to_person(person_id, department_id)
            .await
    }

    pub async fn remove_department_from_person(
        &self,
        person_id: &str,
        department_id: &str,
    ) -> Result<()> {
        self.eligibility
            .remove_department_from_person(person_id, department_id)
            .await
    }

    pub async fn add_workplace_to_person(
        &self,
        person_id: &str,
        department_id: &str,
        workplace_id: &str,
    ) -> Result<()> {
        self.eligibility
            .add_workplace_to_person(person_id, department_id, workplace_id)
            .await
    }

    pub async fn remove_workplace_from_person(
        &self,
        person_id: &str,
        department_id: &str,
        workplace_id: &str,
    ) -> Result<()> {
        self.eligibility
            .remove_workplace_from_person(person_id, department_id, workplace_id)
            .await
    }

    pub async fn add_weekday_to_person(&self, person_id: &str, weekday: &str) -> Result<()> {
        self.eligibility
            .add_weekday_to_person(person_id, weekday)
            .await
    }

    pub async fn remove_weekday_from_person(&self, person_id: &str, weekday: &str) -> Result<()> {
        self.eligibility
            .remove_weekday_from_person(person_id, weekday)
            .await
    }

    /// Record an absence. Assignments of the person on that date are
    /// removed in the same write.
    pub async fn add_absence_to_person(
        &self,
        person_id: &str,
        date: &str,
        reason: &str,
    ) -> Result<Absence> {
        self.eligibility
            .add_absence_to_person(person_id, date, reason)
            .await
    }

    pub async fn remove_absence_from_person(&self, person_id: &str, date: &str) -> Result<()> {
        self.eligibility
            .remove_absence_from_person(person_id, date)
            .await
    }

    pub async fn find_absence(&self, person_id: &str, date: &str) -> Result<Absence> {
        self.eligibility
            .find_absence(person_id, parse_date(date)?)
            .await
    }

    /// Absences of a person between `start` and `end`, both inclusive.
    pub async fn find_absences_in_range(
        &self,
        person_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<Absence>> {
        self.eligibility
            .find_absences_in_range(person_id, parse_date(start)?, parse_date(end)?)
            .await
    }

    pub async fn find_all_absences(&self, department_id: &str, date: &str) -> Result<Vec<Absence>> {
        self.eligibility
            .find_all_absences(department_id, parse_date(date)?)
            .await
    }

    pub async fn stats(&self) -> Result<GraphStats> {
        self.store.stats().await
    }
}
