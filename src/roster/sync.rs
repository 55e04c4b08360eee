//! Materialization of recurring offerings into dated workdays.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::graph::{
    EdgeType, GraphStore, Mutation, MutationOutcome, NodeLabel, NodeQuery, Properties,
};
use crate::roster::calendar::{date_mutations, monday_of};
use crate::roster::types::{
    date_ref, department_ref, format_date, format_time, parse_time, props, workplace_ref,
    Offering, Weekday, WorkdayKey,
};

/// Summary of one synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Monday the run started from.
    pub start: Option<NaiveDate>,
    pub weeks_ahead: u32,
    pub dates_processed: usize,
    pub workdays_created: usize,
    pub workdays_existing: usize,
}

/// One offering of a live timeslot, with the workplace and department it
/// belongs to.
#[derive(Debug, Clone)]
struct ScheduledOffering {
    department_id: String,
    workplace_id: String,
    timeslot_name: String,
    offering: Offering,
}

/// Projects offerings onto calendar dates.
#[derive(Clone)]
pub struct Synchronizer {
    store: Arc<dyn GraphStore>,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Materialize `weeks_ahead` weeks starting from this week's Monday.
    pub async fn synchronize(&self, weeks_ahead: u32) -> Result<SyncReport> {
        self.synchronize_from(Local::now().date_naive(), weeks_ahead)
            .await
    }

    /// Materialize `weeks_ahead` weeks starting from the Monday of the week
    /// containing `today`.
    ///
    /// The first failing date aborts the run. Dates processed before it keep
    /// their workdays.
    pub async fn synchronize_from(
        &self,
        today: NaiveDate,
        weeks_ahead: u32,
    ) -> Result<SyncReport> {
        let monday = monday_of(today);
        tracing::info!(start = %monday, weeks_ahead, "Starting synchronization");

        let mut report = SyncReport {
            start: Some(monday),
            weeks_ahead,
            ..Default::default()
        };

        for offset in 0..i64::from(weeks_ahead) * 7 {
            let date = monday + Duration::days(offset);
            let weekday = Weekday::from_date(date);

            let (created, existing) = match self.create_workdays_for_weekday(date, weekday).await {
                Ok(counts) => counts,
                Err(e) => {
                    tracing::error!(
                        date = %date,
                        error = %e,
                        dates_processed = report.dates_processed,
                        "Synchronization aborted"
                    );
                    return Err(e);
                }
            };

            report.dates_processed += 1;
            report.workdays_created += created;
            report.workdays_existing += existing;
        }

        tracing::info!(
            dates = report.dates_processed,
            created = report.workdays_created,
            existing = report.workdays_existing,
            "Synchronization finished"
        );
        Ok(report)
    }

    /// Ensure `date` exists and upsert one workday per live offering on
    /// `weekday`. Existing workdays are left untouched.
    ///
    /// Returns the number of workdays created and already present.
    pub async fn create_workdays_for_weekday(
        &self,
        date: NaiveDate,
        weekday: Weekday,
    ) -> Result<(usize, usize)> {
        let offerings = self.offerings_on(weekday).await?;

        let mut mutations = date_mutations(date);
        let mut departments = BTreeSet::new();
        for scheduled in &offerings {
            mutations.extend(workday_mutations(date, scheduled)?);
            departments.insert(scheduled.department_id.clone());
        }

        let synchronized_at = json!(Utc::now().to_rfc3339());
        for department_id in &departments {
            mutations.push(Mutation::MergeEdge {
                source: department_ref(department_id),
                edge_type: EdgeType::SynchronizedAt,
                target: date_ref(date),
                on_create: Properties::new(),
                on_match: props([("synchronized_at", synchronized_at.clone())]),
            });
        }

        let outcomes = self.store.apply(mutations).await?;

        let mut created = 0;
        let mut existing = 0;
        for outcome in &outcomes {
            match outcome {
                MutationOutcome::NodeCreated(node) if node.label == NodeLabel::Workday => {
                    created += 1
                }
                MutationOutcome::NodeMatched(node) if node.label == NodeLabel::Workday => {
                    existing += 1
                }
                _ => {}
            }
        }

        if offerings.is_empty() {
            tracing::debug!(date = %date, weekday = %weekday, "No offerings for date");
        } else {
            tracing::debug!(date = %date, created, existing, "Date synchronized");
        }
        Ok((created, existing))
    }

    /// Offerings on `weekday` whose timeslot is active and whose timeslot,
    /// workplace and department are not deleted.
    async fn offerings_on(&self, weekday: Weekday) -> Result<Vec<ScheduledOffering>> {
        let timeslots = self
            .store
            .query_nodes(
                NodeQuery::new(NodeLabel::Timeslot)
                    .where_property("active", json!(true))
                    .with_outgoing(EdgeType::OfferedOn, weekday.node_ref()),
            )
            .await?;

        let mut scheduled = Vec::with_capacity(timeslots.len());
        for timeslot in &timeslots {
            let (Some(department_id), Some(workplace_id), Some(name)) = (
                timeslot.get_str("department"),
                timeslot.get_str("workplace"),
                timeslot.get_str("name"),
            ) else {
                tracing::warn!(
                    timeslot = %timeslot.id,
                    "Skipping timeslot with missing properties"
                );
                continue;
            };

            if self
                .store
                .get_live_node(&department_ref(department_id))
                .await?
                .is_none()
                || self
                    .store
                    .get_live_node(&workplace_ref(department_id, workplace_id))
                    .await?
                    .is_none()
            {
                continue;
            }

            let Some(edge) = self
                .store
                .get_edge(&timeslot.node_ref(), EdgeType::OfferedOn, &weekday.node_ref())
                .await?
            else {
                continue;
            };

            let offering = Offering::new(
                weekday,
                parse_time(edge.get_str("start_time").unwrap_or_default())?,
                parse_time(edge.get_str("end_time").unwrap_or_default())?,
            );

            scheduled.push(ScheduledOffering {
                department_id: department_id.to_string(),
                workplace_id: workplace_id.to_string(),
                timeslot_name: name.to_string(),
                offering,
            });
        }
        Ok(scheduled)
    }
}

fn workday_mutations(date: NaiveDate, scheduled: &ScheduledOffering) -> Result<Vec<Mutation>> {
    let key = WorkdayKey::new(
        scheduled.department_id.clone(),
        scheduled.workplace_id.clone(),
        scheduled.timeslot_name.clone(),
        date,
    );
    let offering = &scheduled.offering;
    let workday = key.node_ref();

    Ok(vec![
        Mutation::MergeNode {
            node: workday.clone(),
            on_create: props([
                ("department", json!(key.department_id)),
                ("workplace", json!(key.workplace_id)),
                ("timeslot", json!(key.timeslot_name)),
                ("date", json!(format_date(date))),
                ("weekday", json!(offering.weekday.code())),
                ("start_time", json!(format_time(offering.start_time))),
                ("end_time", json!(format_time(offering.end_time))),
                ("duration_in_minutes", json!(offering.duration_minutes()?)),
                ("active", json!(true)),
                ("comment", json!("")),
            ]),
            on_match: Properties::new(),
        },
        Mutation::merge_edge(workday.clone(), EdgeType::IsTimeslot, key.timeslot_ref()),
        Mutation::merge_edge(workday, EdgeType::IsDate, date_ref(date)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EmbeddedGraphStore;
    use crate::roster::templates::TemplateStore;
    use crate::roster::types::Workday;

    async fn create_test_setup() -> (Arc<dyn GraphStore>, TemplateStore, Synchronizer) {
        let store: Arc<dyn GraphStore> = Arc::new(EmbeddedGraphStore::new());
        let templates = TemplateStore::new(store.clone());
        templates.create_department("d1", "Surgery").await.unwrap();
        templates.create_workplace("d1", "w1", "Ward 1").await.unwrap();
        templates.create_timeslot("d1", "w1", "early", true).await.unwrap();
        (store.clone(), templates, Synchronizer::new(store))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    async fn workday_count(store: &Arc<dyn GraphStore>) -> usize {
        store
            .query_nodes(NodeQuery::new(NodeLabel::Workday).include_deleted())
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn test_materializes_matching_weekdays() {
        let (store, templates, sync) = create_test_setup().await;
        for weekday in [Weekday::Mon, Weekday::Tue, Weekday::Wed] {
            templates
                .add_offering("d1", "w1", "early", weekday, "08:00", "16:00")
                .await
                .unwrap();
        }

        let report = sync.synchronize_from(day(6), 1).await.unwrap();
        assert_eq!(report.start, Some(day(4)));
        assert_eq!(report.dates_processed, 7);
        assert_eq!(report.workdays_created, 3);
        assert_eq!(report.workdays_existing, 0);

        let workday = store
            .get_node(&WorkdayKey::new("d1", "w1", "early", day(5)).node_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(workday.get_str("start_time"), Some("08:00"));
        assert_eq!(workday.get_str("end_time"), Some("16:00"));
        assert_eq!(workday.get_i64("duration_in_minutes"), Some(480));
        assert_eq!(workday.get_bool("active"), Some(true));
        assert_eq!(workday.get_str("weekday"), Some("TUE"));

        let dates = store
            .query_nodes(NodeQuery::new(NodeLabel::Date))
            .await
            .unwrap();
        assert_eq!(dates.len(), 7);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let (store, templates, sync) = create_test_setup().await;
        templates
            .add_offering("d1", "w1", "early", Weekday::Fri, "06:00", "14:00")
            .await
            .unwrap();

        sync.synchronize_from(day(4), 2).await.unwrap();
        let report = sync.synchronize_from(day(4), 2).await.unwrap();
        assert_eq!(report.workdays_created, 0);
        assert_eq!(report.workdays_existing, 2);
        assert_eq!(workday_count(&store).await, 2);

        let marker = store
            .get_edge(&department_ref("d1"), EdgeType::SynchronizedAt, &date_ref(day(8)))
            .await
            .unwrap();
        assert!(marker.is_some());
    }

    #[tokio::test]
    async fn test_skips_inactive_and_deleted_templates() {
        let (store, templates, sync) = create_test_setup().await;
        templates.create_timeslot("d1", "w1", "late", false).await.unwrap();
        templates.create_workplace("d1", "w2", "Ward 2").await.unwrap();
        templates.create_timeslot("d1", "w2", "night", true).await.unwrap();
        templates.create_timeslot("d1", "w1", "mid", true).await.unwrap();
        for (wp, ts) in [("w1", "early"), ("w1", "late"), ("w2", "night"), ("w1", "mid")] {
            templates
                .add_offering("d1", wp, ts, Weekday::Mon, "08:00", "16:00")
                .await
                .unwrap();
        }
        templates.create_department("d2", "Radiology").await.unwrap();
        templates.create_workplace("d2", "w1", "Scanner").await.unwrap();
        templates.create_timeslot("d2", "w1", "early", true).await.unwrap();
        templates
            .add_offering("d2", "w1", "early", Weekday::Mon, "08:00", "16:00")
            .await
            .unwrap();

        templates.delete_workplace("d1", "w2").await.unwrap();
        templates.delete_timeslot("d1", "w1", "mid").await.unwrap();
        templates.delete_department("d2").await.unwrap();

        let report = sync.synchronize_from(day(4), 1).await.unwrap();
        assert_eq!(report.workdays_created, 1);
        assert_eq!(workday_count(&store).await, 1);
        for (dept, wp, ts) in [("d1", "w1", "mid"), ("d2", "w1", "early")] {
            let key = WorkdayKey::new(dept, wp, ts, day(4)).node_ref();
            assert!(store.get_node(&key).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_existing_workdays_are_snapshots() {
        let (store, templates, sync) = create_test_setup().await;
        templates
            .add_offering("d1", "w1", "early", Weekday::Mon, "08:00", "16:00")
            .await
            .unwrap();
        sync.synchronize_from(day(4), 1).await.unwrap();

        templates
            .add_offering("d1", "w1", "early", Weekday::Mon, "09:00", "12:00")
            .await
            .unwrap();
        sync.synchronize_from(day(4), 2).await.unwrap();

        let first = store
            .get_node(&WorkdayKey::new("d1", "w1", "early", day(4)).node_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.get_str("start_time"), Some("08:00"));

        let second = store
            .get_node(&WorkdayKey::new("d1", "w1", "early", day(11)).node_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.get_str("start_time"), Some("09:00"));
        assert_eq!(second.get_i64("duration_in_minutes"), Some(180));
    }

    #[tokio::test]
    async fn test_overnight_offering() {
        let (store, templates, sync) = create_test_setup().await;
        templates
            .add_offering("d1", "w1", "early", Weekday::Sun, "22:00", "06:00")
            .await
            .unwrap();
        sync.synchronize_from(day(4), 1).await.unwrap();

        let workday = store
            .get_node(&WorkdayKey::new("d1", "w1", "early", day(10)).node_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(workday.get_i64("duration_in_minutes"), Some(480));

        let projected = Workday::from_node(&workday, None).unwrap();
        assert_eq!(projected.end_time.format("%H:%M").to_string(), "06:00");
        assert_eq!(projected.duration_minutes, 480);
    }

    #[tokio::test]
    async fn test_zero_weeks_is_a_no_op() {
        let (store, _, sync) = create_test_setup().await;
        let report = sync.synchronize_from(day(4), 0).await.unwrap();
        assert_eq!(report.dates_processed, 0);
        assert!(store
            .query_nodes(NodeQuery::new(NodeLabel::Date))
            .await
            .unwrap()
            .is_empty());
    }
}
