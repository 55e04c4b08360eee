//! Linking persons to materialized workdays, and workday projections.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use crate::config::AssignmentPolicy;
use crate::error::{Result, RosterError, ValidationError};
use crate::graph::{
    EdgeSelector, EdgeType, GraphStore, Mutation, Node, NodeLabel, NodeQuery, NodeRef,
};
use crate::roster::types::{
    date_ref, department_ref, duration_minutes, format_date, format_time, person_ref, props,
    workplace_ref, Assignee, Weekday, Workday, WorkdayKey, WorkdayUpdate,
};

// ============================================================================
// Assignment Manager
// ============================================================================

/// Manages `ASSIGNED_TO` links. A workday has at most one assignee.
#[derive(Clone)]
pub struct AssignmentManager {
    store: Arc<dyn GraphStore>,
    policy: AssignmentPolicy,
}

impl AssignmentManager {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            policy: AssignmentPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AssignmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assign a person to an active workday, replacing any previous
    /// assignee.
    pub async fn assign(&self, person_id: &str, key: &WorkdayKey) -> Result<()> {
        let person = person_ref(person_id);
        self.store.require_live_node(&person).await?;
        let workday = key.node_ref();
        self.visible_workday_node(key).await?;

        if self.policy == AssignmentPolicy::EnforceEligibility {
            self.check_eligibility(person_id, key).await?;
        }

        let current = self.store.edges_to(&workday, EdgeType::AssignedTo).await?;
        if current.len() == 1 && current[0].source_id == person.id() {
            return Ok(());
        }

        self.store
            .apply(vec![
                Mutation::DeleteEdges(EdgeSelector::to(EdgeType::AssignedTo, workday.clone())),
                Mutation::merge_edge(person, EdgeType::AssignedTo, workday),
            ])
            .await?;

        tracing::info!(
            person = person_id,
            workday = %key,
            replaced = current.len(),
            "Person assigned to workday"
        );
        Ok(())
    }

    /// Remove the assignment if it exists.
    pub async fn unassign(&self, person_id: &str, key: &WorkdayKey) -> Result<()> {
        self.store
            .apply(vec![Mutation::DeleteEdges(EdgeSelector::between(
                person_ref(person_id),
                EdgeType::AssignedTo,
                key.node_ref(),
            ))])
            .await?;
        tracing::debug!(person = person_id, workday = %key, "Person unassigned");
        Ok(())
    }

    /// Check the eligibility graph for `person_id` on the workday.
    pub async fn check_eligibility(&self, person_id: &str, key: &WorkdayKey) -> Result<()> {
        let person = self.store.require_live_node(&person_ref(person_id)).await?;
        let person_node = person.node_ref();
        let weekday = Weekday::from_date(key.date);

        let not_eligible = |reason: String| -> RosterError {
            ValidationError::NotEligible {
                person: person_id.to_string(),
                workday: key.to_string(),
                reason,
            }
            .into()
        };

        if person.get_bool("active") != Some(true) {
            return Err(not_eligible("person is inactive".to_string()));
        }

        let person_node = &person_node;
        let has = move |edge_type: EdgeType, target: NodeRef| {
            self.has_edge(person_node, edge_type, target)
        };

        if !has(EdgeType::WorksAt, department_ref(&key.department_id)).await? {
            return Err(not_eligible(format!(
                "does not work at department {}",
                key.department_id
            )));
        }
        if !has(
            EdgeType::QualifiedFor,
            workplace_ref(&key.department_id, &key.workplace_id),
        )
        .await?
        {
            return Err(not_eligible(format!(
                "not qualified for workplace {}",
                key.workplace_id
            )));
        }
        if !has(EdgeType::AvailableOn, weekday.node_ref()).await? {
            return Err(not_eligible(format!("not available on {}", weekday)));
        }
        if has(EdgeType::AbsentOn, date_ref(key.date)).await? {
            return Err(not_eligible(format!("absent on {}", key.date)));
        }
        Ok(())
    }

    // ========================================================================
    // Workday Projections
    // ========================================================================

    /// Get an active, non-deleted workday with its assignee.
    pub async fn get_workday(&self, key: &WorkdayKey) -> Result<Workday> {
        let node = self.visible_workday_node(key).await?;
        self.project(&node).await
    }

    /// Active workdays of a department on a date, ordered by workplace then
    /// timeslot.
    pub async fn get_workdays_for_department_and_date(
        &self,
        department_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Workday>> {
        let nodes = self
            .store
            .query_nodes(
                NodeQuery::new(NodeLabel::Workday)
                    .where_property("department", json!(department_id))
                    .where_property("date", json!(format_date(date)))
                    .where_property("active", json!(true)),
            )
            .await?;

        let mut workdays = Vec::with_capacity(nodes.len());
        for node in &nodes {
            workdays.push(self.project(node).await?);
        }
        workdays.sort_by(|a, b| {
            a.workplace_id
                .cmp(&b.workplace_id)
                .then_with(|| a.timeslot_name.cmp(&b.timeslot_name))
        });
        Ok(workdays)
    }

    /// Edit a materialized workday. Inactive workdays can be edited, which
    /// is how they are reactivated.
    pub async fn update_workday(
        &self,
        key: &WorkdayKey,
        update: WorkdayUpdate,
    ) -> Result<Workday> {
        let node = self.store.require_live_node(&key.node_ref()).await?;
        let current = Workday::from_node(&node, None)?;

        let start = update.start_time.unwrap_or(current.start_time);
        let end = update.end_time.unwrap_or(current.end_time);
        let minutes = duration_minutes(start, end)?;

        let mut properties = props([
            ("start_time", json!(format_time(start))),
            ("end_time", json!(format_time(end))),
            ("duration_in_minutes", json!(minutes)),
        ]);
        if let Some(active) = update.active {
            properties.insert("active".to_string(), json!(active));
        }
        if let Some(comment) = update.comment {
            properties.insert("comment".to_string(), json!(comment));
        }

        self.store
            .apply(vec![Mutation::UpdateNode {
                node: key.node_ref(),
                properties,
            }])
            .await?;

        let node = self.store.require_live_node(&key.node_ref()).await?;
        self.project(&node).await
    }

    /// Soft-delete a workday. Synchronization never recreates it.
    pub async fn delete_workday(&self, key: &WorkdayKey) -> Result<()> {
        self.store
            .apply(vec![Mutation::SoftDeleteNode {
                node: key.node_ref(),
            }])
            .await?;
        tracing::info!(workday = %key, "Workday deleted");
        Ok(())
    }

    async fn has_edge(
        &self,
        source: &NodeRef,
        edge_type: EdgeType,
        target: NodeRef,
    ) -> Result<bool> {
        Ok(self.store.get_edge(source, edge_type, &target).await?.is_some())
    }

    async fn visible_workday_node(&self, key: &WorkdayKey) -> Result<Node> {
        self.store
            .get_live_node(&key.node_ref())
            .await?
            .filter(|n| n.get_bool("active") == Some(true))
            .ok_or_else(|| RosterError::not_found(format!("Workday {}", key)))
    }

    async fn project(&self, node: &Node) -> Result<Workday> {
        let mut assignee = None;
        for edge in self
            .store
            .edges_to(&node.node_ref(), EdgeType::AssignedTo)
            .await?
        {
            if let Some(person) = self.store.get_node_by_id(&edge.source_id).await? {
                if !person.is_deleted() {
                    assignee = Some(Assignee::from_node(&person)?);
                    break;
                }
            }
        }
        Workday::from_node(node, assignee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::graph::EmbeddedGraphStore;
    use crate::roster::eligibility::EligibilityGraph;
    use crate::roster::persons::PersonDirectory;
    use crate::roster::sync::Synchronizer;
    use crate::roster::templates::TemplateStore;
    use crate::roster::types::PersonInput;
    use chrono::NaiveTime;

    struct Fixture {
        store: Arc<dyn GraphStore>,
        eligibility: EligibilityGraph,
        sync: Synchronizer,
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    fn key(workplace: &str, timeslot: &str, d: u32) -> WorkdayKey {
        WorkdayKey::new("d1", workplace, timeslot, day(d))
    }

    async fn create_fixture() -> Fixture {
        let store: Arc<dyn GraphStore> = Arc::new(EmbeddedGraphStore::new());
        let templates = TemplateStore::new(store.clone());
        templates.create_department("d1", "Surgery").await.unwrap();
        for (wp, ts) in [("w2", "late"), ("w1", "late"), ("w1", "early")] {
            if templates.get_workplace("d1", wp).await.is_err() {
                templates.create_workplace("d1", wp, wp).await.unwrap();
            }
            templates.create_timeslot("d1", wp, ts, true).await.unwrap();
            templates
                .add_offering("d1", wp, ts, Weekday::Mon, "08:00", "16:00")
                .await
                .unwrap();
        }

        let persons = PersonDirectory::new(store.clone());
        for id in ["p1", "p2"] {
            persons
                .create(PersonInput::new(id, "First", "Last", "person@example.com"))
                .await
                .unwrap();
        }

        let sync = Synchronizer::new(store.clone());
        sync.synchronize_from(day(4), 1).await.unwrap();

        Fixture {
            eligibility: EligibilityGraph::new(store.clone()),
            sync,
            store,
        }
    }

    #[tokio::test]
    async fn test_assign_replaces_previous_assignee() {
        let f = create_fixture().await;
        let manager = AssignmentManager::new(f.store.clone());
        let wd = key("w1", "early", 4);

        manager.assign("p1", &wd).await.unwrap();
        let workday = manager.get_workday(&wd).await.unwrap();
        assert_eq!(workday.person.map(|p| p.id), Some("p1".to_string()));

        manager.assign("p2", &wd).await.unwrap();
        manager.assign("p2", &wd).await.unwrap();
        let assigned = f.store.edges_to(&wd.node_ref(), EdgeType::AssignedTo).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].source_id, person_ref("p2").id());

        manager.unassign("p2", &wd).await.unwrap();
        manager.unassign("p2", &wd).await.unwrap();
        assert!(manager.get_workday(&wd).await.unwrap().person.is_none());
    }

    #[tokio::test]
    async fn test_assign_requires_person_and_workday() {
        let f = create_fixture().await;
        let manager = AssignmentManager::new(f.store.clone());

        let err = manager.assign("ghost", &key("w1", "early", 4)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = manager.assign("p1", &key("w1", "early", 5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        manager
            .update_workday(&key("w1", "early", 4), WorkdayUpdate::default().with_active(false))
            .await
            .unwrap();
        let err = manager.assign("p1", &key("w1", "early", 4)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_enforced_policy_checks_eligibility() {
        let f = create_fixture().await;
        let manager = AssignmentManager::new(f.store.clone())
            .with_policy(AssignmentPolicy::EnforceEligibility);
        let wd = key("w1", "early", 4);

        let err = manager.assign("p1", &wd).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        f.eligibility.add_department_to_person("p1", "d1").await.unwrap();
        f.eligibility.add_workplace_to_person("p1", "d1", "w1").await.unwrap();
        f.eligibility.add_weekday_to_person("p1", "MON").await.unwrap();
        manager.assign("p1", &wd).await.unwrap();

        f.eligibility
            .add_absence_to_person("p1", "2021-01-04", "sick")
            .await
            .unwrap();
        assert!(manager.get_workday(&wd).await.unwrap().person.is_none());
        let err = manager.assign("p1", &wd).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_workdays_for_department_are_ordered() {
        let f = create_fixture().await;
        let manager = AssignmentManager::new(f.store.clone());

        let workdays = manager
            .get_workdays_for_department_and_date("d1", day(4))
            .await
            .unwrap();
        let order: Vec<(&str, &str)> = workdays
            .iter()
            .map(|w| (w.workplace_id.as_str(), w.timeslot_name.as_str()))
            .collect();
        assert_eq!(order, vec![("w1", "early"), ("w1", "late"), ("w2", "late")]);

        assert!(manager
            .get_workdays_for_department_and_date("d1", day(5))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_workday() {
        let f = create_fixture().await;
        let manager = AssignmentManager::new(f.store.clone());
        let wd = key("w1", "early", 4);

        let updated = manager
            .update_workday(
                &wd,
                WorkdayUpdate::times(
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
                )
                .with_comment("short day"),
            )
            .await
            .unwrap();
        assert_eq!(updated.duration_minutes, 270);
        assert_eq!(updated.comment, "short day");

        manager.delete_workday(&wd).await.unwrap();
        f.sync.synchronize_from(day(4), 1).await.unwrap();

        let err = manager.get_workday(&wd).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let listed = manager
            .get_workdays_for_department_and_date("d1", day(4))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
    }
}
