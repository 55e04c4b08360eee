//! Person-to-department, workplace, weekday and absence relationships.
//!
//! Every write is idempotent: adding an existing link merges it, removing a
//! missing link is a no-op.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use crate::error::{Result, RosterError, StorageError};
use crate::graph::{
    Edge, EdgeSelector, EdgeType, GraphStore, Mutation, MutationOutcome, NodeLabel, NodeQuery,
    NodeRef, Properties,
};
use crate::roster::calendar::{date_mutations, weekday_mutation};
use crate::roster::types::{
    date_ref, department_ref, parse_date, person_ref, props, workplace_ref, Absence, Weekday,
};

#[derive(Clone)]
pub struct EligibilityGraph {
    store: Arc<dyn GraphStore>,
}

impl EligibilityGraph {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    async fn live_person(&self, person_id: &str) -> Result<NodeRef> {
        let person = person_ref(person_id);
        self.store.require_live_node(&person).await?;
        Ok(person)
    }

    async fn unlink(&self, source: NodeRef, edge_type: EdgeType, target: NodeRef) -> Result<()> {
        self.store
            .apply(vec![Mutation::DeleteEdges(EdgeSelector::between(
                source, edge_type, target,
            ))])
            .await?;
        Ok(())
    }

    // ========================================================================
    // Departments
    // ========================================================================

    pub async fn add_department_to_person(
        &self,
        person_id: &str,
        department_id: &str,
    ) -> Result<()> {
        let person = self.live_person(person_id).await?;
        let department = department_ref(department_id);
        self.store.require_live_node(&department).await?;

        self.store
            .apply(vec![Mutation::merge_edge(
                person,
                EdgeType::WorksAt,
                department,
            )])
            .await?;
        tracing::debug!(person = person_id, department = department_id, "Department linked");
        Ok(())
    }

    pub async fn remove_department_from_person(
        &self,
        person_id: &str,
        department_id: &str,
    ) -> Result<()> {
        let person = self.live_person(person_id).await?;
        self.unlink(person, EdgeType::WorksAt, department_ref(department_id))
            .await
    }

    // ========================================================================
    // Workplaces
    // ========================================================================

    /// Qualify a person for a workplace of a department.
    ///
    /// A qualification without department membership is stored but has no
    /// effect on department-scoped queries.
    pub async fn add_workplace_to_person(
        &self,
        person_id: &str,
        department_id: &str,
        workplace_id: &str,
    ) -> Result<()> {
        let person = self.live_person(person_id).await?;
        let workplace = workplace_ref(department_id, workplace_id);
        self.store.require_live_node(&workplace).await?;

        let works_at = self
            .store
            .get_edge(&person, EdgeType::WorksAt, &department_ref(department_id))
            .await?;
        if works_at.is_none() {
            tracing::warn!(
                person = person_id,
                department = department_id,
                workplace = workplace_id,
                "Qualifying person for a workplace outside their departments"
            );
        }

        self.store
            .apply(vec![Mutation::merge_edge(
                person,
                EdgeType::QualifiedFor,
                workplace,
            )])
            .await?;
        Ok(())
    }

    pub async fn remove_workplace_from_person(
        &self,
        person_id: &str,
        department_id: &str,
        workplace_id: &str,
    ) -> Result<()> {
        let person = self.live_person(person_id).await?;
        self.unlink(
            person,
            EdgeType::QualifiedFor,
            workplace_ref(department_id, workplace_id),
        )
        .await
    }

    // ========================================================================
    // Weekdays
    // ========================================================================

    pub async fn add_weekday_to_person(&self, person_id: &str, weekday: &str) -> Result<()> {
        let weekday = Weekday::from_code(weekday)?;
        let person = self.live_person(person_id).await?;

        self.store
            .apply(vec![
                weekday_mutation(&weekday),
                Mutation::merge_edge(person, EdgeType::AvailableOn, weekday.node_ref()),
            ])
            .await?;
        Ok(())
    }

    pub async fn remove_weekday_from_person(&self, person_id: &str, weekday: &str) -> Result<()> {
        let weekday = Weekday::from_code(weekday)?;
        let person = self.live_person(person_id).await?;
        self.unlink(person, EdgeType::AvailableOn, weekday.node_ref())
            .await
    }

    // ========================================================================
    // Absences
    // ========================================================================

    /// Record an absence and drop the person's assignments on that date.
    ///
    /// The date record, the absence and the assignment removal are written
    /// in one batch. Re-adding an absence only replaces its reason.
    pub async fn add_absence_to_person(
        &self,
        person_id: &str,
        date: &str,
        reason: &str,
    ) -> Result<Absence> {
        let date = parse_date(date)?;
        let person = self.live_person(person_id).await?;

        let mut mutations = date_mutations(date);
        mutations.push(Mutation::MergeEdge {
            source: person.clone(),
            edge_type: EdgeType::AbsentOn,
            target: date_ref(date),
            on_create: Properties::new(),
            on_match: props([("reason", json!(reason))]),
        });
        mutations.push(Mutation::DeleteEdges(
            EdgeSelector::from(person, EdgeType::AssignedTo)
                .where_target_linked(EdgeType::IsDate, date_ref(date)),
        ));

        let outcomes = self.store.apply(mutations).await?;
        let removed = match outcomes.last() {
            Some(MutationOutcome::EdgesDeleted(n)) => *n,
            _ => 0,
        };
        tracing::info!(
            person = person_id,
            date = %date,
            removed_assignments = removed,
            "Absence recorded"
        );

        self.find_absence(person_id, date).await
    }

    /// Remove an absence. Assignments dropped when it was added stay removed.
    pub async fn remove_absence_from_person(&self, person_id: &str, date: &str) -> Result<()> {
        let date = parse_date(date)?;
        let person = self.live_person(person_id).await?;
        self.unlink(person, EdgeType::AbsentOn, date_ref(date)).await
    }

    pub async fn find_absence(&self, person_id: &str, date: NaiveDate) -> Result<Absence> {
        let edge = self
            .store
            .get_edge(&person_ref(person_id), EdgeType::AbsentOn, &date_ref(date))
            .await?
            .ok_or_else(|| {
                RosterError::not_found(format!("absence of {} on {}", person_id, date))
            })?;
        absence_from_edge(&edge)
    }

    /// Absences of one person between `start` and `end`, inclusive.
    pub async fn find_absences_in_range(
        &self,
        person_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Absence>> {
        let edges = self
            .store
            .edges_from(&person_ref(person_id), EdgeType::AbsentOn)
            .await?;

        let mut absences = Vec::new();
        for edge in &edges {
            let absence = absence_from_edge(edge)?;
            if absence.date >= start && absence.date <= end {
                absences.push(absence);
            }
        }
        absences.sort_by_key(|a| a.date);
        Ok(absences)
    }

    /// Absences on `date` of persons working at a department.
    pub async fn find_all_absences(
        &self,
        department_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Absence>> {
        let date_node = date_ref(date);
        let persons = self
            .store
            .query_nodes(
                NodeQuery::new(NodeLabel::Person)
                    .with_outgoing(EdgeType::WorksAt, department_ref(department_id))
                    .with_outgoing(EdgeType::AbsentOn, date_node.clone()),
            )
            .await?;

        let mut absences = Vec::with_capacity(persons.len());
        for person in &persons {
            if let Some(edge) = self
                .store
                .get_edge(&person.node_ref(), EdgeType::AbsentOn, &date_node)
                .await?
            {
                absences.push(absence_from_edge(&edge)?);
            }
        }
        Ok(absences)
    }
}

fn absence_from_edge(edge: &Edge) -> Result<Absence> {
    let key = |id: &str| -> Result<String> {
        id.split_once(':')
            .map(|(_, key)| key.to_string())
            .ok_or_else(|| StorageError::SchemaMismatch(format!("malformed node id {}", id)).into())
    };

    Ok(Absence {
        person_id: key(&edge.source_id)?,
        date: parse_date(&key(&edge.target_id)?)?,
        reason: edge.get_str("reason").unwrap_or_default().to_string(),
        created_at: edge.created_at,
    })
}
