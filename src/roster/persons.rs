//! Person records and eligibility-filtered person queries.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use crate::error::Result;
use crate::graph::{EdgeType, GraphStore, Mutation, Node, NodeLabel, NodeQuery};
use crate::roster::types::{
    date_ref, department_ref, person_ref, workplace_ref, Person, PersonInput, Weekday,
};

// ============================================================================
// Eligibility Filter
// ============================================================================

/// Conjunctive filter over the eligibility graph.
///
/// The department is mandatory. Every optional clause that is set narrows
/// the result further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityFilter {
    pub department_id: String,
    pub workplace_id: Option<String>,
    pub weekday: Option<Weekday>,
    pub not_absent_on: Option<NaiveDate>,
}

impl EligibilityFilter {
    pub fn new(department_id: impl Into<String>) -> Self {
        Self {
            department_id: department_id.into(),
            workplace_id: None,
            weekday: None,
            not_absent_on: None,
        }
    }

    /// Require a qualification for a workplace of the department.
    pub fn qualified_for(mut self, workplace_id: impl Into<String>) -> Self {
        self.workplace_id = Some(workplace_id.into());
        self
    }

    pub fn available_on(mut self, weekday: Weekday) -> Self {
        self.weekday = Some(weekday);
        self
    }

    pub fn not_absent_on(mut self, date: NaiveDate) -> Self {
        self.not_absent_on = Some(date);
        self
    }

    /// Translate into a graph pattern over active, non-deleted persons.
    pub fn to_query(&self) -> NodeQuery {
        let mut query = NodeQuery::new(NodeLabel::Person)
            .where_property("active", json!(true))
            .with_outgoing(EdgeType::WorksAt, department_ref(&self.department_id));

        if let Some(workplace_id) = &self.workplace_id {
            query = query.with_outgoing(
                EdgeType::QualifiedFor,
                workplace_ref(&self.department_id, workplace_id),
            );
        }
        if let Some(weekday) = self.weekday {
            query = query.with_outgoing(EdgeType::AvailableOn, weekday.node_ref());
        }
        if let Some(date) = self.not_absent_on {
            query = query.without_outgoing(EdgeType::AbsentOn, date_ref(date));
        }
        query
    }
}

// ============================================================================
// Person Directory
// ============================================================================

#[derive(Clone)]
pub struct PersonDirectory {
    store: Arc<dyn GraphStore>,
}

impl PersonDirectory {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Create a person. A soft-deleted person with the same ID is revived.
    pub async fn create(&self, input: PersonInput) -> Result<Person> {
        input.validate()?;
        self.store
            .apply(vec![Mutation::CreateNode {
                node: person_ref(&input.id),
                properties: input.properties(),
            }])
            .await?;

        tracing::info!(person = %input.id, "Person created");
        self.find_by_id(&input.id).await
    }

    pub async fn update(&self, input: PersonInput) -> Result<Person> {
        input.validate()?;
        self.store
            .apply(vec![Mutation::UpdateNode {
                node: person_ref(&input.id),
                properties: input.properties(),
            }])
            .await?;
        self.find_by_id(&input.id).await
    }

    /// Get a non-deleted person with their eligibility summary.
    pub async fn find_by_id(&self, id: &str) -> Result<Person> {
        let node = self.store.require_live_node(&person_ref(id)).await?;
        self.person_from_node(&node).await
    }

    /// All active persons working at a department.
    pub async fn find_all(&self, department_id: &str) -> Result<Vec<Person>> {
        self.find_all_by(&EligibilityFilter::new(department_id))
            .await
    }

    /// Active persons satisfying every clause of `filter`.
    pub async fn find_all_by(&self, filter: &EligibilityFilter) -> Result<Vec<Person>> {
        let nodes = self.store.query_nodes(filter.to_query()).await?;
        let mut persons = Vec::with_capacity(nodes.len());
        for node in &nodes {
            persons.push(self.person_from_node(node).await?);
        }
        Ok(persons)
    }

    /// Soft-delete a person. Their edges are kept.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store
            .apply(vec![Mutation::SoftDeleteNode {
                node: person_ref(id),
            }])
            .await?;
        tracing::info!(person = id, "Person deleted");
        Ok(())
    }

    async fn person_from_node(&self, node: &Node) -> Result<Person> {
        let mut person = Person::from_node(node)?;
        let person_node = node.node_ref();

        person.departments = self
            .store
            .targets_of(&person_node, EdgeType::WorksAt)
            .await?
            .into_iter()
            .map(|n| n.key)
            .collect();
        person.workplaces = self
            .store
            .targets_of(&person_node, EdgeType::QualifiedFor)
            .await?
            .into_iter()
            .map(|n| n.key)
            .collect();

        let mut weekdays = Vec::new();
        for node in self
            .store
            .targets_of(&person_node, EdgeType::AvailableOn)
            .await?
        {
            weekdays.push(Weekday::from_code(&node.key)?);
        }
        weekdays.sort();
        person.weekdays = weekdays;

        Ok(person)
    }
}
