//! Department, workplace, timeslot and offering management.

use std::sync::Arc;

use serde_json::json;

use crate::error::Result;
use crate::graph::{
    EdgeSelector, EdgeType, GraphStore, Mutation, Node, NodeLabel, NodeQuery, NodeRef,
};
use crate::roster::calendar::weekday_mutation;
use crate::roster::types::{
    department_ref, parse_time, props, require_field, timeslot_ref, validate_id, workplace_ref,
    Department, Offering, Timeslot, Weekday, Workplace,
};

// ============================================================================
// Template Store
// ============================================================================

/// Manages the recurring shift templates the synchronizer materializes.
#[derive(Clone)]
pub struct TemplateStore {
    store: Arc<dyn GraphStore>,
}

impl TemplateStore {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    // ========================================================================
    // Departments
    // ========================================================================

    pub async fn create_department(&self, id: &str, name: &str) -> Result<Department> {
        validate_id(id)?;
        require_field("name", name)?;

        self.store
            .apply(vec![Mutation::CreateNode {
                node: department_ref(id),
                properties: props([("name", json!(name))]),
            }])
            .await?;

        tracing::info!(department = id, "Department created");
        self.get_department(id).await
    }

    pub async fn update_department(&self, id: &str, name: &str) -> Result<Department> {
        require_field("name", name)?;
        self.store
            .apply(vec![Mutation::UpdateNode {
                node: department_ref(id),
                properties: props([("name", json!(name))]),
            }])
            .await?;
        self.get_department(id).await
    }

    pub async fn get_department(&self, id: &str) -> Result<Department> {
        let node = self.store.require_live_node(&department_ref(id)).await?;
        Department::from_node(&node)
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        let nodes = self
            .store
            .query_nodes(NodeQuery::new(NodeLabel::Department))
            .await?;
        nodes.iter().map(Department::from_node).collect()
    }

    /// Soft-delete a department. Its workplaces stop being materialized.
    pub async fn delete_department(&self, id: &str) -> Result<()> {
        self.store
            .apply(vec![Mutation::SoftDeleteNode {
                node: department_ref(id),
            }])
            .await?;
        tracing::info!(department = id, "Department deleted");
        Ok(())
    }

    // ========================================================================
    // Workplaces
    // ========================================================================

    pub async fn create_workplace(
        &self,
        department_id: &str,
        id: &str,
        name: &str,
    ) -> Result<Workplace> {
        validate_id(id)?;
        require_field("name", name)?;
        let department = department_ref(department_id);
        self.store.require_live_node(&department).await?;

        let workplace = workplace_ref(department_id, id);
        self.store
            .apply(vec![
                Mutation::CreateNode {
                    node: workplace.clone(),
                    properties: props([
                        ("id", json!(id)),
                        ("department", json!(department_id)),
                        ("name", json!(name)),
                    ]),
                },
                Mutation::merge_edge(department, EdgeType::HasWorkplace, workplace),
            ])
            .await?;

        tracing::info!(department = department_id, workplace = id, "Workplace created");
        self.get_workplace(department_id, id).await
    }

    pub async fn update_workplace(
        &self,
        department_id: &str,
        id: &str,
        name: &str,
    ) -> Result<Workplace> {
        require_field("name", name)?;
        self.store
            .apply(vec![Mutation::UpdateNode {
                node: workplace_ref(department_id, id),
                properties: props([("name", json!(name))]),
            }])
            .await?;
        self.get_workplace(department_id, id).await
    }

    pub async fn get_workplace(&self, department_id: &str, id: &str) -> Result<Workplace> {
        let node = self
            .store
            .require_live_node(&workplace_ref(department_id, id))
            .await?;
        Workplace::from_node(&node)
    }

    pub async fn list_workplaces(&self, department_id: &str) -> Result<Vec<Workplace>> {
        let nodes = self
            .store
            .query_nodes(
                NodeQuery::new(NodeLabel::Workplace)
                    .with_incoming(EdgeType::HasWorkplace, department_ref(department_id)),
            )
            .await?;
        nodes.iter().map(Workplace::from_node).collect()
    }

    pub async fn delete_workplace(&self, department_id: &str, id: &str) -> Result<()> {
        self.store
            .apply(vec![Mutation::SoftDeleteNode {
                node: workplace_ref(department_id, id),
            }])
            .await?;
        tracing::info!(department = department_id, workplace = id, "Workplace deleted");
        Ok(())
    }

    // ========================================================================
    // Timeslots
    // ========================================================================

    pub async fn create_timeslot(
        &self,
        department_id: &str,
        workplace_id: &str,
        name: &str,
        active: bool,
    ) -> Result<Timeslot> {
        validate_id(name)?;
        let workplace = workplace_ref(department_id, workplace_id);
        self.store.require_live_node(&department_ref(department_id)).await?;
        self.store.require_live_node(&workplace).await?;

        let timeslot = timeslot_ref(department_id, workplace_id, name);
        self.store
            .apply(vec![
                Mutation::CreateNode {
                    node: timeslot.clone(),
                    properties: props([
                        ("name", json!(name)),
                        ("department", json!(department_id)),
                        ("workplace", json!(workplace_id)),
                        ("active", json!(active)),
                    ]),
                },
                Mutation::merge_edge(workplace, EdgeType::HasTimeslot, timeslot),
            ])
            .await?;

        tracing::info!(
            department = department_id,
            workplace = workplace_id,
            timeslot = name,
            "Timeslot created"
        );
        self.get_timeslot(department_id, workplace_id, name).await
    }

    /// Activate or deactivate a timeslot. Inactive timeslots are skipped by
    /// synchronization.
    pub async fn set_timeslot_active(
        &self,
        department_id: &str,
        workplace_id: &str,
        name: &str,
        active: bool,
    ) -> Result<Timeslot> {
        self.store
            .apply(vec![Mutation::UpdateNode {
                node: timeslot_ref(department_id, workplace_id, name),
                properties: props([("active", json!(active))]),
            }])
            .await?;
        self.get_timeslot(department_id, workplace_id, name).await
    }

    pub async fn get_timeslot(
        &self,
        department_id: &str,
        workplace_id: &str,
        name: &str,
    ) -> Result<Timeslot> {
        let node = self
            .store
            .require_live_node(&timeslot_ref(department_id, workplace_id, name))
            .await?;
        self.timeslot_from_node(&node).await
    }

    pub async fn list_timeslots(
        &self,
        department_id: &str,
        workplace_id: &str,
    ) -> Result<Vec<Timeslot>> {
        let nodes = self
            .store
            .query_nodes(
                NodeQuery::new(NodeLabel::Timeslot).with_incoming(
                    EdgeType::HasTimeslot,
                    workplace_ref(department_id, workplace_id),
                ),
            )
            .await?;

        let mut timeslots = Vec::with_capacity(nodes.len());
        for node in &nodes {
            timeslots.push(self.timeslot_from_node(node).await?);
        }
        Ok(timeslots)
    }

    pub async fn delete_timeslot(
        &self,
        department_id: &str,
        workplace_id: &str,
        name: &str,
    ) -> Result<()> {
        self.store
            .apply(vec![Mutation::SoftDeleteNode {
                node: timeslot_ref(department_id, workplace_id, name),
            }])
            .await?;
        tracing::info!(
            department = department_id,
            workplace = workplace_id,
            timeslot = name,
            "Timeslot deleted"
        );
        Ok(())
    }

    // ========================================================================
    // Offerings
    // ========================================================================

    /// Offer a timeslot on a weekday, replacing any existing offering for
    /// that weekday.
    pub async fn add_offering(
        &self,
        department_id: &str,
        workplace_id: &str,
        timeslot_name: &str,
        weekday: Weekday,
        start_time: &str,
        end_time: &str,
    ) -> Result<Offering> {
        let offering = Offering::new(weekday, parse_time(start_time)?, parse_time(end_time)?);
        offering.duration_minutes()?;

        let timeslot = timeslot_ref(department_id, workplace_id, timeslot_name);
        self.store.require_live_node(&timeslot).await?;

        self.store
            .apply(vec![
                weekday_mutation(&weekday),
                Mutation::MergeEdge {
                    source: timeslot,
                    edge_type: EdgeType::OfferedOn,
                    target: weekday.node_ref(),
                    on_create: Default::default(),
                    on_match: offering.edge_properties(),
                },
            ])
            .await?;

        tracing::debug!(
            timeslot = timeslot_name,
            weekday = %weekday,
            "Offering saved"
        );
        Ok(offering)
    }

    pub async fn remove_offering(
        &self,
        department_id: &str,
        workplace_id: &str,
        timeslot_name: &str,
        weekday: Weekday,
    ) -> Result<()> {
        self.store
            .apply(vec![Mutation::DeleteEdges(EdgeSelector::between(
                timeslot_ref(department_id, workplace_id, timeslot_name),
                EdgeType::OfferedOn,
                weekday.node_ref(),
            ))])
            .await?;
        Ok(())
    }

    /// Offerings of a timeslot, Monday first.
    pub async fn offerings_of(&self, timeslot: &NodeRef) -> Result<Vec<Offering>> {
        let mut offerings = Vec::new();
        for edge in self.store.edges_from(timeslot, EdgeType::OfferedOn).await? {
            let weekday_code = edge
                .target_id
                .rsplit(':')
                .next()
                .unwrap_or_default();
            let start = edge.get_str("start_time").unwrap_or_default();
            let end = edge.get_str("end_time").unwrap_or_default();
            offerings.push(Offering::new(
                Weekday::from_code(weekday_code)?,
                parse_time(start)?,
                parse_time(end)?,
            ));
        }
        offerings.sort_by_key(|o| o.weekday);
        Ok(offerings)
    }

    async fn timeslot_from_node(&self, node: &Node) -> Result<Timeslot> {
        let offerings = self.offerings_of(&node.node_ref()).await?;
        Timeslot::from_node(node, offerings)
    }
}
