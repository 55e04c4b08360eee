//! Core node, edge and mutation types for the roster graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute map carried by nodes and edges.
pub type Properties = HashMap<String, serde_json::Value>;

// ============================================================================
// Node Types
// ============================================================================

/// The label of a node in the roster graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLabel {
    Department,
    Workplace,
    Timeslot,
    Weekday,
    Date,
    Workday,
    Person,
}

impl NodeLabel {
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeLabel::Department => "Department",
            NodeLabel::Workplace => "Workplace",
            NodeLabel::Timeslot => "Timeslot",
            NodeLabel::Weekday => "Weekday",
            NodeLabel::Date => "Date",
            NodeLabel::Workday => "Workday",
            NodeLabel::Person => "Person",
        }
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Address of a node: its label plus a key unique within that label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub label: NodeLabel,
    pub key: String,
}

impl NodeRef {
    pub fn new(label: NodeLabel, key: impl Into<String>) -> Self {
        Self {
            label,
            key: key.into(),
        }
    }

    /// Globally unique node ID, `Label:key`.
    pub fn id(&self) -> String {
        format!("{}:{}", self.label, self.key)
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.label, self.key)
    }
}

/// A typed node in the roster graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Globally unique ID, derived from label and key.
    pub id: String,
    pub label: NodeLabel,
    pub key: String,
    #[serde(default)]
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the node has been soft-deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Create a new live node for the given address.
    pub fn new(node: &NodeRef) -> Self {
        let now = Utc::now();
        Self {
            id: node.id(),
            label: node.label,
            key: node.key.clone(),
            properties: Properties::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Set a property.
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.label, self.key.clone())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.properties.get(key).and_then(|v| v.as_i64())
    }
}

// ============================================================================
// Edge Types
// ============================================================================

/// The type of a directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Department → Workplace
    HasWorkplace,
    /// Workplace → Timeslot
    HasTimeslot,
    /// Timeslot → Weekday, carries `start_time` and `end_time`
    OfferedOn,
    /// Date → Weekday
    IsOnWeekday,
    /// Workday → Timeslot
    IsTimeslot,
    /// Workday → Date
    IsDate,
    /// Person → Department
    WorksAt,
    /// Person → Workplace
    QualifiedFor,
    /// Person → Weekday
    AvailableOn,
    /// Person → Date, carries `reason`
    AbsentOn,
    /// Person → Workday
    AssignedTo,
    /// Department → Date, records materialization runs
    SynchronizedAt,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::HasWorkplace => "HAS_WORKPLACE",
            EdgeType::HasTimeslot => "HAS_TIMESLOT",
            EdgeType::OfferedOn => "OFFERED_ON",
            EdgeType::IsOnWeekday => "IS_ON_WEEKDAY",
            EdgeType::IsTimeslot => "IS_TIMESLOT",
            EdgeType::IsDate => "IS_DATE",
            EdgeType::WorksAt => "WORKS_AT",
            EdgeType::QualifiedFor => "QUALIFIED_FOR",
            EdgeType::AvailableOn => "AVAILABLE_ON",
            EdgeType::AbsentOn => "ABSENT_ON",
            EdgeType::AssignedTo => "ASSIGNED_TO",
            EdgeType::SynchronizedAt => "SYNCHRONIZED_AT",
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build the deterministic ID of the edge `source -[edge_type]-> target`.
pub fn edge_id(source_id: &str, edge_type: EdgeType, target_id: &str) -> String {
    format!("{}-[{}]->{}", source_id, edge_type.as_str(), target_id)
}

/// A directed, typed edge between two nodes.
///
/// At most one edge of a given type exists between an ordered pair of
/// nodes; the ID is derived from the triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source_id: String,
    pub edge_type: EdgeType,
    pub target_id: String,
    #[serde(default)]
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Edge {
    pub fn new(source: &NodeRef, edge_type: EdgeType, target: &NodeRef) -> Self {
        let now = Utc::now();
        let source_id = source.id();
        let target_id = target.id();
        Self {
            id: edge_id(&source_id, edge_type, &target_id),
            source_id,
            edge_type,
            target_id,
            properties: Properties::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

// ============================================================================
// Mutation Types
// ============================================================================

/// Selects edges for deletion.
#[derive(Debug, Clone)]
pub struct EdgeSelector {
    pub edge_type: EdgeType,
    pub source: Option<NodeRef>,
    pub target: Option<NodeRef>,
    /// Only edges whose target has an outgoing edge of this type to this node.
    pub target_via: Option<(EdgeType, NodeRef)>,
}

impl EdgeSelector {
    /// Select the single edge `source -[edge_type]-> target`.
    pub fn between(source: NodeRef, edge_type: EdgeType, target: NodeRef) -> Self {
        Self {
            edge_type,
            source: Some(source),
            target: Some(target),
            target_via: None,
        }
    }

    /// Select every `edge_type` edge leaving `source`.
    pub fn from(source: NodeRef, edge_type: EdgeType) -> Self {
        Self {
            edge_type,
            source: Some(source),
            target: None,
            target_via: None,
        }
    }

    /// Select every `edge_type` edge arriving at `target`.
    pub fn to(edge_type: EdgeType, target: NodeRef) -> Self {
        Self {
            edge_type,
            source: None,
            target: Some(target),
            target_via: None,
        }
    }

    /// Restrict to targets that are linked to `node` by `via`.
    pub fn where_target_linked(mut self, via: EdgeType, node: NodeRef) -> Self {
        self.target_via = Some((via, node));
        self
    }
}

/// A single write in an atomic batch.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Create the node with `on_create` + `on_match` properties, or apply
    /// `on_match` to the existing node. Never changes soft-delete state.
    MergeNode {
        node: NodeRef,
        on_create: Properties,
        on_match: Properties,
    },
    /// Create a node. Fails with a conflict when a live node exists; a
    /// soft-deleted node is revived with the given properties.
    CreateNode { node: NodeRef, properties: Properties },
    /// Set properties on a live node.
    UpdateNode { node: NodeRef, properties: Properties },
    /// Mark a live node as deleted.
    SoftDeleteNode { node: NodeRef },
    /// Create the edge or apply `on_match` to the existing one. Both
    /// endpoints must exist.
    MergeEdge {
        source: NodeRef,
        edge_type: EdgeType,
        target: NodeRef,
        on_create: Properties,
        on_match: Properties,
    },
    /// Delete every matching edge. Matching nothing is not an error.
    DeleteEdges(EdgeSelector),
}

impl Mutation {
    pub fn merge_node(node: NodeRef) -> Self {
        Mutation::MergeNode {
            node,
            on_create: Properties::new(),
            on_match: Properties::new(),
        }
    }

    pub fn merge_edge(source: NodeRef, edge_type: EdgeType, target: NodeRef) -> Self {
        Mutation::MergeEdge {
            source,
            edge_type,
            target,
            on_create: Properties::new(),
            on_match: Properties::new(),
        }
    }
}

/// What a single mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    NodeCreated(NodeRef),
    NodeMatched(NodeRef),
    NodeUpdated(NodeRef),
    NodeDeleted(NodeRef),
    EdgeCreated(String),
    EdgeMatched(String),
    EdgesDeleted(usize),
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about the graph store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub nodes_by_label: HashMap<String, usize>,
    pub deleted_node_count: usize,
    pub edge_count: usize,
    pub edges_by_type: HashMap<String, usize>,
}
