//! Composable node pattern queries.

use serde_json::Value;

use crate::graph::{EdgeType, Node, NodeLabel, NodeRef};

/// Edge direction relative to the node being matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `(node) -[edge]-> (other)`
    Outgoing,
    /// `(other) -[edge]-> (node)`
    Incoming,
}

/// A single predicate in a [`NodeQuery`].
#[derive(Debug, Clone)]
pub enum Clause {
    Related {
        edge_type: EdgeType,
        direction: Direction,
        other: NodeRef,
    },
    NotRelated {
        edge_type: EdgeType,
        direction: Direction,
        other: NodeRef,
    },
    PropertyEquals {
        key: String,
        value: Value,
    },
}

/// Conjunctive pattern query over nodes of one label.
///
/// Soft-deleted nodes are excluded unless [`NodeQuery::include_deleted`]
/// is set.
#[derive(Debug, Clone)]
pub struct NodeQuery {
    pub label: NodeLabel,
    pub clauses: Vec<Clause>,
    pub include_deleted: bool,
}

impl NodeQuery {
    pub fn new(label: NodeLabel) -> Self {
        Self {
            label,
            clauses: Vec::new(),
            include_deleted: false,
        }
    }

    /// Require `(node) -[edge_type]-> (target)`.
    pub fn with_outgoing(mut self, edge_type: EdgeType, target: NodeRef) -> Self {
        self.clauses.push(Clause::Related {
            edge_type,
            direction: Direction::Outgoing,
            other: target,
        });
        self
    }

    /// Require `(source) -[edge_type]-> (node)`.
    pub fn with_incoming(mut self, edge_type: EdgeType, source: NodeRef) -> Self {
        self.clauses.push(Clause::Related {
            edge_type,
            direction: Direction::Incoming,
            other: source,
        });
        self
    }

    /// Require that `(node) -[edge_type]-> (target)` does not exist.
    pub fn without_outgoing(mut self, edge_type: EdgeType, target: NodeRef) -> Self {
        self.clauses.push(Clause::NotRelated {
            edge_type,
            direction: Direction::Outgoing,
            other: target,
        });
        self
    }

    pub fn where_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.clauses.push(Clause::PropertyEquals {
            key: key.into(),
            value,
        });
        self
    }

    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Check a node against every clause.
    ///
    /// `has_edge(source_id, edge_type, target_id)` answers edge existence.
    pub fn matches<F>(&self, node: &Node, has_edge: F) -> bool
    where
        F: Fn(&str, EdgeType, &str) -> bool,
    {
        if node.label != self.label {
            return false;
        }
        if node.is_deleted() && !self.include_deleted {
            return false;
        }

        self.clauses.iter().all(|clause| match clause {
            Clause::Related {
                edge_type,
                direction,
                other,
            } => Self::edge_exists(&has_edge, node, *edge_type, *direction, other),
            Clause::NotRelated {
                edge_type,
                direction,
                other,
            } => !Self::edge_exists(&has_edge, node, *edge_type, *direction, other),
            Clause::PropertyEquals { key, value } => node.properties.get(key) == Some(value),
        })
    }

    fn edge_exists<F>(
        has_edge: &F,
        node: &Node,
        edge_type: EdgeType,
        direction: Direction,
        other: &NodeRef,
    ) -> bool
    where
        F: Fn(&str, EdgeType, &str) -> bool,
    {
        let other_id = other.id();
        match direction {
            Direction::Outgoing => has_edge(&node.id, edge_type, &other_id),
            Direction::Incoming => has_edge(&other_id, edge_type, &node.id),
        }
    }
}
