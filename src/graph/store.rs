//! Graph storage trait and the embedded implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, RosterError, StorageError};
use crate::graph::{
    edge_id, Edge, EdgeSelector, EdgeType, GraphStats, Mutation, MutationOutcome, Node, NodeLabel,
    NodeQuery, NodeRef,
};

// ============================================================================
// GraphStore Trait
// ============================================================================

/// Trait for roster graph backends.
///
/// Reads are individually consistent. Writes go through [`GraphStore::apply`],
/// which executes a batch of mutations atomically.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Get a node by address, including soft-deleted nodes.
    async fn get_node(&self, node: &NodeRef) -> Result<Option<Node>>;

    /// Get a node by its globally unique ID.
    async fn get_node_by_id(&self, id: &str) -> Result<Option<Node>>;

    /// Find nodes matching a pattern query, ordered by key.
    async fn query_nodes(&self, query: NodeQuery) -> Result<Vec<Node>>;

    /// Get the edge `source -[edge_type]-> target`.
    async fn get_edge(
        &self,
        source: &NodeRef,
        edge_type: EdgeType,
        target: &NodeRef,
    ) -> Result<Option<Edge>>;

    /// Get all edges of a type leaving a node.
    async fn edges_from(&self, node: &NodeRef, edge_type: EdgeType) -> Result<Vec<Edge>>;

    /// Get all edges of a type arriving at a node.
    async fn edges_to(&self, node: &NodeRef, edge_type: EdgeType) -> Result<Vec<Edge>>;

    /// Apply a batch of mutations atomically.
    ///
    /// If any mutation fails, or a persistent backend cannot store the
    /// result, the whole batch is rolled back and the error is returned.
    async fn apply(&self, mutations: Vec<Mutation>) -> Result<Vec<MutationOutcome>>;

    async fn stats(&self) -> Result<GraphStats>;

    /// Clear all nodes and edges.
    async fn clear(&self) -> Result<()>;

    /// Get a node unless it is missing or soft-deleted.
    async fn get_live_node(&self, node: &NodeRef) -> Result<Option<Node>> {
        Ok(self.get_node(node).await?.filter(|n| !n.is_deleted()))
    }

    /// Like [`GraphStore::get_live_node`], but missing nodes are an error.
    async fn require_live_node(&self, node: &NodeRef) -> Result<Node> {
        self.get_live_node(node)
            .await?
            .ok_or_else(|| RosterError::not_found(node))
    }

    /// Live nodes reached by `edge_type` edges leaving `node`.
    async fn targets_of(&self, node: &NodeRef, edge_type: EdgeType) -> Result<Vec<Node>> {
        let mut targets = Vec::new();
        for edge in self.edges_from(node, edge_type).await? {
            if let Some(target) = self.get_node_by_id(&edge.target_id).await? {
                if !target.is_deleted() {
                    targets.push(target);
                }
            }
        }
        Ok(targets)
    }
}

// ============================================================================
// Internal Data Structure
// ============================================================================

/// Undo record for one primitive change inside a batch.
enum Undo {
    Node { id: String, previous: Option<Node> },
    Edge { id: String, previous: Option<Edge> },
}

#[derive(Debug, Default)]
struct GraphData {
    /// Nodes indexed by ID.
    nodes: HashMap<String, Node>,
    /// Edges indexed by ID.
    edges: HashMap<String, Edge>,
    /// Index: label -> node IDs.
    nodes_by_label: HashMap<NodeLabel, Vec<String>>,
    /// Index: source node ID -> edge IDs.
    edges_by_source: HashMap<String, Vec<String>>,
    /// Index: target node ID -> edge IDs.
    edges_by_target: HashMap<String, Vec<String>>,
}

impl GraphData {
    fn put_node(&mut self, node: Node) -> Option<Node> {
        let id = node.id.clone();
        let label = node.label;
        let previous = self.nodes.insert(id.clone(), node);
        if previous.is_none() {
            self.nodes_by_label.entry(label).or_default().push(id);
        }
        previous
    }

    fn remove_node(&mut self, id: &str) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        if let Some(ids) = self.nodes_by_label.get_mut(&node.label) {
            ids.retain(|n| n != id);
        }
        Some(node)
    }

    fn put_edge(&mut self, edge: Edge) -> Option<Edge> {
        let id = edge.id.clone();
        let source_id = edge.source_id.clone();
        let target_id = edge.target_id.clone();
        let previous = self.edges.insert(id.clone(), edge);
        if previous.is_none() {
            self.edges_by_source
                .entry(source_id)
                .or_default()
                .push(id.clone());
            self.edges_by_target.entry(target_id).or_default().push(id);
        }
        previous
    }

    fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let edge = self.edges.remove(id)?;
        if let Some(ids) = self.edges_by_source.get_mut(&edge.source_id) {
            ids.retain(|e| e != id);
        }
        if let Some(ids) = self.edges_by_target.get_mut(&edge.target_id) {
            ids.retain(|e| e != id);
        }
        Some(edge)
    }

    fn has_edge(&self, source_id: &str, edge_type: EdgeType, target_id: &str) -> bool {
        self.edges
            .contains_key(&edge_id(source_id, edge_type, target_id))
    }

    fn edges_of<'a>(
        &'a self,
        index: &'a HashMap<String, Vec<String>>,
        node_id: &str,
        edge_type: EdgeType,
    ) -> Vec<Edge> {
        index
            .get(node_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.edges.get(id))
                    .filter(|e| e.edge_type == edge_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn select_edges(&self, selector: &EdgeSelector) -> Vec<String> {
        let candidates: Vec<&String> = if let Some(source) = &selector.source {
            self.edges_by_source
                .get(&source.id())
                .map(|ids| ids.iter().collect())
                .unwrap_or_default()
        } else if let Some(target) = &selector.target {
            self.edges_by_target
                .get(&target.id())
                .map(|ids| ids.iter().collect())
                .unwrap_or_default()
        } else {
            self.edges.keys().collect()
        };

        let target_id = selector.target.as_ref().map(|t| t.id());
        let via = selector
            .target_via
            .as_ref()
            .map(|(edge_type, node)| (*edge_type, node.id()));

        candidates
            .into_iter()
            .filter_map(|id| self.edges.get(id))
            .filter(|e| e.edge_type == selector.edge_type)
            .filter(|e| target_id.as_ref().map_or(true, |t| &e.target_id == t))
            .filter(|e| {
                via.as_ref()
                    .map_or(true, |(vt, vn)| self.has_edge(&e.target_id, *vt, vn))
            })
            .map(|e| e.id.clone())
            .collect()
    }

    fn rollback(&mut self, journal: Vec<Undo>) {
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Node { id, previous } => {
                    self.remove_node(&id);
                    if let Some(node) = previous {
                        self.put_node(node);
                    }
                }
                Undo::Edge { id, previous } => {
                    self.remove_edge(&id);
                    if let Some(edge) = previous {
                        self.put_edge(edge);
                    }
                }
            }
        }
    }

    fn live_node(&self, node: &NodeRef) -> Option<&Node> {
        self.nodes.get(&node.id()).filter(|n| !n.is_deleted())
    }

    fn apply_one(
        &mut self,
        mutation: Mutation,
        now: DateTime<Utc>,
        journal: &mut Vec<Undo>,
    ) -> Result<MutationOutcome> {
        match mutation {
            Mutation::MergeNode {
                node,
                on_create,
                on_match,
            } => {
                let id = node.id();
                if let Some(existing) = self.nodes.get(&id) {
                    if on_match.is_empty() {
                        return Ok(MutationOutcome::NodeMatched(node));
                    }
                    let mut updated = existing.clone();
                    updated.properties.extend(on_match);
                    updated.updated_at = now;
                    let previous = self.put_node(updated);
                    journal.push(Undo::Node { id, previous });
                    Ok(MutationOutcome::NodeMatched(node))
                } else {
                    let mut created = Node::new(&node);
                    created.created_at = now;
                    created.updated_at = now;
                    created.properties = on_create;
                    created.properties.extend(on_match);
                    let previous = self.put_node(created);
                    journal.push(Undo::Node { id, previous });
                    Ok(MutationOutcome::NodeCreated(node))
                }
            }

            Mutation::CreateNode { node, properties } => {
                let id = node.id();
                let created = match self.nodes.get(&id) {
                    Some(existing) if !existing.is_deleted() => {
                        return Err(
                            StorageError::Conflict(format!("{} already exists", node)).into()
                        );
                    }
                    Some(existing) => {
                        let mut revived = existing.clone();
                        revived.deleted_at = None;
                        revived.properties.extend(properties);
                        revived.updated_at = now;
                        revived
                    }
                    None => {
                        let mut created = Node::new(&node);
                        created.created_at = now;
                        created.updated_at = now;
                        created.properties = properties;
                        created
                    }
                };
                let previous = self.put_node(created);
                journal.push(Undo::Node { id, previous });
                Ok(MutationOutcome::NodeCreated(node))
            }

            Mutation::UpdateNode { node, properties } => {
                let mut updated = self
                    .live_node(&node)
                    .cloned()
                    .ok_or_else(|| StorageError::NotFound(node.to_string()))?;
                updated.properties.extend(properties);
                updated.updated_at = now;
                let previous = self.put_node(updated);
                journal.push(Undo::Node {
                    id: node.id(),
                    previous,
                });
                Ok(MutationOutcome::NodeUpdated(node))
            }

            Mutation::SoftDeleteNode { node } => {
                let mut deleted = self
                    .live_node(&node)
                    .cloned()
                    .ok_or_else(|| StorageError::NotFound(node.to_string()))?;
                deleted.deleted_at = Some(now);
                deleted.updated_at = now;
                let previous = self.put_node(deleted);
                journal.push(Undo::Node {
                    id: node.id(),
                    previous,
                });
                Ok(MutationOutcome::NodeDeleted(node))
            }

            Mutation::MergeEdge {
                source,
                edge_type,
                target,
                on_create,
                on_match,
            } => {
                for endpoint in [&source, &target] {
                    if !self.nodes.contains_key(&endpoint.id()) {
                        return Err(StorageError::NotFound(endpoint.to_string()).into());
                    }
                }

                let id = edge_id(&source.id(), edge_type, &target.id());
                if let Some(existing) = self.edges.get(&id) {
                    if on_match.is_empty() {
                        return Ok(MutationOutcome::EdgeMatched(id));
                    }
                    let mut updated = existing.clone();
                    updated.properties.extend(on_match);
                    updated.updated_at = now;
                    let previous = self.put_edge(updated);
                    journal.push(Undo::Edge {
                        id: id.clone(),
                        previous,
                    });
                    Ok(MutationOutcome::EdgeMatched(id))
                } else {
                    let mut created = Edge::new(&source, edge_type, &target);
                    created.created_at = now;
                    created.updated_at = now;
                    created.properties = on_create;
                    created.properties.extend(on_match);
                    let previous = self.put_edge(created);
                    journal.push(Undo::Edge {
                        id: id.clone(),
                        previous,
                    });
                    Ok(MutationOutcome::EdgeCreated(id))
                }
            }

            Mutation::DeleteEdges(selector) => {
                let ids = self.select_edges(&selector);
                let count = ids.len();
                for id in ids {
                    let previous = self.remove_edge(&id);
                    journal.push(Undo::Edge { id, previous });
                }
                Ok(MutationOutcome::EdgesDeleted(count))
            }
        }
    }
}

// ============================================================================
// Embedded Implementation
// ============================================================================

/// In-memory graph store with optional persistence.
///
/// All data sits behind a single `RwLock`, so every read sees a consistent
/// graph and every batch runs under one write lock. With persistence
/// enabled, a batch is only kept once the file has been written.
pub struct EmbeddedGraphStore {
    data: RwLock<GraphData>,
    persistence_path: Option<PathBuf>,
}

impl EmbeddedGraphStore {
    /// Create a new in-memory store without persistence.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(GraphData::default()),
            persistence_path: None,
        }
    }

    /// Create a store persisted to `graph.json` under `data_dir`.
    pub async fn with_persistence(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(StorageError::Io)?;

        let persistence_path = data_dir.join("graph.json");
        let store = Self {
            data: RwLock::new(GraphData::default()),
            persistence_path: Some(persistence_path.clone()),
        };

        if persistence_path.exists() {
            store.load_from_file(&persistence_path).await?;
        }

        Ok(store)
    }

    async fn load_from_file(&self, path: &Path) -> Result<()> {
        let content = tokio::fs::read_to_string(path).await?;
        let persisted: PersistenceData = serde_json::from_str(&content)?;

        if persisted.version != PERSISTENCE_VERSION {
            return Err(StorageError::SchemaMismatch(format!(
                "unsupported graph file version {} (expected {})",
                persisted.version, PERSISTENCE_VERSION
            ))
            .into());
        }

        let mut data = self.data.write().await;
        for node in persisted.nodes {
            data.put_node(node);
        }
        for edge in persisted.edges {
            data.put_edge(edge);
        }

        tracing::info!(
            "Loaded {} nodes and {} edges from {}",
            data.nodes.len(),
            data.edges.len(),
            path.display()
        );

        Ok(())
    }

    /// Write `data` to the persistence file, if one is configured.
    ///
    /// Called with the write guard held so the file never lags behind a
    /// batch that callers can already observe.
    async fn persist(&self, data: &GraphData) -> Result<()> {
        let Some(ref path) = self.persistence_path else {
            return Ok(());
        };

        let persisted = PersistenceData {
            version: PERSISTENCE_VERSION,
            nodes: data.nodes.values().cloned().collect(),
            edges: data.edges.values().cloned().collect(),
        };
        let content = serde_json::to_string_pretty(&persisted)?;

        // Write to temp file first, then rename
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, path).await?;

        Ok(())
    }
}

impl Default for EmbeddedGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for EmbeddedGraphStore {
    async fn get_node(&self, node: &NodeRef) -> Result<Option<Node>> {
        let data = self.data.read().await;
        Ok(data.nodes.get(&node.id()).cloned())
    }

    async fn get_node_by_id(&self, id: &str) -> Result<Option<Node>> {
        let data = self.data.read().await;
        Ok(data.nodes.get(id).cloned())
    }

    async fn query_nodes(&self, query: NodeQuery) -> Result<Vec<Node>> {
        let data = self.data.read().await;

        let mut results: Vec<Node> = data
            .nodes_by_label
            .get(&query.label)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| data.nodes.get(id))
                    .filter(|n| query.matches(n, |s, t, g| data.has_edge(s, t, g)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        results.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(results)
    }

    async fn get_edge(
        &self,
        source: &NodeRef,
        edge_type: EdgeType,
        target: &NodeRef,
    ) -> Result<Option<Edge>> {
        let data = self.data.read().await;
        Ok(data
            .edges
            .get(&edge_id(&source.id(), edge_type, &target.id()))
            .cloned())
    }

    async fn edges_from(&self, node: &NodeRef, edge_type: EdgeType) -> Result<Vec<Edge>> {
        let data = self.data.read().await;
        let mut edges = data.edges_of(&data.edges_by_source, &node.id(), edge_type);
        edges.sort_by(|a, b| a.target_id.cmp(&b.target_id));
        Ok(edges)
    }

    async fn edges_to(&self, node: &NodeRef, edge_type: EdgeType) -> Result<Vec<Edge>> {
        let data = self.data.read().await;
        let mut edges = data.edges_of(&data.edges_by_target, &node.id(), edge_type);
        edges.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(edges)
    }

    async fn apply(&self, mutations: Vec<Mutation>) -> Result<Vec<MutationOutcome>> {
        let now = Utc::now();
        let mut data = self.data.write().await;

        let mut journal = Vec::new();
        let mut outcomes = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            match data.apply_one(mutation, now, &mut journal) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    data.rollback(journal);
                    return Err(e);
                }
            }
        }

        if !journal.is_empty() {
            if let Err(e) = self.persist(&data).await {
                tracing::error!("Failed to persist graph, rolling back batch: {}", e);
                data.rollback(journal);
                return Err(e);
            }
        }
        Ok(outcomes)
    }

    async fn stats(&self) -> Result<GraphStats> {
        let data = self.data.read().await;

        let mut nodes_by_label: HashMap<String, usize> = HashMap::new();
        let mut deleted_node_count = 0;
        for node in data.nodes.values() {
            *nodes_by_label.entry(node.label.to_string()).or_default() += 1;
            if node.is_deleted() {
                deleted_node_count += 1;
            }
        }

        let mut edges_by_type: HashMap<String, usize> = HashMap::new();
        for edge in data.edges.values() {
            *edges_by_type.entry(edge.edge_type.to_string()).or_default() += 1;
        }

        Ok(GraphStats {
            node_count: data.nodes.len(),
            nodes_by_label,
            deleted_node_count,
            edge_count: data.edges.len(),
            edges_by_type,
        })
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.data.write().await;
        let cleared = GraphData::default();
        self.persist(&cleared).await?;
        *data = cleared;
        Ok(())
    }
}

// ============================================================================
// Persistence Data Structure
// ============================================================================

const PERSISTENCE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistenceData {
    version: u32,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

// ============================================================================
// Tests
// ============================================================================
