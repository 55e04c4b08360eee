//! Shared setup for the integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use roster::error::StorageError;
use roster::graph::{
    Edge, EdgeType, GraphStats, GraphStore, Mutation, MutationOutcome, Node, NodeQuery, NodeRef,
};
use roster::{Config, EmbeddedGraphStore, PersonInput, RosterService, Weekday};

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

/// A service on an in-memory graph.
pub async fn create_service(config: Config) -> RosterService {
    let store: Arc<dyn GraphStore> = Arc::new(EmbeddedGraphStore::new());
    RosterService::new(store, config).await.unwrap()
}

/// Department `d1` with workplace `w1` and timeslot `day` offered
/// Monday to Wednesday from 08:00 to 16:00.
pub async fn seed_templates(service: &RosterService) {
    let templates = service.templates();
    templates.create_department("d1", "Surgery").await.unwrap();
    templates.create_workplace("d1", "w1", "Theatre 1").await.unwrap();
    templates.create_timeslot("d1", "w1", "day", true).await.unwrap();
    for weekday in [Weekday::Mon, Weekday::Tue, Weekday::Wed] {
        templates
            .add_offering("d1", "w1", "day", weekday, "08:00", "16:00")
            .await
            .unwrap();
    }
}

pub async fn seed_person(service: &RosterService, id: &str) {
    service
        .persons()
        .create(PersonInput::new(id, "First", id, format!("{}@example.com", id)))
        .await
        .unwrap();
}

/// Delegates to an embedded store. Once armed, `apply` succeeds for the
/// given number of calls and fails afterwards.
pub struct FailingStore {
    inner: EmbeddedGraphStore,
    remaining: Mutex<Option<usize>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            inner: EmbeddedGraphStore::new(),
            remaining: Mutex::new(None),
        }
    }

    pub fn fail_after(&self, calls: usize) {
        *self.remaining.lock().unwrap() = Some(calls);
    }
}

#[async_trait]
impl GraphStore for FailingStore {
    async fn get_node(&self, node: &NodeRef) -> roster::Result<Option<Node>> {
        self.inner.get_node(node).await
    }

    async fn get_node_by_id(&self, id: &str) -> roster::Result<Option<Node>> {
        self.inner.get_node_by_id(id).await
    }

    async fn query_nodes(&self, query: NodeQuery) -> roster::Result<Vec<Node>> {
        self.inner.query_nodes(query).await
    }

    async fn get_edge(
        &self,
        source: &NodeRef,
        edge_type: EdgeType,
        target: &NodeRef,
    ) -> roster::Result<Option<Edge>> {
        self.inner.get_edge(source, edge_type, target).await
    }

    async fn edges_from(&self, node: &NodeRef, edge_type: EdgeType) -> roster::Result<Vec<Edge>> {
        self.inner.edges_from(node, edge_type).await
    }

    async fn edges_to(&self, node: &NodeRef, edge_type: EdgeType) -> roster::Result<Vec<Edge>> {
        self.inner.edges_to(node, edge_type).await
    }

    async fn apply(&self, mutations: Vec<Mutation>) -> roster::Result<Vec<MutationOutcome>> {
        {
            let mut remaining = self.remaining.lock().unwrap();
            match remaining.as_mut() {
                Some(0) => {
                    return Err(StorageError::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "store unavailable",
                    ))
                    .into())
                }
                Some(n) => *n -= 1,
                None => {}
            }
        }
        self.inner.apply(mutations).await
    }

    async fn stats(&self) -> roster::Result<GraphStats> {
        self.inner.stats().await
    }

    async fn clear(&self) -> roster::Result<()> {
        self.inner.clear().await
    }
}
