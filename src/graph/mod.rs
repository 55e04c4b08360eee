//! Typed property graph used as the roster's system of record.
//!
//! Nodes are addressed by `(label, key)` and edges by
//! `(source, type, target)`, so every write can be expressed as an
//! idempotent merge. Writes are submitted as batches of [`Mutation`]s
//! that either apply completely or not at all.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Graph Layer                         │
//! │  ┌───────────────┐ ┌───────────────┐ ┌───────────────┐  │
//! │  │  Node Store   │ │  Adjacency    │ │  NodeQuery    │  │
//! │  │ (label, key)  │ │   indices     │ │  (patterns)   │  │
//! │  └───────────────┘ └───────────────┘ └───────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod query;
mod store;
mod types;

pub use query::{Clause, Direction, NodeQuery};
pub use store::{EmbeddedGraphStore, GraphStore};
pub use types::*;
