#![forbid(unsafe_code)]

//! Vote-ranked knowledge-graph data model (headless).
//!
//! This crate owns everything that happens before layout: ingesting loosely-typed upstream
//! payloads into [`GraphData`], normalizing numeric fields, and the [`LayoutConfig`] that the
//! `narwhal` engine runs with.

pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod number;

pub use config::{LayoutConfig, PhysicsConfig, RenderMode, RevealPattern, RingConfig};
pub use error::{Error, Result};
pub use ingest::{IngestOptions, ingest};
pub use model::{
    ContentNode, GraphData, GraphLink, GraphNode, LinkKind, LinkMetadata, NodeMode, NodeType,
    SystemNode, VoteCounts,
};
pub use number::{normalize_count, normalize_field, normalize_number};
