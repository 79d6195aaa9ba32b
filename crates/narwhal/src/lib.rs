#![forbid(unsafe_code)]

//! Headless layout and simulation engine for vote-ranked knowledge graphs.
//!
//! Content nodes are ranked by net votes and dropped onto concentric rings (spiralling outward
//! past the configured ring capacity); a force simulation relaxes the layout, detects when it has
//! come to rest, and hands over to a staggered opacity reveal. Everything runs on a virtual
//! clock owned by a [`Session`], so the engine is deterministic and needs no runtime.
//!
//! Data ingestion and configuration live in `narwhal-core`.

pub mod coords;
pub mod error;
pub mod events;
pub mod links;
pub mod orchestrator;
pub mod positioning;
pub mod radius;
pub mod render;
pub mod reveal;
pub mod schedule;
pub mod session;
pub mod simulation;

pub use coords::{CoordinateSystem, SubscriptionId, ViewTransform};
pub use error::{Error, Result};
pub use events::EngineEvent;
pub use orchestrator::{Admission, AdmittedNode, Orchestrator};
pub use positioning::{Placement, RingLayout, rank_by_votes};
pub use render::{Frame, RenderableLink, RenderableNode};
pub use reveal::{RevealController, RevealPhase, RevealState};
pub use session::Session;
pub use simulation::{SimState, SimulationCore, SyncDecision};

pub use narwhal_core::{GraphData, LayoutConfig, NodeMode, RenderMode, RevealPattern};
