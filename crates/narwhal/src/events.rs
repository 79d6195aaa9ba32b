//! Engine lifecycle events.

use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineEvent {
    /// The first admission of a dataset is in the simulation.
    RenderReady { generation: u64, at: f64 },
    /// The orchestrator admitted its last node. Fires once per dataset.
    RenderComplete { generation: u64, at: f64 },
    /// The simulation came to rest (or hit the tick ceiling). Fires once per dataset.
    SettlementReached {
        generation: u64,
        at: f64,
        forced: bool,
        ticks: u32,
    },
    /// Every node and edge is fully opaque.
    RevealComplete { generation: u64, at: f64 },
}

impl EngineEvent {
    pub fn generation(&self) -> u64 {
        match *self {
            Self::RenderReady { generation, .. }
            | Self::RenderComplete { generation, .. }
            | Self::SettlementReached { generation, .. }
            | Self::RevealComplete { generation, .. } => generation,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RenderReady { .. } => "renderReady",
            Self::RenderComplete { .. } => "renderComplete",
            Self::SettlementReached { .. } => "settlementReached",
            Self::RevealComplete { .. } => "revealComplete",
        }
    }
}

/// Single typed channel: producers `emit`, the session drains and dispatches, and every event
/// is kept in an append-only log for consumers.
#[derive(Debug, Clone, Default)]
pub struct EventChannel {
    pending: VecDeque<EngineEvent>,
    log: Vec<EngineEvent>,
}

impl EventChannel {
    pub fn emit(&mut self, event: EngineEvent) {
        self.pending.push_back(event);
        self.log.push(event);
    }

    pub fn next_pending(&mut self) -> Option<EngineEvent> {
        self.pending.pop_front()
    }

    pub fn log(&self) -> &[EngineEvent] {
        &self.log
    }

    pub fn count(&self, name: &str) -> usize {
        self.log.iter().filter(|e| e.name() == name).count()
    }
}
