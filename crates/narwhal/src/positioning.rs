//! Vote-ranked placement.
//!
//! Every content node gets a target distance/angle from the layout center as a pure function of
//! its rank. The first ranks fill fixed rings; the rest continue on an unbounded spiral.

use narwhal_core::{ContentNode, GraphNode, RingConfig};
use std::f64::consts::{PI, TAU};

/// `π(3 − √5)`, about 2.39996 rad. `SQRT_5` is √5 to full `f64` precision; `sqrt` is not
/// usable in a const.
pub const GOLDEN_ANGLE: f64 = PI * (3.0 - SQRT_5);

const SQRT_5: f64 = 2.236_067_977_499_79;

pub fn net_votes(node: &GraphNode) -> i64 {
    node.net_votes()
}

/// Highest net votes first. Stable: ties keep input order.
pub fn rank_by_votes(mut nodes: Vec<ContentNode>) -> Vec<ContentNode> {
    nodes.sort_by(|a, b| b.net_votes().cmp(&a.net_votes()));
    nodes
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub rank: usize,
    pub distance: f64,
    pub angle: f64,
}

impl Placement {
    pub fn position(&self, extra_distance: f64) -> (f64, f64) {
        let d = self.distance + extra_distance;
        (d * self.angle.cos(), d * self.angle.sin())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ring { ring: usize, index: usize, size: usize },
    Spiral { offset: usize },
}

#[derive(Debug, Clone)]
pub struct RingLayout {
    rings: Vec<usize>,
    base_distance: f64,
    ring_increment: f64,
    ring_phase: f64,
}

impl Default for RingLayout {
    fn default() -> Self {
        Self::from_config(&RingConfig::default())
    }
}

impl RingLayout {
    pub fn from_config(cfg: &RingConfig) -> Self {
        Self {
            rings: [cfg.first_ring, cfg.second_ring, cfg.third_ring]
                .into_iter()
                .filter(|&n| n > 0)
                .collect(),
            base_distance: cfg.base_distance.max(0.0),
            ring_increment: cfg.ring_increment.max(1.0),
            ring_phase: cfg.ring_phase,
        }
    }

    pub fn ring_total(&self) -> usize {
        self.rings.iter().sum()
    }

    fn slot(&self, rank: usize) -> Slot {
        let mut start = 0usize;
        for (ring, &size) in self.rings.iter().enumerate() {
            if rank < start + size {
                return Slot::Ring {
                    ring,
                    index: rank - start,
                    size,
                };
            }
            start += size;
        }
        Slot::Spiral {
            offset: rank - start,
        }
    }

    pub fn target_distance(&self, rank: usize) -> f64 {
        match self.slot(rank) {
            Slot::Ring { ring, .. } => self.base_distance + ring as f64 * self.ring_increment,
            Slot::Spiral { offset } => {
                self.base_distance
                    + self.rings.len() as f64 * self.ring_increment
                    + (offset as f64).sqrt() * self.ring_increment
            }
        }
    }

    /// Radians in `[0, 2π)`.
    pub fn target_angle(&self, rank: usize) -> f64 {
        let raw = match self.slot(rank) {
            Slot::Ring { ring, index, size } => {
                TAU * index as f64 / size as f64 + ring as f64 * self.ring_phase
            }
            Slot::Spiral { offset } => {
                offset as f64 * GOLDEN_ANGLE + self.rings.len() as f64 * self.ring_phase
            }
        };
        raw.rem_euclid(TAU)
    }

    pub fn placement(&self, rank: usize) -> Placement {
        Placement {
            rank,
            distance: self.target_distance(rank),
            angle: self.target_angle(rank),
        }
    }
}
