//! Settlement detection and the settled-position cache.

use narwhal_core::PhysicsConfig;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// `true` when the tick ceiling ended monitoring instead of convergence.
    pub forced: bool,
    /// Monitored ticks until settlement.
    pub ticks: u32,
}

/// Watches per-tick displacements once armed. The tick loop is its only driver.
#[derive(Debug, Clone, Default)]
pub struct SettlementDetector {
    armed: bool,
    ticks: u32,
}

impl SettlementDetector {
    pub fn arm(&mut self) {
        self.armed = true;
        self.ticks = 0;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.ticks = 0;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn observe(
        &mut self,
        displacements: impl ExactSizeIterator<Item = f64>,
        physics: &PhysicsConfig,
    ) -> Option<Settlement> {
        if !self.armed {
            return None;
        }
        self.ticks = self.ticks.saturating_add(1);

        let total = displacements.len();
        let resting = displacements
            .filter(|d| *d < physics.settle_threshold)
            .count();
        let fraction = if total == 0 {
            1.0
        } else {
            resting as f64 / total as f64
        };

        if fraction >= physics.settle_fraction {
            return Some(Settlement {
                forced: false,
                ticks: self.ticks,
            });
        }
        if self.ticks >= physics.max_settle_ticks {
            return Some(Settlement {
                forced: true,
                ticks: self.ticks,
            });
        }
        None
    }
}

/// Positions captured the last time the simulation came to rest.
#[derive(Debug, Clone, Default)]
pub struct SettledPositions {
    positions: FxHashMap<String, (f64, f64)>,
}

impl SettledPositions {
    pub fn get(&self, id: &str) -> Option<(f64, f64)> {
        self.positions.get(id).copied()
    }

    pub fn insert(&mut self, id: &str, position: (f64, f64)) {
        self.positions.insert(id.to_string(), position);
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_detector_never_settles() {
        let mut d = SettlementDetector::default();
        assert!(d.observe([0.0, 0.0].into_iter(), &PhysicsConfig::default()).is_none());
    }

    #[test]
    fn settles_when_enough_nodes_rest() {
        let physics = PhysicsConfig {
            settle_fraction: 0.75,
            ..PhysicsConfig::default()
        };
        let mut d = SettlementDetector::default();
        d.arm();
        assert!(d.observe([0.1, 3.0, 2.0, 0.0].into_iter(), &physics).is_none());
        let s = d.observe([0.1, 0.2, 2.0, 0.0].into_iter(), &physics).unwrap();
        assert_eq!(
            s,
            Settlement {
                forced: false,
                ticks: 2
            }
        );
    }

    #[test]
    fn tick_ceiling_forces_settlement() {
        let physics = PhysicsConfig {
            max_settle_ticks: 3,
            ..PhysicsConfig::default()
        };
        let mut d = SettlementDetector::default();
        d.arm();
        assert!(d.observe([9.0].into_iter(), &physics).is_none());
        assert!(d.observe([9.0].into_iter(), &physics).is_none());
        let s = d.observe([9.0].into_iter(), &physics).unwrap();
        assert!(s.forced);
        assert_eq!(s.ticks, 3);
    }
}
