//! Opacity reveal after settlement.
//!
//! `Hidden -> Revealing -> Revealed`. While revealing, content nodes fade in on staggered windows
//! (ordered by the configured pattern); edges fade in together once the edge delay has passed and
//! every node has begun its fade. An edge is never more opaque than its fainter endpoint. System
//! nodes are opaque throughout.

use crate::positioning::net_votes;
use crate::simulation::SimulationCore;
use narwhal_core::{LayoutConfig, RevealPattern};
use std::cmp::Ordering;
use std::f64::consts::TAU;

/// Share of the reveal duration each node takes to fade in.
pub const NODE_FADE_FRACTION: f64 = 0.3;

pub fn ease_cubic_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    Hidden,
    Revealing,
    Revealed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealState {
    pub phase: RevealPhase,
    pub started_at: Option<f64>,
    pub pattern: RevealPattern,
}

#[derive(Debug, Clone)]
pub struct RevealController {
    state: RevealState,
    duration: f64,
    edge_delay: f64,
    edge_fade: f64,
    /// When edges begin fading, relative to the reveal start. At least `edge_delay`.
    edge_start: f64,
    /// Content node ids in reveal order with their fade start offsets (ms).
    stagger: Vec<(String, f64)>,
    last_progress: f64,
}

impl RevealController {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            state: RevealState {
                phase: RevealPhase::Hidden,
                started_at: None,
                pattern: config.reveal_pattern,
            },
            duration: config.reveal_duration,
            edge_delay: config.edge_reveal_delay_ms(),
            edge_fade: config.edge_fade_duration,
            edge_start: config.edge_reveal_delay_ms(),
            stagger: Vec::new(),
            last_progress: 0.0,
        }
    }

    /// Takes effect on the next reveal; a running reveal keeps its timing.
    pub fn reconfigure(&mut self, config: &LayoutConfig) {
        if self.state.phase == RevealPhase::Revealing {
            return;
        }
        self.state.pattern = config.reveal_pattern;
        self.duration = config.reveal_duration;
        self.edge_delay = config.edge_reveal_delay_ms();
        self.edge_fade = config.edge_fade_duration;
        self.edge_start = self.edge_delay;
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn phase(&self) -> RevealPhase {
        self.state.phase
    }

    pub fn is_animating(&self) -> bool {
        self.state.phase == RevealPhase::Revealing
    }

    fn node_fade(&self) -> f64 {
        self.duration * NODE_FADE_FRACTION
    }

    /// Time from reveal start until every node and edge is opaque.
    pub fn total_duration(&self) -> f64 {
        self.duration.max(self.edge_start + self.edge_fade)
    }

    /// Content node ids in reveal order.
    pub fn order_ids(&self) -> impl Iterator<Item = &str> {
        self.stagger.iter().map(|(id, _)| id.as_str())
    }

    /// Starts revealing from `Hidden`. Returns `false` in any other phase.
    pub fn start(&mut self, now: f64, core: &mut SimulationCore) -> bool {
        if self.state.phase != RevealPhase::Hidden {
            return false;
        }
        self.stagger = self.order(core);
        let span = (self.duration - self.node_fade()).max(0.0);
        let last = self.stagger.len().saturating_sub(1).max(1) as f64;
        for (i, (_, offset)) in self.stagger.iter_mut().enumerate() {
            *offset = span * i as f64 / last;
        }
        let last_offset = self.stagger.last().map_or(0.0, |(_, offset)| *offset);
        self.edge_start = self.edge_delay.max(last_offset);
        self.state.phase = RevealPhase::Revealing;
        self.state.started_at = Some(now);
        self.last_progress = 0.0;
        core.set_content_opacity(0.0);
        core.set_link_opacity(0.0);
        tracing::info!(
            target: "narwhal::reveal",
            nodes = self.stagger.len(),
            pattern = ?self.state.pattern,
            "reveal.started"
        );
        true
    }

    /// Applies opacities for `now`. Returns `true` on the update that completes the reveal.
    pub fn update(&mut self, now: f64, core: &mut SimulationCore) -> bool {
        let (RevealPhase::Revealing, Some(start)) = (self.state.phase, self.state.started_at) else {
            return false;
        };
        let t = (now - start).max(0.0);
        if t >= self.total_duration() {
            self.finish(core);
            return true;
        }

        let fade = self.node_fade();
        for (id, offset) in &self.stagger {
            let local = if fade > 0.0 {
                (t - offset) / fade
            } else {
                1.0
            };
            core.set_node_opacity(id, ease_cubic_out(local));
        }
        let edge_t = if self.edge_fade > 0.0 {
            (t - self.edge_start) / self.edge_fade
        } else if t >= self.edge_start {
            1.0
        } else {
            0.0
        };
        core.set_link_opacity_within_endpoints(ease_cubic_out(edge_t));
        self.last_progress = self.last_progress.max(t / self.total_duration());
        false
    }

    /// Overall progress in `[0, 1]`; never decreases during a reveal, `1` once revealed.
    pub fn progress(&self) -> f64 {
        match self.state.phase {
            RevealPhase::Hidden => 0.0,
            RevealPhase::Revealing => self.last_progress.clamp(0.0, 1.0),
            RevealPhase::Revealed => 1.0,
        }
    }

    /// Jumps straight to fully revealed.
    pub fn force_reveal_all(&mut self, now: f64, core: &mut SimulationCore) {
        if self.state.started_at.is_none() {
            self.state.started_at = Some(now);
        }
        self.finish(core);
    }

    /// Back to hidden: content nodes and edges transparent again.
    pub fn reset(&mut self, core: &mut SimulationCore) {
        self.state.phase = RevealPhase::Hidden;
        self.state.started_at = None;
        self.stagger.clear();
        self.edge_start = self.edge_delay;
        self.last_progress = 0.0;
        core.set_content_opacity(0.0);
        core.set_link_opacity(0.0);
    }

    fn finish(&mut self, core: &mut SimulationCore) {
        self.state.phase = RevealPhase::Revealed;
        self.last_progress = 1.0;
        core.set_content_opacity(1.0);
        core.set_link_opacity(1.0);
        tracing::info!(target: "narwhal::reveal", "reveal.complete");
    }

    fn order(&self, core: &SimulationCore) -> Vec<(String, f64)> {
        struct Key {
            id: String,
            distance: f64,
            angle: f64,
            votes: i64,
        }
        let mut keys: Vec<Key> = core
            .nodes()
            .filter(|n| !n.is_system())
            .map(|n| {
                let (x, y) = n.position();
                Key {
                    id: n.id().to_string(),
                    distance: x.hypot(y),
                    angle: y.atan2(x).rem_euclid(TAU),
                    votes: net_votes(n.node()),
                }
            })
            .collect();

        let by_distance = |a: &Key, b: &Key| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal);
        match self.state.pattern {
            RevealPattern::CenterOut => keys.sort_by(by_distance),
            RevealPattern::VoteRanking => keys.sort_by(|a, b| b.votes.cmp(&a.votes)),
            RevealPattern::SpiralSequence => keys.sort_by(|a, b| {
                a.angle
                    .partial_cmp(&b.angle)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| by_distance(a, b))
            }),
        }
        keys.into_iter().map(|k| (k.id, 0.0)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Orchestrator;
    use narwhal_core::GraphData;
    use serde_json::json;

    const VOTES: [i64; 8] = [3, 8, 1, 6, 4, 7, 2, 5];

    fn core() -> SimulationCore {
        let nodes: Vec<_> = VOTES
            .iter()
            .enumerate()
            .map(|(i, v)| json!({"id": format!("n{i}"), "type": "statement", "data": {"positiveVotes": v}}))
            .collect();
        let data = GraphData::from_value(&json!({ "nodes": nodes })).unwrap();
        let cfg = LayoutConfig::default();
        let mut core = SimulationCore::new(&cfg);
        core.reset(&data);
        core.admit(&Orchestrator::new(&cfg).start(&data, 1));
        core
    }

    fn started(pattern: RevealPattern) -> (RevealController, SimulationCore) {
        let mut core = core();
        let cfg = LayoutConfig {
            reveal_pattern: pattern,
            ..LayoutConfig::default()
        };
        let mut r = RevealController::new(&cfg);
        assert!(r.start(0.0, &mut core));
        (r, core)
    }

    fn polar(core: &SimulationCore, id: &str) -> (f64, f64) {
        let (x, y) = core.node(id).unwrap().position();
        (x.hypot(y), y.atan2(x).rem_euclid(TAU))
    }

    #[test]
    fn vote_ranking_reveals_highest_net_votes_first() {
        let (r, _) = started(RevealPattern::VoteRanking);
        let order: Vec<_> = r.order_ids().collect();
        assert_eq!(order, vec!["n1", "n5", "n3", "n7", "n4", "n0", "n6", "n2"]);
    }

    #[test]
    fn center_out_reveals_inner_ring_first() {
        let (r, core) = started(RevealPattern::CenterOut);
        let order: Vec<_> = r.order_ids().collect();
        let distances: Vec<f64> = order.iter().map(|id| polar(&core, id).0).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));

        let mut inner: Vec<_> = order[..6].to_vec();
        inner.sort_unstable();
        assert_eq!(inner, vec!["n0", "n1", "n3", "n4", "n5", "n7"]);
    }

    #[test]
    fn spiral_sequence_sweeps_by_angle() {
        let (r, core) = started(RevealPattern::SpiralSequence);
        let order: Vec<_> = r.order_ids().collect();
        assert_eq!(order.len(), VOTES.len());
        let polars: Vec<(f64, f64)> = order.iter().map(|id| polar(&core, id)).collect();
        assert!(polars.windows(2).all(|w| {
            w[0].1 < w[1].1 || (w[0].1 == w[1].1 && w[0].0 <= w[1].0)
        }));
    }

    #[test]
    fn edges_wait_for_the_last_node_to_start() {
        let mut core = core();
        let cfg = LayoutConfig {
            reveal_duration: 1000.0,
            edge_reveal_delay: Some(100.0),
            edge_fade_duration: 400.0,
            ..LayoutConfig::default()
        };
        let mut r = RevealController::new(&cfg);
        assert_eq!(r.total_duration(), 1000.0);
        r.start(0.0, &mut core);
        // Last node starts at 0.7 of the duration; edges fade for 400 ms after that.
        assert!((r.total_duration() - 1100.0).abs() < 1e-9);

        r.reset(&mut core);
        assert_eq!(r.total_duration(), 1000.0);
    }

    #[test]
    fn cubic_out_hits_endpoints() {
        assert_eq!(ease_cubic_out(0.0), 0.0);
        assert_eq!(ease_cubic_out(1.0), 1.0);
        assert_eq!(ease_cubic_out(-3.0), 0.0);
        assert_eq!(ease_cubic_out(7.0), 1.0);
        assert!(ease_cubic_out(0.5) > 0.5);
    }

    #[test]
    fn total_duration_covers_edge_fade() {
        let cfg = LayoutConfig {
            reveal_duration: 1000.0,
            edge_reveal_delay: Some(900.0),
            edge_fade_duration: 400.0,
            ..LayoutConfig::default()
        };
        let r = RevealController::new(&cfg);
        assert_eq!(r.total_duration(), 1300.0);
    }
}
