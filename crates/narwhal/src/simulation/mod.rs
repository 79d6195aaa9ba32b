//! Simulation core: the authoritative node/link arena, the physics tick, settlement, and
//! gentle sync.
//!
//! Nodes live in one id-indexed arena (`IndexMap`, insertion order = admission order). Nothing
//! outside this module mutates a [`SimNode`]; callers go through [`SimulationCore`] methods.

mod forces;
mod settle;

pub use settle::{Settlement, SettledPositions, SettlementDetector};

use crate::links::{Endpoint, LinkPathCache, reciprocal_links};
use crate::orchestrator::Admission;
use crate::positioning::Placement;
use crate::radius::{RadiusCache, radius_excess};
use indexmap::IndexMap;
use narwhal_core::{GraphData, GraphLink, GraphNode, LayoutConfig, NodeMode, PhysicsConfig};
use rustc_hash::{FxHashMap, FxHashSet};

/// Alpha of a fresh admission.
pub const COLD_START_ALPHA: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    /// No nodes.
    Empty,
    /// The orchestrator is still admitting nodes.
    Dropping,
    /// Everything is admitted; ticking until at rest.
    Settling,
    /// At rest; ticking stopped.
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Same node-id set: fields merged in place, positions held.
    Gentle,
    /// Different id set (or forced): everything is rebuilt.
    Restart,
}

#[derive(Debug, Clone)]
pub struct SimNode {
    pub(crate) node: GraphNode,
    pub(crate) placement: Option<Placement>,
    pub(crate) target: Option<(f64, f64)>,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) vx: f64,
    pub(crate) vy: f64,
    pub(crate) fx: Option<f64>,
    pub(crate) fy: Option<f64>,
    pub(crate) opacity: f64,
    pub(crate) radius: f64,
}

impl SimNode {
    pub fn id(&self) -> &str {
        self.node.id()
    }

    pub fn node(&self) -> &GraphNode {
        &self.node
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn velocity(&self) -> (f64, f64) {
        (self.vx, self.vy)
    }

    pub fn pinned(&self) -> Option<(f64, f64)> {
        match (self.fx, self.fy) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<(f64, f64)> {
        self.target
    }

    pub fn rank(&self) -> Option<usize> {
        self.placement.map(|p| p.rank)
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn mode(&self) -> NodeMode {
        self.node.mode()
    }

    pub fn is_hidden(&self) -> bool {
        self.node.is_hidden()
    }

    pub fn is_system(&self) -> bool {
        matches!(self.node, GraphNode::System(_))
    }

    fn pin_at(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.vx = 0.0;
        self.vy = 0.0;
        self.fx = Some(x);
        self.fy = Some(y);
    }
}

#[derive(Debug, Clone)]
pub struct SimLink {
    pub(crate) link: GraphLink,
    pub(crate) source: usize,
    pub(crate) target: usize,
    pub(crate) curved: bool,
    pub(crate) opacity: f64,
}

impl SimLink {
    pub fn link(&self) -> &GraphLink {
        &self.link
    }

    pub fn id(&self) -> &str {
        &self.link.id
    }

    pub fn source_id(&self) -> &str {
        &self.link.source
    }

    pub fn target_id(&self) -> &str {
        &self.link.target
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn is_curved(&self) -> bool {
        self.curved
    }
}

#[derive(Debug, Clone)]
pub struct SimulationCore {
    physics: PhysicsConfig,
    nodes: IndexMap<String, SimNode>,
    /// Latest upstream copy of every node in the dataset, admitted or not.
    latest: FxHashMap<String, GraphNode>,
    /// Visibility the user chose per node id (`true` = shown). Survives syncs and restarts.
    preferences: FxHashMap<String, bool>,
    all_links: Vec<GraphLink>,
    links: Vec<SimLink>,
    degree: Vec<usize>,
    radius_cache: RadiusCache,
    link_paths: LinkPathCache,
    settled: SettledPositions,
    detector: SettlementDetector,
    state: SimState,
    alpha: f64,
    ticks: u64,
    halted: bool,
    prev_positions: Vec<(f64, f64)>,
    dv: Vec<(f64, f64)>,
}

impl SimulationCore {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            physics: config.physics.clone(),
            nodes: IndexMap::new(),
            latest: FxHashMap::default(),
            preferences: FxHashMap::default(),
            all_links: Vec::new(),
            links: Vec::new(),
            degree: Vec::new(),
            radius_cache: RadiusCache::default(),
            link_paths: LinkPathCache::default(),
            settled: SettledPositions::default(),
            detector: SettlementDetector::default(),
            state: SimState::Empty,
            alpha: 0.0,
            ticks: 0,
            halted: false,
            prev_positions: Vec::new(),
            dv: Vec::new(),
        }
    }

    pub fn reconfigure(&mut self, config: &LayoutConfig) {
        self.physics = config.physics.clone();
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_active(&self) -> bool {
        !self.halted && matches!(self.state, SimState::Dropping | SimState::Settling)
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &SimNode> {
        self.nodes.values()
    }

    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.nodes.get(id)
    }

    pub fn links(&self) -> &[SimLink] {
        &self.links
    }

    pub fn link_path(&self, id: &str) -> Option<&str> {
        self.link_paths.get(id)
    }

    pub fn settled_position(&self, id: &str) -> Option<(f64, f64)> {
        self.settled.get(id)
    }

    pub fn settled_positions(&self) -> &SettledPositions {
        &self.settled
    }

    /// Node count of the whole dataset, including nodes not admitted yet.
    pub fn dataset_len(&self) -> usize {
        self.latest.len()
    }

    /// Full restart: drops every node, link, and cache and takes `data` as the new dataset.
    pub fn reset(&mut self, data: &GraphData) {
        self.nodes.clear();
        self.links.clear();
        self.degree.clear();
        self.radius_cache.clear();
        self.link_paths.clear();
        self.settled.clear();
        self.detector.disarm();
        self.latest = data
            .nodes
            .iter()
            .map(|n| (n.id().to_string(), self.with_preference(n)))
            .collect();
        self.all_links = data.links.clone();
        self.state = SimState::Empty;
        self.alpha = 0.0;
        self.ticks = 0;
        self.halted = false;
    }

    /// Stops ticking for good (until the next [`reset`](Self::reset)).
    pub fn halt(&mut self) {
        self.halted = true;
        self.detector.disarm();
    }

    pub fn admit(&mut self, admission: &Admission) {
        let mut added = 0usize;
        for admitted in &admission.nodes {
            let id = admitted.node.id();
            if self.nodes.contains_key(id) {
                tracing::debug!(target: "narwhal::simulation", id = %id, "admit.skipped=duplicate");
                continue;
            }
            let node = self
                .latest
                .get(id)
                .cloned()
                .unwrap_or_else(|| admitted.node.clone());
            let radius = self.radius_cache.radius_for(
                id,
                node.node_type(),
                node.mode(),
                node.is_hidden(),
            );
            let mut sim = SimNode {
                placement: admitted.placement,
                target: None,
                x: 0.0,
                y: 0.0,
                vx: 0.0,
                vy: 0.0,
                fx: None,
                fy: None,
                opacity: 0.0,
                radius,
                node,
            };
            match &sim.node {
                GraphNode::System(s) => {
                    let (x, y) = s.position.unwrap_or((0.0, 0.0));
                    sim.opacity = 1.0;
                    sim.pin_at(x, y);
                }
                GraphNode::Content(_) => {
                    if let Some(p) = admitted.placement {
                        let (x, y) = p.position(0.0);
                        sim.x = x;
                        sim.y = y;
                    }
                }
            }
            self.nodes.insert(id.to_string(), sim);
            added += 1;
        }

        self.refresh_targets(true);
        if admission.pin {
            for admitted in &admission.nodes {
                if let Some(n) = self.nodes.get_mut(admitted.node.id()) {
                    if let Some((tx, ty)) = n.target {
                        n.pin_at(tx, ty);
                    }
                }
            }
        }
        self.rebuild_links();
        self.refresh_link_paths();

        if added > 0 {
            self.state = SimState::Dropping;
            self.alpha = COLD_START_ALPHA;
        }
        tracing::debug!(
            target: "narwhal::simulation",
            step = admission.step,
            added,
            live = self.nodes.len(),
            links = self.links.len(),
            "admit.applied"
        );
    }

    /// Everything is admitted; settlement monitoring can be armed.
    pub fn mark_render_complete(&mut self) {
        match self.state {
            SimState::Dropping => self.state = SimState::Settling,
            SimState::Empty => {
                // Nothing to simulate: trivially at rest.
                self.state = SimState::Settling;
            }
            SimState::Settling | SimState::Settled => {}
        }
    }

    pub fn arm_settlement(&mut self) {
        if self.state == SimState::Settling && !self.halted {
            self.detector.arm();
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.detector.is_armed()
    }

    /// One physics step. Returns the settlement if this tick brought the graph to rest.
    pub fn tick(&mut self) -> Option<Settlement> {
        if !self.is_active() {
            return None;
        }
        self.ticks += 1;
        let n = self.nodes.len();

        self.prev_positions.clear();
        self.prev_positions
            .extend(self.nodes.values().map(|node| (node.x, node.y)));
        self.dv.clear();
        self.dv.resize(n, (0.0, 0.0));

        self.alpha += (0.0 - self.alpha) * self.physics.alpha_decay;
        if self.alpha < self.physics.alpha_min {
            self.alpha = 0.0;
        }
        let alpha = self.alpha;

        forces::link(
            &self.nodes,
            &self.links,
            &self.degree,
            &self.physics,
            alpha,
            &mut self.dv,
        );
        forces::charge(&self.nodes, &self.physics, alpha, &mut self.dv);
        forces::collide(&self.nodes, &self.physics, &mut self.dv);
        forces::position(&self.nodes, &self.physics, alpha, &mut self.dv);

        let keep = 1.0 - self.physics.velocity_decay;
        for (node, (dvx, dvy)) in self.nodes.values_mut().zip(self.dv.iter().copied()) {
            node.vx = (node.vx + dvx) * keep;
            node.vy = (node.vy + dvy) * keep;
            node.x += node.vx;
            node.y += node.vy;
        }

        // Pinned nodes are restored after integration, so no force can have moved them.
        for node in self.nodes.values_mut() {
            if let Some(fx) = node.fx {
                node.x = fx;
                node.vx = 0.0;
            }
            if let Some(fy) = node.fy {
                node.y = fy;
                node.vy = 0.0;
            }
        }

        self.refresh_link_paths();

        tracing::trace!(
            target: "narwhal::simulation",
            tick = self.ticks,
            alpha,
            "tick"
        );

        let displacements = self
            .nodes
            .values()
            .zip(self.prev_positions.iter())
            .map(|(node, (px, py))| (node.x - px).hypot(node.y - py))
            .collect::<Vec<_>>();
        let settlement = self
            .detector
            .observe(displacements.into_iter(), &self.physics)?;
        self.settle(settlement);
        Some(settlement)
    }

    fn settle(&mut self, settlement: Settlement) {
        self.state = SimState::Settled;
        self.alpha = 0.0;
        self.detector.disarm();
        for node in self.nodes.values_mut() {
            node.vx = 0.0;
            node.vy = 0.0;
        }
        for (id, node) in &self.nodes {
            self.settled.insert(id, (node.x, node.y));
        }
        if settlement.forced {
            tracing::info!(
                target: "narwhal::simulation",
                ticks = settlement.ticks,
                nodes = self.nodes.len(),
                "settlement.forced"
            );
        } else {
            tracing::info!(
                target: "narwhal::simulation",
                ticks = settlement.ticks,
                nodes = self.nodes.len(),
                "settlement.reached"
            );
        }
    }

    /// Gentle sync iff the new dataset has exactly the current node-id set and no restart is
    /// forced.
    pub fn sync_decision(&self, data: &GraphData, force_restart: bool) -> SyncDecision {
        if force_restart {
            return SyncDecision::Restart;
        }
        let incoming: FxHashSet<&str> = data.node_ids().collect();
        let same = incoming.len() == self.latest.len()
            && incoming.iter().all(|id| self.latest.contains_key(*id));
        if same {
            SyncDecision::Gentle
        } else {
            SyncDecision::Restart
        }
    }

    /// Merges non-positional fields from `data` and re-pins every node that has a settled
    /// position there. Never restarts, never clears the settled cache, never adds energy.
    pub fn gentle_sync(&mut self, data: &GraphData) {
        let mut merged = 0usize;
        for incoming in &data.nodes {
            let id = incoming.id();
            let incoming = self.with_preference(incoming);
            self.latest.insert(id.to_string(), incoming.clone());
            let cached = self.settled.get(id);
            let Some(sim) = self.nodes.get_mut(id) else {
                continue;
            };
            sim.node = incoming.clone();
            sim.radius = self.radius_cache.radius_for(
                id,
                incoming.node_type(),
                incoming.mode(),
                incoming.is_hidden(),
            );
            if let Some((x, y)) = cached {
                sim.pin_at(x, y);
            }
            merged += 1;
        }
        self.all_links = data.links.clone();
        self.rebuild_links();
        self.refresh_link_paths();
        tracing::info!(
            target: "narwhal::simulation",
            merged,
            links = self.links.len(),
            "sync.gentle"
        );
    }

    /// Switches a node between preview and detail. Unknown ids are a logged no-op.
    pub fn set_mode(&mut self, id: &str, mode: NodeMode) -> bool {
        let Some(sim) = self.nodes.get_mut(id) else {
            tracing::warn!(target: "narwhal::simulation", id = %id, "set_mode.ignored=unknown_id");
            return false;
        };
        match &mut sim.node {
            GraphNode::Content(c) => c.mode = mode,
            GraphNode::System(s) => s.mode = mode,
        }
        if let Some(latest) = self.latest.get_mut(id) {
            *latest = sim.node.clone();
        }
        self.after_size_change(id);
        true
    }

    /// Overrides a content node's visibility. Unknown ids and system nodes are logged no-ops.
    pub fn set_hidden(&mut self, id: &str, hidden: bool) -> bool {
        let Some(sim) = self.nodes.get_mut(id) else {
            tracing::warn!(target: "narwhal::simulation", id = %id, "set_hidden.ignored=unknown_id");
            return false;
        };
        let GraphNode::Content(c) = &mut sim.node else {
            tracing::warn!(target: "narwhal::simulation", id = %id, "set_hidden.ignored=system_node");
            return false;
        };
        c.visibility_preference = Some(!hidden);
        self.preferences.insert(id.to_string(), !hidden);
        if let Some(latest) = self.latest.get_mut(id) {
            *latest = sim.node.clone();
        }
        self.after_size_change(id);
        true
    }

    /// The user's visibility preference for `id`, if one was set.
    pub fn visibility_preference(&self, id: &str) -> Option<bool> {
        self.preferences.get(id).copied()
    }

    fn with_preference(&self, node: &GraphNode) -> GraphNode {
        let mut node = node.clone();
        let show = self.preferences.get(node.id()).copied();
        if let (GraphNode::Content(c), Some(show)) = (&mut node, show) {
            c.visibility_preference = Some(show);
        }
        node
    }

    fn after_size_change(&mut self, id: &str) {
        if let Some(sim) = self.nodes.get_mut(id) {
            self.radius_cache.invalidate(id);
            sim.radius = self.radius_cache.radius_for(
                id,
                sim.node.node_type(),
                sim.node.mode(),
                sim.node.is_hidden(),
            );
        }
        self.refresh_targets(false);
        self.refresh_link_paths();
        self.wake();
    }

    /// Adds a little energy so the layout relaxes around a changed node.
    pub fn wake(&mut self) {
        if self.halted || self.nodes.is_empty() {
            return;
        }
        self.alpha = self.alpha.max(self.physics.wake_alpha);
        if self.state == SimState::Settled {
            self.state = SimState::Settling;
            self.detector.arm();
        }
    }

    pub(crate) fn set_node_opacity(&mut self, id: &str, opacity: f64) {
        if let Some(n) = self.nodes.get_mut(id) {
            n.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub(crate) fn set_content_opacity(&mut self, opacity: f64) {
        let opacity = opacity.clamp(0.0, 1.0);
        for n in self.nodes.values_mut() {
            n.opacity = if n.is_system() { 1.0 } else { opacity };
        }
    }

    pub(crate) fn set_link_opacity(&mut self, opacity: f64) {
        let opacity = opacity.clamp(0.0, 1.0);
        for l in &mut self.links {
            l.opacity = opacity;
        }
    }

    /// Like [`set_link_opacity`](Self::set_link_opacity), but each link is capped at the opacity
    /// of its fainter endpoint.
    pub(crate) fn set_link_opacity_within_endpoints(&mut self, opacity: f64) {
        let opacity = opacity.clamp(0.0, 1.0);
        for l in &mut self.links {
            let a = self.nodes[l.source].opacity;
            let b = self.nodes[l.target].opacity;
            l.opacity = opacity.min(a).min(b);
        }
    }

    /// Recomputes targets from placements plus the room needed by enlarged nodes closer to the
    /// center. With `initial`, nodes without a target yet are placed too; pinned nodes follow
    /// their target by the same delta.
    fn refresh_targets(&mut self, initial: bool) {
        let central_excess = self
            .nodes
            .values()
            .filter(|n| n.is_system() && n.node.node_type().is_central())
            .filter(|n| n.pinned().is_some_and(|(x, y)| x.hypot(y) < 1.0))
            .map(|n| excess_of(&n.node))
            .fold(0.0f64, f64::max);

        let mut ranked: Vec<(usize, usize, f64)> = self
            .nodes
            .values()
            .enumerate()
            .filter_map(|(idx, n)| n.placement.map(|p| (p.rank, idx, excess_of(&n.node))))
            .collect();
        ranked.sort_by_key(|&(rank, idx, _)| (rank, idx));

        let mut inner_max = 0.0f64;
        for (_, idx, excess) in ranked {
            let offset = central_excess + inner_max;
            inner_max = inner_max.max(excess);
            let Some((_, node)) = self.nodes.get_index_mut(idx) else {
                continue;
            };
            let Some(p) = node.placement else {
                continue;
            };
            let next = p.position(offset);
            let previous = node.target;
            match previous {
                Some(prev) if node.pinned().is_some() => {
                    let (dx, dy) = (next.0 - prev.0, next.1 - prev.1);
                    if dx != 0.0 || dy != 0.0 {
                        let (px, py) = (node.x + dx, node.y + dy);
                        node.pin_at(px, py);
                    }
                }
                None if initial => {
                    node.x = next.0;
                    node.y = next.1;
                }
                _ => {}
            }
            node.target = Some(next);
        }
    }

    fn rebuild_links(&mut self) {
        let reciprocal = reciprocal_links(&self.all_links);
        self.links.clear();
        self.degree.clear();
        self.degree.resize(self.nodes.len(), 0);
        let mut dropped = 0usize;
        for link in &self.all_links {
            let (Some(s), Some(t)) = (
                self.nodes.get_index_of(link.source.as_str()),
                self.nodes.get_index_of(link.target.as_str()),
            ) else {
                // Endpoint not admitted yet, or not in the dataset at all.
                if !(self.latest.contains_key(&link.source) && self.latest.contains_key(&link.target)) {
                    dropped += 1;
                }
                continue;
            };
            self.degree[s] += 1;
            self.degree[t] += 1;
            self.links.push(SimLink {
                curved: reciprocal.contains(&link.id),
                opacity: 0.0,
                link: link.clone(),
                source: s,
                target: t,
            });
        }
        if dropped > 0 {
            tracing::warn!(target: "narwhal::simulation", dropped, "links.dropped=dangling");
        }
    }

    fn refresh_link_paths(&mut self) {
        let factor = self.physics.perimeter_radius_factor;
        for l in &self.links {
            let a = &self.nodes[l.source];
            let b = &self.nodes[l.target];
            self.link_paths.path_for(
                &l.link.id,
                Endpoint {
                    x: a.x,
                    y: a.y,
                    radius: a.radius,
                },
                Endpoint {
                    x: b.x,
                    y: b.y,
                    radius: b.radius,
                },
                l.curved,
                factor,
            );
        }
        let live: FxHashSet<&str> = self.links.iter().map(|l| l.link.id.as_str()).collect();
        self.link_paths.retain(&live);
    }
}

fn excess_of(node: &GraphNode) -> f64 {
    radius_excess(node.node_type(), node.mode(), node.is_hidden())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Orchestrator;
    use serde_json::json;

    fn graph() -> GraphData {
        GraphData::from_value(&json!({
            "nodes": [
                {"id": "A", "type": "statement", "data": {"positiveVotes": 4}},
                {"id": "B", "type": "answer", "data": {"positiveVotes": 2}},
                {"id": "nav", "type": "navigation"}
            ],
            "links": [
                {"source": "A", "target": "B", "type": "related"},
                {"source": "A", "target": "ghost", "type": "related"}
            ]
        }))
        .unwrap()
    }

    fn loaded(data: &GraphData) -> SimulationCore {
        let cfg = LayoutConfig::default();
        let mut core = SimulationCore::new(&cfg);
        core.reset(data);
        let admission = Orchestrator::new(&cfg).start(data, 1);
        core.admit(&admission);
        core
    }

    #[test]
    fn gentle_sync_is_idempotent_and_holds_positions() {
        let data = graph();
        let mut core = loaded(&data);
        core.settled.insert("A", (12.0, 7.0));
        core.settled.insert("B", (-4.0, 9.0));
        assert_eq!(core.sync_decision(&data, false), SyncDecision::Gentle);

        core.gentle_sync(&data);
        let once: Vec<_> = core.nodes().map(|n| (n.id().to_string(), n.position())).collect();
        core.gentle_sync(&data);
        let twice: Vec<_> = core.nodes().map(|n| (n.id().to_string(), n.position())).collect();

        assert_eq!(once, twice);
        assert_eq!(core.node("A").unwrap().position(), (12.0, 7.0));
        assert_eq!(core.node("B").unwrap().position(), (-4.0, 9.0));
        assert_eq!(core.settled_position("A"), Some((12.0, 7.0)));
    }

    #[test]
    fn changed_id_set_means_restart() {
        let data = graph();
        let core = loaded(&data);
        let mut other = data.clone();
        other.nodes.pop();
        assert_eq!(core.sync_decision(&other, false), SyncDecision::Restart);
        assert_eq!(core.sync_decision(&data, true), SyncDecision::Restart);
    }

    #[test]
    fn pinned_nodes_never_move_during_ticks() {
        let data = graph();
        let mut core = loaded(&data);
        for _ in 0..50 {
            core.tick();
        }
        assert_eq!(core.node("nav").unwrap().position(), (0.0, 0.0));
    }

    #[test]
    fn dangling_links_are_dropped() {
        let core = loaded(&graph());
        let ids: Vec<_> = core.links().iter().map(|l| l.id()).collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(core.links()[0].source_id(), "A");
        assert!(core.link_path(ids[0]).is_some_and(|p| p.starts_with('M')));
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut core = loaded(&graph());
        let alpha = core.alpha();
        assert!(!core.set_mode("nope", NodeMode::Detail));
        assert!(!core.set_hidden("nope", true));
        assert!(!core.set_hidden("nav", true));
        assert_eq!(core.alpha(), alpha);
    }

    #[test]
    fn detail_mode_grows_radius_and_wakes() {
        let mut core = loaded(&graph());
        let before = core.node("A").unwrap().radius();
        core.mark_render_complete();
        core.arm_settlement();
        let mut settled = false;
        for _ in 0..400 {
            if core.tick().is_some() {
                settled = true;
                break;
            }
        }
        assert!(settled);
        assert_eq!(core.state(), SimState::Settled);

        assert!(core.set_mode("A", NodeMode::Detail));
        assert!(core.node("A").unwrap().radius() > before);
        assert_eq!(core.state(), SimState::Settling);
        assert!(core.alpha() >= core.physics().wake_alpha);
    }

    #[test]
    fn visibility_choice_survives_gentle_sync_and_reset() {
        let data = graph();
        let mut core = loaded(&data);
        assert!(!core.node("A").unwrap().is_hidden());
        assert!(core.set_hidden("A", true));

        core.gentle_sync(&data);
        assert!(core.node("A").unwrap().is_hidden());
        assert_eq!(core.visibility_preference("A"), Some(false));

        core.reset(&data);
        core.admit(&Orchestrator::new(&LayoutConfig::default()).start(&data, 2));
        assert!(core.node("A").unwrap().is_hidden());
        assert!(!core.node("B").unwrap().is_hidden());
    }

    #[test]
    fn link_opacity_is_capped_by_the_fainter_endpoint() {
        let mut core = loaded(&graph());
        core.set_content_opacity(0.0);
        core.set_node_opacity("A", 0.8);
        core.set_node_opacity("B", 0.25);
        core.set_link_opacity_within_endpoints(1.0);
        assert_eq!(core.links()[0].opacity(), 0.25);
        core.set_link_opacity_within_endpoints(0.1);
        assert_eq!(core.links()[0].opacity(), 0.1);
    }

    #[test]
    fn settlement_is_forced_at_the_tick_ceiling() {
        let mut cfg = LayoutConfig::default();
        cfg.physics.settle_threshold = 0.0;
        cfg.physics.max_settle_ticks = 5;
        let data = graph();
        let mut core = SimulationCore::new(&cfg);
        core.reset(&data);
        core.admit(&Orchestrator::new(&cfg).start(&data, 1));
        core.mark_render_complete();
        core.arm_settlement();
        let outcome = (0..10).find_map(|_| core.tick());
        assert_eq!(
            outcome,
            Some(Settlement {
                forced: true,
                ticks: 5
            })
        );
    }
}
