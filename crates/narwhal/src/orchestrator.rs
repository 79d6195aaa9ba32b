//! Render orchestration: which nodes are live, and when.
//!
//! Content nodes are ranked once per dataset; every admission places them by their *final* rank,
//! so a node's target never moves between batches. System nodes are always in the first
//! admission.

use crate::positioning::{Placement, RingLayout, rank_by_votes};
use narwhal_core::{ContentNode, GraphData, GraphNode, LayoutConfig, RenderMode, SystemNode};

#[derive(Debug, Clone)]
pub struct AdmittedNode {
    pub node: GraphNode,
    /// `None` for system nodes, which are never vote-ranked.
    pub placement: Option<Placement>,
}

#[derive(Debug, Clone)]
pub struct Admission {
    pub generation: u64,
    /// 1-based batch (or node) number.
    pub step: usize,
    pub nodes: Vec<AdmittedNode>,
    /// Pin admitted content nodes at their target (sequential mode).
    pub pin: bool,
    /// Delay before the next admission; `None` once the dataset is fully admitted.
    pub next_delay: Option<f64>,
    /// Set on exactly one admission per dataset.
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    mode: RenderMode,
    batch_size: usize,
    max_batches: usize,
    batch_delay: f64,
    sequential_delay: f64,
    layout: RingLayout,
    ranked: Vec<ContentNode>,
    system: Vec<SystemNode>,
    admitted: usize,
    steps: usize,
    generation: u64,
    running: bool,
    complete_signalled: bool,
}

impl Orchestrator {
    pub fn new(config: &LayoutConfig) -> Self {
        let mut o = Self {
            mode: config.render_mode,
            batch_size: 1,
            max_batches: 1,
            batch_delay: 0.0,
            sequential_delay: 0.0,
            layout: RingLayout::from_config(&config.rings),
            ranked: Vec::new(),
            system: Vec::new(),
            admitted: 0,
            steps: 0,
            generation: 0,
            running: false,
            complete_signalled: false,
        };
        o.reconfigure(config);
        o
    }

    /// Applies new pacing settings. Never resets the completion signal of the running dataset.
    pub fn reconfigure(&mut self, config: &LayoutConfig) {
        self.mode = config.render_mode;
        self.batch_size = config.batch_size.max(1);
        self.max_batches = config.max_batches.max(1);
        self.batch_delay = config.batch_delay.max(0.0);
        self.sequential_delay = config.sequential_delay.max(0.0);
        self.layout = RingLayout::from_config(&config.rings);
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn layout(&self) -> &RingLayout {
        &self.layout
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_complete(&self) -> bool {
        self.complete_signalled
    }

    pub fn admitted(&self) -> usize {
        self.admitted
    }

    /// Content nodes this dataset will admit in total (batch mode caps it).
    pub fn admission_limit(&self) -> usize {
        match self.mode {
            RenderMode::Batch => self
                .ranked
                .len()
                .min(self.batch_size.saturating_mul(self.max_batches)),
            RenderMode::Standard | RenderMode::Sequential => self.ranked.len(),
        }
    }

    /// Final rank of every content node in the dataset (admitted or not).
    pub fn ranked(&self) -> &[ContentNode] {
        &self.ranked
    }

    pub fn start(&mut self, data: &GraphData, generation: u64) -> Admission {
        let mut content = Vec::new();
        self.system.clear();
        for node in &data.nodes {
            match node {
                GraphNode::Content(c) => content.push(c.clone()),
                GraphNode::System(s) => self.system.push(s.clone()),
            }
        }
        self.ranked = rank_by_votes(content);
        self.admitted = 0;
        self.steps = 0;
        self.generation = generation;
        self.running = true;
        self.complete_signalled = false;

        let limit = self.admission_limit();
        if limit < self.ranked.len() {
            tracing::debug!(
                target: "narwhal::orchestrator",
                total = self.ranked.len(),
                limit,
                "batch.cap_reached"
            );
        }
        self.next_admission(true)
    }

    /// Admits the next batch/node. Stale generations and stopped runs are no-ops. If a
    /// reconfiguration lowered the cap below what is already admitted, the result carries no
    /// nodes and only signals completion.
    pub fn admit_next(&mut self, generation: u64) -> Option<Admission> {
        if generation != self.generation {
            tracing::debug!(
                target: "narwhal::orchestrator",
                stale = generation,
                current = self.generation,
                "admit.ignored=stale_generation"
            );
            return None;
        }
        if !self.running {
            tracing::debug!(target: "narwhal::orchestrator", "admit.ignored=not_running");
            return None;
        }
        if self.admitted >= self.admission_limit() {
            tracing::debug!(
                target: "narwhal::orchestrator",
                admitted = self.admitted,
                limit = self.admission_limit(),
                "admit.cap_lowered"
            );
        }
        Some(self.next_admission(false))
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    fn next_admission(&mut self, first: bool) -> Admission {
        let limit = self.admission_limit();
        let remaining = limit.saturating_sub(self.admitted);
        let take = match self.mode {
            RenderMode::Standard => remaining,
            RenderMode::Batch => self.batch_size.min(remaining),
            RenderMode::Sequential => remaining.min(1),
        };

        let mut nodes = Vec::with_capacity(take + if first { self.system.len() } else { 0 });
        if first {
            nodes.extend(self.system.iter().map(|s| AdmittedNode {
                node: GraphNode::System(s.clone()),
                placement: None,
            }));
        }
        let start = self.admitted;
        for rank in start..start + take {
            nodes.push(AdmittedNode {
                node: GraphNode::Content(self.ranked[rank].clone()),
                placement: Some(self.layout.placement(rank)),
            });
        }
        self.admitted += take;
        self.steps += 1;

        let done = self.admitted >= limit;
        let complete = done && !self.complete_signalled;
        if done {
            self.complete_signalled = true;
            self.running = false;
        }
        let next_delay = (!done).then(|| match self.mode {
            RenderMode::Sequential => self.sequential_delay,
            RenderMode::Batch | RenderMode::Standard => self.batch_delay,
        });

        tracing::debug!(
            target: "narwhal::orchestrator",
            step = self.steps,
            admitted = self.admitted,
            limit,
            "admit.step"
        );

        Admission {
            generation: self.generation,
            step: self.steps,
            nodes,
            pin: self.mode == RenderMode::Sequential,
            next_delay,
            complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> GraphData {
        GraphData::from_value(&json!({
            "nodes": [
                {"id": "low", "type": "statement", "data": {"positiveVotes": 0, "negativeVotes": 5}},
                {"id": "top", "type": "statement", "data": {"positiveVotes": 20}},
                {"id": "nav", "type": "navigation"},
                {"id": "mid", "type": "answer", "data": {"positiveVotes": 10}}
            ]
        }))
        .unwrap()
    }

    fn ids(a: &Admission) -> Vec<&str> {
        a.nodes.iter().map(|n| n.node.id()).collect()
    }

    #[test]
    fn standard_admits_everything_at_once() {
        let mut o = Orchestrator::new(&LayoutConfig::default());
        let a = o.start(&data(), 1);
        assert_eq!(ids(&a), vec!["nav", "top", "mid", "low"]);
        assert!(a.complete);
        assert!(a.next_delay.is_none());
        assert!(o.admit_next(1).is_none());
    }

    #[test]
    fn batch_mode_admits_fixed_groups_by_rank() {
        let cfg = LayoutConfig {
            render_mode: RenderMode::Batch,
            batch_size: 2,
            ..LayoutConfig::default()
        };
        let mut o = Orchestrator::new(&cfg);
        let first = o.start(&data(), 3);
        assert_eq!(ids(&first), vec!["nav", "top", "mid"]);
        assert!(!first.complete);
        assert_eq!(first.next_delay, Some(cfg.batch_delay));

        let second = o.admit_next(3).expect("second batch");
        assert_eq!(ids(&second), vec!["low"]);
        assert_eq!(second.nodes[0].placement.map(|p| p.rank), Some(2));
        assert!(second.complete);
        assert!(o.admit_next(3).is_none());
    }

    #[test]
    fn batch_cap_limits_admitted_nodes() {
        let cfg = LayoutConfig {
            render_mode: RenderMode::Batch,
            batch_size: 1,
            max_batches: 2,
            ..LayoutConfig::default()
        };
        let mut o = Orchestrator::new(&cfg);
        let a = o.start(&data(), 1);
        assert!(!a.complete);
        let b = o.admit_next(1).unwrap();
        assert!(b.complete);
        assert_eq!(o.admitted(), 2);
        assert!(o.admit_next(1).is_none());
    }

    #[test]
    fn sequential_pins_one_node_per_step() {
        let cfg = LayoutConfig {
            render_mode: RenderMode::Sequential,
            ..LayoutConfig::default()
        };
        let mut o = Orchestrator::new(&cfg);
        let a = o.start(&data(), 1);
        assert!(a.pin);
        assert_eq!(ids(&a), vec!["nav", "top"]);
        assert_eq!(a.next_delay, Some(cfg.sequential_delay));
        let mut completes = usize::from(a.complete);
        while let Some(next) = o.admit_next(1) {
            assert_eq!(next.nodes.len(), 1);
            completes += usize::from(next.complete);
        }
        assert_eq!(completes, 1);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let cfg = LayoutConfig {
            render_mode: RenderMode::Sequential,
            ..LayoutConfig::default()
        };
        let mut o = Orchestrator::new(&cfg);
        o.start(&data(), 1);
        o.start(&data(), 2);
        assert!(o.admit_next(1).is_none());
        assert_eq!(o.admitted(), 1);
        assert!(o.admit_next(2).is_some());
    }

    #[test]
    fn reconfigure_mid_run_signals_completion_once() {
        let mut cfg = LayoutConfig {
            render_mode: RenderMode::Sequential,
            ..LayoutConfig::default()
        };
        let mut o = Orchestrator::new(&cfg);
        let first = o.start(&data(), 1);
        assert!(!first.complete);
        cfg.render_mode = RenderMode::Standard;
        o.reconfigure(&cfg);
        let rest = o.admit_next(1).unwrap();
        assert_eq!(ids(&rest), vec!["mid", "low"]);
        assert!(rest.complete);
        o.reconfigure(&cfg);
        assert!(o.admit_next(1).is_none());
        assert!(o.is_complete());
    }

    #[test]
    fn lowering_the_cap_mid_run_still_completes() {
        let mut cfg = LayoutConfig {
            render_mode: RenderMode::Sequential,
            ..LayoutConfig::default()
        };
        let mut o = Orchestrator::new(&cfg);
        o.start(&data(), 1);
        o.admit_next(1).expect("second node");
        assert_eq!(o.admitted(), 2);

        cfg.render_mode = RenderMode::Batch;
        cfg.batch_size = 1;
        cfg.max_batches = 1;
        o.reconfigure(&cfg);
        let last = o.admit_next(1).expect("completion");
        assert!(last.nodes.is_empty());
        assert!(last.complete);
        assert!(last.next_delay.is_none());
        assert_eq!(o.admitted(), 2);
        assert!(o.is_complete());
        assert!(o.admit_next(1).is_none());
    }

    #[test]
    fn system_only_dataset_completes_immediately() {
        let g = GraphData::from_value(&json!({"nodes": [{"id": "c", "type": "control"}]})).unwrap();
        let mut o = Orchestrator::new(&LayoutConfig {
            render_mode: RenderMode::Batch,
            ..LayoutConfig::default()
        });
        let a = o.start(&g, 1);
        assert!(a.complete);
        assert_eq!(ids(&a), vec!["c"]);
    }
}
