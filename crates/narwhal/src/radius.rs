//! Node radii in world units.

use narwhal_core::{NodeMode, NodeType};
use rustc_hash::FxHashMap;

pub const DEFAULT_RADIUS: f64 = 40.0;
/// Hidden content nodes collapse to a small marker regardless of type or mode.
pub const HIDDEN_RADIUS: f64 = 20.0;

pub fn base_radius(node_type: NodeType, mode: NodeMode) -> f64 {
    let (preview, detail) = match node_type {
        NodeType::Statement
        | NodeType::OpenQuestion
        | NodeType::Answer
        | NodeType::Quantity
        | NodeType::Evidence => (50.0, 160.0),
        NodeType::Word | NodeType::Definition | NodeType::Category => (45.0, 140.0),
        NodeType::Comment => (35.0, 110.0),
        NodeType::Navigation => (28.0, 28.0),
        NodeType::Dashboard | NodeType::Control => (45.0, 180.0),
        NodeType::CreateNode | NodeType::EditProfile => (40.0, 200.0),
        NodeType::Unknown => (DEFAULT_RADIUS, DEFAULT_RADIUS),
    };
    match mode {
        NodeMode::Preview => preview,
        NodeMode::Detail => detail,
    }
}

/// Radius after mode and hidden-state adjustments; what layout and edge clipping use.
pub fn effective_radius(node_type: NodeType, mode: NodeMode, hidden: bool) -> f64 {
    if hidden && !node_type.is_system() {
        HIDDEN_RADIUS
    } else {
        base_radius(node_type, mode)
    }
}

/// How much larger than its preview footprint a node currently is.
pub fn radius_excess(node_type: NodeType, mode: NodeMode, hidden: bool) -> f64 {
    (effective_radius(node_type, mode, hidden) - base_radius(node_type, NodeMode::Preview)).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RadiusEntry {
    node_type: NodeType,
    mode: NodeMode,
    hidden: bool,
    radius: f64,
}

/// Per-node memo of [`effective_radius`]. Entries are revalidated against the node's current
/// type/mode/hidden state on every lookup.
#[derive(Debug, Clone, Default)]
pub struct RadiusCache {
    entries: FxHashMap<String, RadiusEntry>,
}

impl RadiusCache {
    pub fn radius_for(&mut self, id: &str, node_type: NodeType, mode: NodeMode, hidden: bool) -> f64 {
        if let Some(e) = self.entries.get(id) {
            if e.node_type == node_type && e.mode == mode && e.hidden == hidden {
                return e.radius;
            }
        }
        let radius = effective_radius(node_type, mode, hidden);
        self.entries.insert(
            id.to_string(),
            RadiusEntry {
                node_type,
                mode,
                hidden,
                radius,
            },
        );
        radius
    }

    pub fn invalidate(&mut self, id: &str) {
        self.entries.remove(id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_content_collapses_but_system_does_not() {
        assert_eq!(
            effective_radius(NodeType::Statement, NodeMode::Detail, true),
            HIDDEN_RADIUS
        );
        assert_eq!(
            effective_radius(NodeType::Control, NodeMode::Preview, true),
            base_radius(NodeType::Control, NodeMode::Preview)
        );
    }

    #[test]
    fn detail_is_larger_than_preview_for_content() {
        for t in [NodeType::Statement, NodeType::Word, NodeType::Comment] {
            assert!(base_radius(t, NodeMode::Detail) > base_radius(t, NodeMode::Preview));
            assert!(radius_excess(t, NodeMode::Detail, false) > 0.0);
            assert_eq!(radius_excess(t, NodeMode::Preview, false), 0.0);
        }
    }

    #[test]
    fn cache_tracks_mode_changes() {
        let mut cache = RadiusCache::default();
        let a = cache.radius_for("a", NodeType::Answer, NodeMode::Preview, false);
        let b = cache.radius_for("a", NodeType::Answer, NodeMode::Detail, false);
        assert!(b > a);
        assert_eq!(cache.len(), 1);
        cache.invalidate("a");
        assert!(cache.is_empty());
    }
}
