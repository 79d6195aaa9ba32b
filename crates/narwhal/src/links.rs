//! Edge geometry: perimeter-clipped paths and the link-path cache.

use crate::coords::perimeter_point;
use narwhal_core::{GraphLink, LinkMetadata};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::Write as _;

/// Sideways bow (world units) of each edge in a reciprocal pair.
pub const CURVE_OFFSET: f64 = 28.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Builds an SVG path from the perimeter of `source` to the perimeter of `target`.
///
/// Straight edges are `M x1,y1 L x2,y2`. Curved edges are a quadratic bowed to the left of the
/// travel direction; since the reverse edge travels the other way it bows to the other side.
pub fn link_path(source: Endpoint, target: Endpoint, curved: bool, factor: f64) -> String {
    let s = (source.x, source.y);
    let t = (target.x, target.y);
    let mut out = String::with_capacity(48);

    if curved && (t.0 - s.0).hypot(t.1 - s.1) > f64::EPSILON {
        let (cx, cy) = control_point(s, t);
        let start = perimeter_point((cx, cy), s, source.radius, factor);
        let end = perimeter_point((cx, cy), t, target.radius, factor);
        let _ = write!(
            out,
            "M{:.2},{:.2}Q{:.2},{:.2} {:.2},{:.2}",
            start.0, start.1, cx, cy, end.0, end.1
        );
    } else {
        let start = perimeter_point(t, s, source.radius, factor);
        let end = perimeter_point(s, t, target.radius, factor);
        let _ = write!(
            out,
            "M{:.2},{:.2}L{:.2},{:.2}",
            start.0, start.1, end.0, end.1
        );
    }
    out
}

fn control_point(s: (f64, f64), t: (f64, f64)) -> (f64, f64) {
    let dx = t.0 - s.0;
    let dy = t.1 - s.1;
    let len = dx.hypot(dy);
    let (mx, my) = ((s.0 + t.0) / 2.0, (s.1 + t.1) / 2.0);
    (mx - dy / len * CURVE_OFFSET, my + dx / len * CURVE_OFFSET)
}

/// Stroke width grows with the number of relations a consolidated edge stands for.
pub fn stroke_width(metadata: &LinkMetadata) -> f64 {
    1.5 + f64::from(metadata.relation_count.max(1)).ln() * 1.25
}

/// Ids of links whose reverse (`target -> source`) also exists.
pub fn reciprocal_links(links: &[GraphLink]) -> FxHashSet<String> {
    let pairs: FxHashSet<(&str, &str)> = links
        .iter()
        .map(|l| (l.source.as_str(), l.target.as_str()))
        .collect();
    links
        .iter()
        .filter(|l| l.source != l.target)
        .filter(|l| pairs.contains(&(l.target.as_str(), l.source.as_str())))
        .map(|l| l.id.clone())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PathKey {
    quantized: [i64; 6],
    curved: bool,
}

impl PathKey {
    fn new(source: Endpoint, target: Endpoint, curved: bool) -> Self {
        let q = |v: f64| (v * 100.0).round() as i64;
        Self {
            quantized: [
                q(source.x),
                q(source.y),
                q(source.radius),
                q(target.x),
                q(target.y),
                q(target.radius),
            ],
            curved,
        }
    }
}

/// Memoized link paths keyed by link id; a path is rebuilt only when an endpoint moved (at
/// 0.01 world-unit resolution) or changed radius.
#[derive(Debug, Clone, Default)]
pub struct LinkPathCache {
    entries: FxHashMap<String, (PathKey, String)>,
}

impl LinkPathCache {
    pub fn path_for(
        &mut self,
        id: &str,
        source: Endpoint,
        target: Endpoint,
        curved: bool,
        factor: f64,
    ) -> &str {
        let key = PathKey::new(source, target, curved);
        let fresh = self.entries.get(id).is_some_and(|(k, _)| *k == key);
        if !fresh {
            let path = link_path(source, target, curved, factor);
            self.entries.insert(id.to_string(), (key, path));
        }
        self.entries
            .get(id)
            .map(|(_, p)| p.as_str())
            .unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|(_, p)| p.as_str())
    }

    pub fn retain(&mut self, live: &FxHashSet<&str>) {
        self.entries.retain(|id, _| live.contains(id.as_str()));
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
    use narwhal_core::LinkKind;

    fn ep(x: f64, y: f64, radius: f64) -> Endpoint {
        Endpoint { x, y, radius }
    }

    fn link(id: &str, source: &str, target: &str) -> GraphLink {
        GraphLink {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            kind: LinkKind::Related,
            metadata: LinkMetadata::for_kind(LinkKind::Related),
        }
    }

    #[test]
    fn straight_path_runs_perimeter_to_perimeter() {
        let p = link_path(ep(0.0, 0.0, 10.0), ep(100.0, 0.0, 20.0), false, 1.0);
        assert_eq!(p, "M10.00,0.00L80.00,0.00");
    }

    #[test]
    fn curved_path_is_quadratic() {
        let p = link_path(ep(0.0, 0.0, 10.0), ep(100.0, 0.0, 10.0), true, 1.0);
        assert!(p.starts_with('M'));
        assert!(p.contains("Q50.00,28.00 "), "{p}");
    }

    #[test]
    fn reciprocal_pairs_are_detected() {
        let links = vec![link("ab", "a", "b"), link("ba", "b", "a"), link("bc", "b", "c")];
        let r = reciprocal_links(&links);
        assert!(r.contains("ab") && r.contains("ba"));
        assert!(!r.contains("bc"));
    }

    #[test]
    fn cache_rebuilds_only_on_geometry_change() {
        let mut cache = LinkPathCache::default();
        let first = cache
            .path_for("l", ep(0.0, 0.0, 5.0), ep(50.0, 0.0, 5.0), false, 1.0)
            .to_string();
        let same = cache
            .path_for("l", ep(0.001, 0.0, 5.0), ep(50.0, 0.0, 5.0), false, 1.0)
            .to_string();
        assert_eq!(first, same);
        let moved = cache
            .path_for("l", ep(0.0, 10.0, 5.0), ep(50.0, 0.0, 5.0), false, 1.0)
            .to_string();
        assert_ne!(first, moved);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn stroke_width_grows_with_relation_count() {
        let mut m = LinkMetadata::for_kind(LinkKind::Consolidated);
        let one = stroke_width(&m);
        m.relation_count = 8;
        assert!(stroke_width(&m) > one);
    }
}
