//! Velocity-Verlet style forces. Each force reads the current node state and accumulates
//! velocity deltas into `dv`; the core integrates afterwards.

use super::{SimLink, SimNode};
use indexmap::IndexMap;
use narwhal_core::PhysicsConfig;

/// Beyond this distance nodes don't repel each other.
const CHARGE_DISTANCE_MAX: f64 = 1200.0;
const COLLISION_STRENGTH: f64 = 0.7;

// Tiny deterministic nudge for coincident nodes, so forces have a direction.
fn jiggle(i: usize, j: usize) -> f64 {
    let k = (i.wrapping_mul(31) ^ j.wrapping_mul(17)) % 7;
    (k as f64 - 3.0 + 0.5) * 1e-6
}

/// Springs along live links. Rest length is the two radii plus `link_distance`.
pub(super) fn link(
    nodes: &IndexMap<String, SimNode>,
    links: &[SimLink],
    degree: &[usize],
    physics: &PhysicsConfig,
    alpha: f64,
    dv: &mut [(f64, f64)],
) {
    for l in links {
        let (s, t) = (l.source, l.target);
        if s == t {
            continue;
        }
        let a = &nodes[s];
        let b = &nodes[t];
        let mut dx = b.x + b.vx - a.x - a.vx;
        let mut dy = b.y + b.vy - a.y - a.vy;
        if dx == 0.0 && dy == 0.0 {
            dx = jiggle(s, t);
            dy = jiggle(t, s);
        }
        let len = dx.hypot(dy);
        let rest = a.radius + b.radius + physics.link_distance;
        let k = (len - rest) / len * alpha * l.link.metadata.strength;
        dx *= k;
        dy *= k;

        let (ds, dt) = (degree[s].max(1) as f64, degree[t].max(1) as f64);
        let bias = ds / (ds + dt);
        dv[t].0 -= dx * bias;
        dv[t].1 -= dy * bias;
        dv[s].0 += dx * (1.0 - bias);
        dv[s].1 += dy * (1.0 - bias);
    }
}

/// Pairwise repulsion (`charge_strength < 0`), falling off with squared distance.
pub(super) fn charge(
    nodes: &IndexMap<String, SimNode>,
    physics: &PhysicsConfig,
    alpha: f64,
    dv: &mut [(f64, f64)],
) {
    let strength = physics.charge_strength;
    if strength == 0.0 {
        return;
    }
    let max2 = CHARGE_DISTANCE_MAX * CHARGE_DISTANCE_MAX;
    let n = nodes.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let a = &nodes[i];
            let b = &nodes[j];
            let mut dx = b.x - a.x;
            let mut dy = b.y - a.y;
            if dx == 0.0 && dy == 0.0 {
                dx = jiggle(i, j);
                dy = jiggle(j, i);
            }
            let l2 = (dx * dx + dy * dy).max(1.0);
            if l2 >= max2 {
                continue;
            }
            let w = strength * alpha / l2;
            dv[i].0 += dx * w;
            dv[i].1 += dy * w;
            dv[j].0 -= dx * w;
            dv[j].1 -= dy * w;
        }
    }
}

/// Resolves circle overlaps (radius + padding). Not scaled by alpha, so overlaps resolve even as
/// the simulation cools.
pub(super) fn collide(
    nodes: &IndexMap<String, SimNode>,
    physics: &PhysicsConfig,
    dv: &mut [(f64, f64)],
) {
    let n = nodes.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let a = &nodes[i];
            let b = &nodes[j];
            let r = a.radius + b.radius + physics.collision_padding;
            let mut dx = (a.x + a.vx) - (b.x + b.vx);
            let mut dy = (a.y + a.vy) - (b.y + b.vy);
            let l2 = dx * dx + dy * dy;
            if l2 >= r * r {
                continue;
            }
            if l2 == 0.0 {
                dx = jiggle(i, j);
                dy = jiggle(j, i);
            }
            let l = dx.hypot(dy);
            let k = (r - l) / l * COLLISION_STRENGTH;
            dx *= k;
            dy *= k;
            let (ra, rb) = (a.radius * a.radius, b.radius * b.radius);
            let share = if ra + rb > 0.0 { rb / (ra + rb) } else { 0.5 };
            dv[i].0 += dx * share;
            dv[i].1 += dy * share;
            dv[j].0 -= dx * (1.0 - share);
            dv[j].1 -= dy * (1.0 - share);
        }
    }
}

/// Pulls content nodes toward their vote-ranked targets.
pub(super) fn position(
    nodes: &IndexMap<String, SimNode>,
    physics: &PhysicsConfig,
    alpha: f64,
    dv: &mut [(f64, f64)],
) {
    let k = physics.position_strength * alpha;
    for (i, n) in nodes.values().enumerate() {
        if let Some((tx, ty)) = n.target {
            dv[i].0 += (tx - n.x) * k;
            dv[i].1 += (ty - n.y) * k;
        }
    }
}
