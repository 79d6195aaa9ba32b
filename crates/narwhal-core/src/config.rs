//! Layout/reveal configuration.
//!
//! Configs are layered: built-in defaults, then JSON overrides deep-merged on top, then
//! validation (clamping) on the merged result. Overrides with the wrong shape are skipped
//! key-by-key so one bad value never discards the rest.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MIN_REVEAL_DURATION_MS: f64 = 1000.0;
pub const MAX_REVEAL_DURATION_MS: f64 = 5000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevealPattern {
    /// Nearest to the center first.
    #[default]
    CenterOut,
    /// Highest net votes first.
    VoteRanking,
    /// Sweep by polar angle, inner nodes first within the same angle.
    SpiralSequence,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    #[default]
    Standard,
    Batch,
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RingConfig {
    pub first_ring: usize,
    pub second_ring: usize,
    /// `0` disables the third ring.
    pub third_ring: usize,
    pub base_distance: f64,
    pub ring_increment: f64,
    /// Angular phase added per ring (radians) so rings don't line up radially.
    pub ring_phase: f64,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            first_ring: 6,
            second_ring: 12,
            third_ring: 18,
            base_distance: 220.0,
            ring_increment: 140.0,
            ring_phase: 0.35,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    pub velocity_decay: f64,
    pub alpha_decay: f64,
    pub alpha_min: f64,
    /// Energy injected by mode/visibility commands. Far below the cold-start alpha of `1.0`.
    pub wake_alpha: f64,
    /// Rest length added on top of the two endpoint radii.
    pub link_distance: f64,
    /// Negative values repel.
    pub charge_strength: f64,
    pub collision_padding: f64,
    /// Pull toward the vote-ranked target position.
    pub position_strength: f64,
    /// Per-tick displacement under which a node counts as at rest.
    pub settle_threshold: f64,
    /// Fraction of resting nodes needed to declare settlement.
    pub settle_fraction: f64,
    /// Hard ceiling on monitored ticks before settlement is forced.
    pub max_settle_ticks: u32,
    /// Converts a logical radius to the visual offset used when clipping link ends.
    pub perimeter_radius_factor: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            velocity_decay: 0.4,
            alpha_decay: 0.0228,
            alpha_min: 0.001,
            wake_alpha: 0.1,
            link_distance: 60.0,
            charge_strength: -300.0,
            collision_padding: 8.0,
            position_strength: 0.12,
            settle_threshold: 0.5,
            settle_fraction: 0.95,
            max_settle_ticks: 300,
            perimeter_radius_factor: 0.93,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub reveal_pattern: RevealPattern,
    /// Milliseconds, clamped to `[1000, 5000]`.
    pub reveal_duration: f64,
    /// Milliseconds after node reveal starts before edges begin fading in. Defaults to 40% of
    /// `reveal_duration`.
    pub edge_reveal_delay: Option<f64>,
    pub edge_fade_duration: f64,
    pub render_mode: RenderMode,
    pub batch_size: usize,
    pub max_batches: usize,
    pub batch_delay: f64,
    pub sequential_delay: f64,
    /// Wait after render completion before settlement monitoring starts.
    pub settlement_delay: f64,
    pub rings: RingConfig,
    pub physics: PhysicsConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            reveal_pattern: RevealPattern::CenterOut,
            reveal_duration: 2000.0,
            edge_reveal_delay: None,
            edge_fade_duration: 400.0,
            render_mode: RenderMode::Standard,
            batch_size: 10,
            max_batches: 5,
            batch_delay: 500.0,
            sequential_delay: 120.0,
            settlement_delay: 300.0,
            rings: RingConfig::default(),
            physics: PhysicsConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Defaults with `overrides` merged on top.
    pub fn from_value(overrides: &Value) -> Result<Self> {
        Self::default().merged(overrides)
    }

    pub fn merged(&self, overrides: &Value) -> Result<Self> {
        if !overrides.is_object() {
            return Err(Error::InvalidConfig {
                message: "config overrides must be a JSON object".to_string(),
            });
        }
        let mut base = serde_json::to_value(self)?;
        merge_checked(&mut base, overrides, &mut Vec::new());
        let merged: Self = serde_json::from_value(base)?;
        Ok(merged.validated())
    }

    /// Clamps every field into its supported range.
    pub fn validated(mut self) -> Self {
        self.reveal_duration = finite_or(self.reveal_duration, 2000.0)
            .clamp(MIN_REVEAL_DURATION_MS, MAX_REVEAL_DURATION_MS);
        self.edge_reveal_delay = self
            .edge_reveal_delay
            .filter(|d| d.is_finite())
            .map(|d| d.clamp(0.0, self.reveal_duration));
        self.edge_fade_duration = finite_or(self.edge_fade_duration, 400.0).max(0.0);
        self.batch_size = self.batch_size.max(1);
        self.max_batches = self.max_batches.max(1);
        self.batch_delay = finite_or(self.batch_delay, 500.0).max(0.0);
        self.sequential_delay = finite_or(self.sequential_delay, 120.0).max(0.0);
        self.settlement_delay = finite_or(self.settlement_delay, 300.0).max(0.0);

        let r = &mut self.rings;
        r.base_distance = finite_or(r.base_distance, 220.0).max(0.0);
        r.ring_increment = finite_or(r.ring_increment, 140.0).max(1.0);
        r.ring_phase = finite_or(r.ring_phase, 0.35);

        let p = &mut self.physics;
        p.velocity_decay = finite_or(p.velocity_decay, 0.4).clamp(0.0, 1.0);
        p.alpha_decay = finite_or(p.alpha_decay, 0.0228).clamp(0.0, 1.0);
        p.alpha_min = finite_or(p.alpha_min, 0.001).clamp(0.0, 1.0);
        p.wake_alpha = finite_or(p.wake_alpha, 0.1).clamp(p.alpha_min, 1.0);
        p.link_distance = finite_or(p.link_distance, 60.0).max(0.0);
        p.charge_strength = finite_or(p.charge_strength, -300.0);
        p.collision_padding = finite_or(p.collision_padding, 8.0).max(0.0);
        p.position_strength = finite_or(p.position_strength, 0.12).clamp(0.0, 1.0);
        p.settle_threshold = finite_or(p.settle_threshold, 0.5).max(0.0);
        p.settle_fraction = finite_or(p.settle_fraction, 0.95).clamp(0.0, 1.0);
        p.max_settle_ticks = p.max_settle_ticks.max(1);
        p.perimeter_radius_factor = finite_or(p.perimeter_radius_factor, 0.93).max(0.0);
        self
    }

    pub fn edge_reveal_delay_ms(&self) -> f64 {
        self.edge_reveal_delay
            .unwrap_or(self.reveal_duration * 0.4)
            .clamp(0.0, self.reveal_duration)
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}

// Deep-merges `incoming` into `base` one leaf at a time, keeping a leaf only if the config still
// deserializes afterwards. Unknown keys are ignored.
fn merge_checked(base: &mut Value, incoming: &Value, path: &mut Vec<String>) {
    let Some(incoming) = incoming.as_object() else {
        return;
    };
    for (key, value) in incoming {
        path.push(key.clone());
        let known = lookup_path(base, path).is_some();
        if !known {
            tracing::debug!(target: "narwhal::config", key = %path.join("."), "config.unknown_key");
        } else if value.is_object() && lookup_path(base, path).is_some_and(Value::is_object) {
            merge_checked(base, value, path);
        } else {
            let previous = lookup_path(base, path).cloned().unwrap_or(Value::Null);
            set_path(base, path, value.clone());
            if serde_json::from_value::<LayoutConfig>(base.clone()).is_err() {
                tracing::warn!(
                    target: "narwhal::config",
                    key = %path.join("."),
                    "config.override_rejected"
                );
                set_path(base, path, previous);
            }
        }
        path.pop();
    }
}

fn lookup_path<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut cur = root;
    for seg in path {
        cur = cur.as_object()?.get(seg.as_str())?;
    }
    Some(cur)
}

fn set_path(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut cur = root;
    for seg in parents {
        let Some(obj) = cur.as_object_mut() else {
            return;
        };
        cur = obj
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Some(obj) = cur.as_object_mut() {
        obj.insert(last.clone(), value);
    }
}
