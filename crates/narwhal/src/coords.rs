//! World/view coordinate transforms.
//!
//! Layout math happens in a stable *world* space. Pan/zoom produce a *view* space through one
//! affine transform (uniform scale `k`, then translate `x,y`). One [`CoordinateSystem`] exists per
//! session; it is the only owner of the transform.

use euclid::{Point2D, Transform2D, Vector2D};
use serde::Serialize;

pub struct World;
pub struct View;

pub type WorldPoint = Point2D<f64, World>;
pub type ViewPoint = Point2D<f64, View>;

/// Converts a logical radius into the visual offset used where an edge meets a node. The drawn
/// glyph sits slightly inside the logical bounding circle. Empirical; tune through config.
pub const PERIMETER_RADIUS_FACTOR: f64 = 0.93;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    /// Non-finite or non-positive scales fall back to `1.0`; non-finite offsets to `0.0`.
    pub fn new(k: f64, x: f64, y: f64) -> Self {
        let k = if k.is_finite() && k > 0.0 { k } else { 1.0 };
        let x = if x.is_finite() { x } else { 0.0 };
        let y = if y.is_finite() { y } else { 0.0 };
        Self { k, x, y }
    }

    fn to_view(self) -> Transform2D<f64, World, View> {
        Transform2D::scale(self.k, self.k).then_translate(Vector2D::new(self.x, self.y))
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&ViewTransform)>;

pub struct CoordinateSystem {
    transform: ViewTransform,
    to_view: Transform2D<f64, World, View>,
    to_world: Transform2D<f64, View, World>,
    perimeter_factor: f64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl std::fmt::Debug for CoordinateSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateSystem")
            .field("transform", &self.transform)
            .field("perimeter_factor", &self.perimeter_factor)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinateSystem {
    pub fn new() -> Self {
        Self::with_perimeter_factor(PERIMETER_RADIUS_FACTOR)
    }

    pub fn with_perimeter_factor(perimeter_factor: f64) -> Self {
        let transform = ViewTransform::IDENTITY;
        Self {
            transform,
            to_view: transform.to_view(),
            to_world: Transform2D::identity(),
            perimeter_factor,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn perimeter_factor(&self) -> f64 {
        self.perimeter_factor
    }

    /// Replaces the transform as a whole and notifies subscribers.
    pub fn set_transform(&mut self, transform: ViewTransform) {
        let transform = ViewTransform::new(transform.k, transform.x, transform.y);
        let to_view = transform.to_view();
        // `k > 0` is enforced above, so the inverse always exists.
        let Some(to_world) = to_view.inverse() else {
            return;
        };
        self.transform = transform;
        self.to_view = to_view;
        self.to_world = to_world;
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&transform);
        }
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&ViewTransform) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn world_to_view(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.to_view.transform_point(WorldPoint::new(x, y));
        (p.x, p.y)
    }

    pub fn view_to_world(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.to_world.transform_point(ViewPoint::new(x, y));
        (p.x, p.y)
    }

    pub fn world_to_view_size(&self, size: f64) -> f64 {
        size * self.transform.k
    }

    pub fn view_to_world_size(&self, size: f64) -> f64 {
        size / self.transform.k
    }

    /// Point on the `from -> to` line, pulled back from `to` by the corrected radius.
    pub fn perimeter_point(
        &self,
        from_x: f64,
        from_y: f64,
        to_x: f64,
        to_y: f64,
        view_radius: f64,
    ) -> (f64, f64) {
        perimeter_point(
            (from_x, from_y),
            (to_x, to_y),
            view_radius,
            self.perimeter_factor,
        )
    }
}

/// Space-agnostic form of [`CoordinateSystem::perimeter_point`]; `radius` must be in the same
/// space as the two points. Coincident points return `to` unchanged.
pub fn perimeter_point(from: (f64, f64), to: (f64, f64), radius: f64, factor: f64) -> (f64, f64) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let len = dx.hypot(dy);
    if !(len.is_finite() && len > f64::EPSILON) {
        return to;
    }
    let offset = (radius * factor).clamp(0.0, len);
    (to.0 - dx / len * offset, to.1 - dy / len * offset)
}
