//! Render-facing snapshots of the live graph.

use crate::coords::{CoordinateSystem, ViewTransform};
use crate::links::stroke_width;
use crate::simulation::SimulationCore;
use narwhal_core::{LinkKind, NodeMode, NodeType};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    pub node_type: NodeType,
    pub net_votes: i64,
    pub is_system: bool,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderableNode {
    pub id: String,
    /// World coordinates.
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub opacity: f64,
    pub is_hidden: bool,
    pub mode: NodeMode,
    pub style: NodeStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStyle {
    pub kind: LinkKind,
    pub stroke_width: f64,
    pub relation_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderableLink {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    /// SVG path in world coordinates, clipped to both node perimeters.
    pub path: String,
    pub opacity: f64,
    pub style: LinkStyle,
}

/// Everything a renderer needs for one frame. Links only ever reference nodes in `nodes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub time: f64,
    pub transform: ViewTransform,
    pub nodes: Vec<RenderableNode>,
    pub links: Vec<RenderableLink>,
}

impl Frame {
    pub fn capture(core: &SimulationCore, coords: &CoordinateSystem, time: f64) -> Self {
        let nodes = core
            .nodes()
            .map(|n| {
                let (x, y) = n.position();
                RenderableNode {
                    id: n.id().to_string(),
                    x,
                    y,
                    radius: n.radius(),
                    opacity: n.opacity(),
                    is_hidden: n.is_hidden(),
                    mode: n.mode(),
                    style: NodeStyle {
                        node_type: n.node().node_type(),
                        net_votes: n.node().net_votes(),
                        is_system: n.is_system(),
                        pinned: n.pinned().is_some(),
                    },
                }
            })
            .collect();

        let links = core
            .links()
            .iter()
            .filter_map(|l| {
                let path = core.link_path(l.id())?;
                let meta = &l.link().metadata;
                Some(RenderableLink {
                    id: l.id().to_string(),
                    source_id: l.source_id().to_string(),
                    target_id: l.target_id().to_string(),
                    path: path.to_string(),
                    opacity: l.opacity(),
                    style: LinkStyle {
                        kind: l.link().kind,
                        stroke_width: stroke_width(meta),
                        relation_count: meta.relation_count,
                    },
                })
            })
            .collect();

        Self {
            time,
            transform: coords.transform(),
            nodes,
            links,
        }
    }

    pub fn node(&self, id: &str) -> Option<&RenderableNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn link(&self, id: &str) -> Option<&RenderableLink> {
        self.links.iter().find(|l| l.id == id)
    }
}
