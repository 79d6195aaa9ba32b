//! GraphData ingestion.
//!
//! Upstream payloads are loosely typed (vote counts boxed as 64-bit objects, ids as numbers,
//! missing fields). Ingestion never rejects an individual node or link for bad field values;
//! it normalizes to safe defaults. Only a payload that isn't a graph at all is an error.

use crate::error::{Error, Result};
use crate::model::{
    ContentNode, GraphData, GraphLink, GraphNode, LinkKind, LinkMetadata, NodeMode, NodeType,
    SystemNode, VoteCounts,
};
use crate::number::{normalize_count, normalize_field, normalize_number};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};

const POSITIVE_KEYS: [&str; 2] = ["positiveVotes", "inclusionPositiveVotes"];
const NEGATIVE_KEYS: [&str; 2] = ["negativeVotes", "inclusionNegativeVotes"];

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Per-node user visibility choices (`true` = show). Wins over payload preferences.
    pub visibility_preferences: FxHashMap<String, bool>,
}

impl GraphData {
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        ingest(value, &IngestOptions::default())
    }
}

pub fn ingest(value: &Value, opts: &IngestOptions) -> Result<GraphData> {
    let Some(root) = value.as_object() else {
        return Err(Error::MalformedGraph {
            message: "expected a JSON object with `nodes` and `links`".to_string(),
        });
    };
    let Some(raw_nodes) = root.get("nodes").and_then(Value::as_array) else {
        return Err(Error::MalformedGraph {
            message: "missing `nodes` array".to_string(),
        });
    };

    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut nodes = Vec::with_capacity(raw_nodes.len());
    for raw in raw_nodes {
        let Some(obj) = raw.as_object() else {
            tracing::warn!(target: "narwhal::ingest", "node.dropped=not_an_object");
            continue;
        };
        let Some(id) = obj.get("id").and_then(id_string) else {
            tracing::warn!(target: "narwhal::ingest", "node.dropped=missing_id");
            continue;
        };
        if !seen.insert(id.clone()) {
            tracing::warn!(target: "narwhal::ingest", id = %id, "node.dropped=duplicate_id");
            continue;
        }
        nodes.push(ingest_node(id, obj, opts));
    }

    let mut links = Vec::new();
    if let Some(raw_links) = root.get("links").and_then(Value::as_array) {
        links.reserve(raw_links.len());
        for raw in raw_links {
            if let Some(link) = raw.as_object().and_then(ingest_link) {
                links.push(link);
            }
        }
    }

    tracing::debug!(
        target: "narwhal::ingest",
        nodes = nodes.len(),
        links = links.len(),
        "graph.ingested"
    );
    Ok(GraphData { nodes, links })
}

fn ingest_node(id: String, obj: &Map<String, Value>, opts: &IngestOptions) -> GraphNode {
    let type_tag = obj.get("type").and_then(Value::as_str).unwrap_or("");
    let node_type = NodeType::parse(type_tag);
    let data = obj.get("data").cloned().unwrap_or(Value::Null);
    let group = obj.get("group").and_then(id_string);
    let mode = lookup(obj, &data, "mode")
        .and_then(Value::as_str)
        .map(NodeMode::parse)
        .unwrap_or_default();

    if node_type.is_system() {
        return GraphNode::System(SystemNode {
            position: system_position(obj, &data),
            id,
            node_type,
            mode,
            group,
            data,
        });
    }

    let votes = if node_type.is_vote_ranked() {
        read_votes(obj.get("voteMetadata"), &data)
    } else {
        VoteCounts::default()
    };
    let visibility_preference = opts
        .visibility_preferences
        .get(&id)
        .copied()
        .or_else(|| lookup(obj, &data, "visibilityPreference").and_then(preference_flag));

    GraphNode::Content(ContentNode {
        id,
        node_type,
        votes,
        mode,
        visibility_preference,
        group,
        data,
    })
}

fn read_votes(vote_metadata: Option<&Value>, data: &Value) -> VoteCounts {
    let pick = |keys: &[&str]| -> i64 {
        for source in [vote_metadata, Some(data)].into_iter().flatten() {
            for key in keys {
                if let Some(v) = source.get(*key) {
                    return normalize_count(Some(v));
                }
            }
        }
        0
    };
    VoteCounts::new(pick(&POSITIVE_KEYS), pick(&NEGATIVE_KEYS))
}

fn system_position(obj: &Map<String, Value>, data: &Value) -> Option<(f64, f64)> {
    if let Some(pos) = obj.get("position").filter(|v| v.is_object()) {
        return Some((normalize_field(pos.get("x")), normalize_field(pos.get("y"))));
    }
    let x = lookup(obj, data, "x")?;
    let y = lookup(obj, data, "y")?;
    Some((normalize_number(x), normalize_number(y)))
}

fn preference_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Object(map) => map.get("isVisible").and_then(Value::as_bool),
        Value::String(s) => match s.trim() {
            "show" | "visible" | "true" => Some(true),
            "hide" | "hidden" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn ingest_link(obj: &Map<String, Value>) -> Option<GraphLink> {
    let Some(source) = obj.get("source").and_then(endpoint_id) else {
        tracing::warn!(target: "narwhal::ingest", "link.dropped=missing_source");
        return None;
    };
    let Some(target) = obj.get("target").and_then(endpoint_id) else {
        tracing::warn!(target: "narwhal::ingest", "link.dropped=missing_target");
        return None;
    };
    let kind = LinkKind::parse(obj.get("type").and_then(Value::as_str).unwrap_or(""));
    let id = obj
        .get("id")
        .and_then(id_string)
        .unwrap_or_else(|| format!("{source}-{target}-{}", kind.as_str()));

    let mut metadata = LinkMetadata::for_kind(kind);
    if let Some(meta) = obj.get("metadata").and_then(Value::as_object) {
        if let Some(s) = meta.get("strength") {
            metadata.strength = normalize_number(s).clamp(0.0, 1.0);
        }
        let count = meta
            .get("relationCount")
            .or_else(|| meta.get("relationshipCount"))
            .map(|v| normalize_count(Some(v)))
            .unwrap_or(1);
        metadata.relation_count = count.clamp(1, i64::from(u32::MAX)) as u32;
        if let Some(words) = meta.get("keywords").and_then(Value::as_array) {
            metadata.keywords = words
                .iter()
                .filter_map(|w| match w {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(o) => o.get("word").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .collect();
        }
    }

    Some(GraphLink {
        id,
        source,
        target,
        kind,
        metadata,
    })
}

fn lookup<'a>(obj: &'a Map<String, Value>, data: &'a Value, key: &str) -> Option<&'a Value> {
    obj.get(key).or_else(|| data.get(key)).filter(|v| !v.is_null())
}

fn id_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

// Links from a previous simulation pass may carry resolved node objects as endpoints.
fn endpoint_id(value: &Value) -> Option<String> {
    match value {
        Value::Object(o) => o.get("id").and_then(id_string),
        other => id_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boxed_votes_are_normalized() {
        let g = GraphData::from_value(&json!({
            "nodes": [{
                "id": "s1",
                "type": "statement",
                "data": {},
                "voteMetadata": {"positiveVotes": {"low": 12, "high": 0}, "negativeVotes": "2"}
            }],
            "links": []
        }))
        .unwrap();
        assert_eq!(g.nodes[0].net_votes(), 10);
    }

    #[test]
    fn garbled_votes_default_to_zero() {
        let g = GraphData::from_value(&json!({
            "nodes": [{"id": "s1", "type": "answer", "data": {"positiveVotes": "many"}}]
        }))
        .unwrap();
        assert_eq!(g.nodes[0].net_votes(), 0);
        assert!(g.links.is_empty());
    }

    #[test]
    fn inclusion_votes_are_read_from_data() {
        let g = GraphData::from_value(&json!({
            "nodes": [{"id": "q", "type": "openquestion",
                "data": {"inclusionPositiveVotes": 1, "inclusionNegativeVotes": 4}}]
        }))
        .unwrap();
        assert_eq!(g.nodes[0].net_votes(), -3);
        assert!(g.nodes[0].is_hidden());
    }

    #[test]
    fn duplicate_and_missing_ids_are_dropped() {
        let g = GraphData::from_value(&json!({
            "nodes": [
                {"id": "a", "type": "statement"},
                {"id": "a", "type": "answer"},
                {"type": "answer"},
                {"id": 7, "type": "word"}
            ]
        }))
        .unwrap();
        let ids: Vec<&str> = g.node_ids().collect();
        assert_eq!(ids, vec!["a", "7"]);
        assert_eq!(g.nodes[0].node_type(), NodeType::Statement);
    }

    #[test]
    fn system_nodes_keep_caller_position() {
        let g = GraphData::from_value(&json!({
            "nodes": [
                {"id": "nav", "type": "navigation", "data": {"x": 40, "y": "-20"}},
                {"id": "ctl", "type": "control"}
            ]
        }))
        .unwrap();
        let GraphNode::System(nav) = &g.nodes[0] else {
            panic!("expected system node");
        };
        assert_eq!(nav.position, Some((40.0, -20.0)));
        let GraphNode::System(ctl) = &g.nodes[1] else {
            panic!("expected system node");
        };
        assert_eq!(ctl.position, None);
    }

    #[test]
    fn link_metadata_is_clamped_and_ids_synthesized() {
        let g = GraphData::from_value(&json!({
            "nodes": [],
            "links": [
                {"source": "a", "target": {"id": "b"}, "type": "consolidated",
                 "metadata": {"strength": 4, "relationCount": {"low": 3}, "keywords": ["x", {"word": "y"}]}},
                {"id": "l2", "source": "a"}
            ]
        }))
        .unwrap();
        assert_eq!(g.links.len(), 1);
        let l = &g.links[0];
        assert_eq!(l.id, "a-b-consolidated");
        assert_eq!(l.metadata.strength, 1.0);
        assert_eq!(l.metadata.relation_count, 3);
        assert_eq!(l.metadata.keywords, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn explicit_preferences_win() {
        let mut opts = IngestOptions::default();
        opts.visibility_preferences.insert("s".to_string(), true);
        let g = ingest(
            &json!({"nodes": [{"id": "s", "type": "statement",
                "data": {"negativeVotes": 5, "visibilityPreference": false}}]}),
            &opts,
        )
        .unwrap();
        assert!(!g.nodes[0].is_hidden());
    }

    #[test]
    fn non_graph_payload_is_an_error() {
        assert!(GraphData::from_value(&json!([1, 2])).is_err());
        assert!(GraphData::from_value(&json!({"links": []})).is_err());
        assert!(GraphData::from_json("{not json").is_err());
    }
}
