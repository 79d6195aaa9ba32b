use narwhal::{GraphData, NodeMode, RingLayout, Session};
use narwhal_core::RingConfig;
use serde_json::json;

fn distance(session: &Session, id: &str) -> f64 {
    let (x, y) = session.core().node(id).unwrap().target().unwrap();
    x.hypot(y)
}

fn pair() -> GraphData {
    GraphData::from_value(&json!({
        "nodes": [
            {"id": "a", "type": "statement", "data": {"positiveVotes": 9}},
            {"id": "b", "type": "statement", "data": {"positiveVotes": 4}}
        ],
        "links": [
            {"id": "ab", "source": "a", "target": "b", "type": "related"},
            {"id": "ba", "source": "b", "target": "a", "type": "related"}
        ]
    }))
    .unwrap()
}

#[test]
fn targets_follow_rank_rings() {
    let mut session = Session::default();
    session.load(pair());
    let layout = RingLayout::from_config(&RingConfig::default());
    assert!((distance(&session, "a") - layout.target_distance(0)).abs() < 1e-9);
    assert!((distance(&session, "b") - layout.target_distance(1)).abs() < 1e-9);
    assert_eq!(session.core().node("a").unwrap().rank(), Some(0));
}

#[test]
fn enlarged_inner_node_pushes_outer_targets_out() {
    let mut session = Session::default();
    session.load(pair());
    let before_a = distance(&session, "a");
    let before_b = distance(&session, "b");

    let preview = session.core().node("a").unwrap().radius();
    assert!(session.set_mode("a", NodeMode::Detail));
    let grown = session.core().node("a").unwrap().radius() - preview;

    assert!((distance(&session, "a") - before_a).abs() < 1e-9);
    assert!((distance(&session, "b") - (before_b + grown)).abs() < 1e-9);

    assert!(session.set_mode("a", NodeMode::Preview));
    assert!((distance(&session, "b") - before_b).abs() < 1e-9);
}

#[test]
fn reciprocal_links_render_as_opposite_curves() {
    let mut session = Session::default();
    session.load(pair());
    let frame = session.frame();
    let ab = frame.link("ab").unwrap();
    let ba = frame.link("ba").unwrap();
    assert!(ab.path.contains('Q'));
    assert!(ba.path.contains('Q'));
    assert_ne!(ab.path, ba.path);
    assert!(session.core().links().iter().all(|l| l.is_curved()));
}

#[test]
fn hidden_nodes_shrink() {
    let mut session = Session::default();
    session.load(pair());
    let visible = session.frame().node("b").unwrap().radius;
    assert!(session.set_visibility("b", false));
    let hidden = session.frame().node("b").unwrap().radius;
    assert!(hidden < visible);
    assert_eq!(hidden, narwhal::radius::HIDDEN_RADIUS);
}
