use glam::Vec2;
use roadmap_canvas::config::{HexColor, LineStyle, Paint};
use roadmap_canvas::model::{
    NodeContent, NodeId, NodeKind, Resource, ResourceKind, RoadmapDiagram,
};
use roadmap_canvas::persistence::{self, DropReason, ParseError};

fn sample_diagram() -> RoadmapDiagram {
    let mut diagram = RoadmapDiagram::new();
    let title = diagram.create_node(NodeKind::Title, Vec2::new(40.0, 10.0));
    let topic = diagram.create_node(NodeKind::Topic, Vec2::new(40.0, 120.0));
    let sub = diagram.create_node(NodeKind::Subtopic, Vec2::new(320.5, 130.25));
    let section = diagram.create_node(NodeKind::Section, Vec2::new(0.0, 400.0));

    diagram.set_label(&title, "Backend Roadmap").unwrap();
    diagram.set_fill(&topic, Paint::Solid(HexColor::NEAR_BLACK)).unwrap();
    diagram.resize_node(&section, Vec2::new(500.0, 260.0)).unwrap();
    diagram.set_font_size(&sub, 18).unwrap();
    diagram
        .set_content(
            &topic,
            NodeContent {
                content_title: "HTTP".into(),
                content_description: "Learn the protocol.".into(),
                resources: vec![
                    Resource {
                        kind: ResourceKind::Article,
                        title: "MDN".into(),
                        url: "https://developer.mozilla.org".into(),
                    },
                    Resource {
                        kind: ResourceKind::Video,
                        title: "Talk".into(),
                        url: "https://example.com/talk".into(),
                    },
                ],
            },
        )
        .unwrap();

    diagram.connect(&topic, &sub).unwrap();
    diagram.connect(&topic, &sub).unwrap();
    diagram.connect(&title, &topic).unwrap();
    diagram
}

#[test]
fn test_roundtrip_persistence() {
    let diagram = sample_diagram();

    let json = persistence::serialize(&diagram).unwrap();
    let loaded = persistence::parse(&json).unwrap();

    assert_eq!(loaded, diagram);
    let original_order: Vec<&NodeId> = diagram.nodes().map(|n| &n.id).collect();
    let loaded_order: Vec<&NodeId> = loaded.nodes().map(|n| &n.id).collect();
    assert_eq!(original_order, loaded_order);
}

#[test]
fn test_wire_format_field_names() {
    let diagram = sample_diagram();
    let json: serde_json::Value =
        serde_json::from_str(&persistence::serialize(&diagram).unwrap()).unwrap();

    let node = &json["nodes"][1];
    assert_eq!(node["type"], "topic");
    assert_eq!(node["style"]["fillColor"], "#111827");
    assert_eq!(node["style"]["textColor"], "#ffffff");
    assert_eq!(node["style"]["fontSize"], 16);
    assert!(json["nodes"][2]["style"]["fontSize"].is_u64());
    assert_eq!(node["content"]["resources"][0]["type"], "Article");
    assert!(node["size"]["width"].is_number());

    let edge = &json["edges"][0];
    assert!(edge["sourceId"].is_string());
    assert!(edge["targetId"].is_string());
    assert_eq!(edge["style"]["line"], "dashed");

    assert_eq!(json["nodes"][3]["style"]["fillColor"], "transparent");
}

#[test]
fn test_dangling_edge_is_dropped() {
    let raw = r#"{
        "nodes": [
            {"id": "a", "type": "topic", "position": {"x": 1, "y": 2}, "label": "A"},
            {"id": "b", "type": "topic", "position": {"x": 300, "y": 2}, "label": "B"}
        ],
        "edges": [
            {"id": "e1", "sourceId": "a", "targetId": "b"},
            {"id": "e2", "sourceId": "a", "targetId": "ghost"}
        ]
    }"#;

    let (diagram, report) = persistence::parse_with_report(raw).unwrap();

    assert_eq!(diagram.node_count(), 2);
    assert_eq!(diagram.edge_count(), 1);
    assert_eq!(diagram.edges().next().unwrap().id.as_str(), "e1");
    assert_eq!(report.dropped_edges.len(), 1);
    assert_eq!(report.dropped_edges[0].reason, DropReason::DanglingEndpoint);
    assert_eq!(report.dropped_edges[0].id.as_deref(), Some("e2"));

    let a = diagram.node(&NodeId::from("a")).unwrap();
    assert_eq!(a.position, Vec2::new(1.0, 2.0));
    assert_eq!(a.label, "A");
}

#[test]
fn test_missing_fields_default_by_kind() {
    let raw = r#"{
        "nodes": [
            {"id": "s", "type": "subtopic"},
            {"id": "p", "type": "paragraph", "style": {"fillColor": "not-a-colour", "fontSize": 20}},
            {"id": "t", "type": "topic", "content": {"resources": [{"type": "podcast", "title": "x", "url": "y"}]}}
        ],
        "edges": [{"id": "e", "sourceId": "t", "targetId": "s"}]
    }"#;

    let diagram = persistence::parse(raw).unwrap();

    let sub = diagram.node(&NodeId::from("s")).unwrap();
    assert_eq!(sub.size, Vec2::new(160.0, 56.0));
    assert_eq!(sub.label, "Sub Topic");
    assert_eq!(sub.style.font_size, 14);
    assert!(sub.content.resources.is_empty());

    let paragraph = diagram.node(&NodeId::from("p")).unwrap();
    assert_eq!(paragraph.style.fill_color, Paint::Solid(HexColor::WHITE));
    assert_eq!(paragraph.style.font_size, 20);

    let topic = diagram.node(&NodeId::from("t")).unwrap();
    assert_eq!(topic.content.resources[0].kind, ResourceKind::Other);

    // No stored style: resolved from the endpoint kinds.
    assert_eq!(diagram.edges().next().unwrap().style.line, LineStyle::Dashed);
}

#[test]
fn test_unrecoverable_nodes_are_dropped_with_their_edges() {
    let raw = r#"{
        "nodes": [
            {"id": "a", "type": "topic"},
            {"id": "a", "type": "label"},
            {"type": "topic"},
            {"id": "z", "type": "diamond"}
        ],
        "edges": [{"id": "e", "sourceId": "a", "targetId": "z"}]
    }"#;

    let (diagram, report) = persistence::parse_with_report(raw).unwrap();

    assert_eq!(diagram.node_count(), 1);
    assert_eq!(diagram.node(&NodeId::from("a")).unwrap().kind, NodeKind::Topic);
    assert_eq!(diagram.edge_count(), 0);
    let reasons: Vec<_> = report.dropped_nodes.iter().map(|d| d.reason.clone()).collect();
    assert_eq!(
        reasons,
        vec![
            DropReason::DuplicateId,
            DropReason::MissingId,
            DropReason::UnknownKind("diamond".into()),
        ]
    );
}

#[test]
fn test_malformed_top_level_is_an_error() {
    assert!(matches!(persistence::parse("not json"), Err(ParseError::Json(_))));
    assert_eq!(persistence::parse("[]"), Err(ParseError::Shape));
    assert_eq!(persistence::parse(r#"{"nodes": []}"#), Err(ParseError::Shape));
    assert_eq!(persistence::parse(r#"{"nodes": {}, "edges": []}"#), Err(ParseError::Shape));
}
