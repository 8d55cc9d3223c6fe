use glam::Vec2;
use roadmap_canvas::config::{
    self, EdgeStyle, HexColor, LineStyle, PALETTE, Paint, default_style_for, edge_style_for,
    label_color_for, port_count,
};
use roadmap_canvas::model::{NodeKind, RoadmapDiagram};

#[test]
fn test_topic_and_label_defaults() {
    let mut diagram = RoadmapDiagram::new();
    let topic = diagram.create_node(NodeKind::Topic, Vec2::ZERO);
    let label = diagram.create_node(NodeKind::Label, Vec2::new(0.0, 200.0));

    let topic = diagram.node(&topic).unwrap();
    assert!(!default_style_for(topic.kind).is_resizable());
    assert_eq!(port_count(topic.kind), 4);
    assert_eq!(topic.style.font_size, 16);
    assert_eq!(topic.size, Vec2::new(220.0, 80.0));

    let label = diagram.node(&label).unwrap();
    assert!(default_style_for(label.kind).is_resizable());
    assert_eq!(port_count(label.kind), 0);
    assert_eq!(label.style.font_size, 13);
}

#[test]
fn test_only_topics_have_ports() {
    for kind in NodeKind::ALL {
        let style = default_style_for(kind);
        let has_ports = matches!(kind, NodeKind::Topic | NodeKind::Subtopic);
        assert_eq!(port_count(kind) == 4, has_ports, "{kind}");
        assert_eq!(style.is_resizable(), !has_ports, "{kind}");
    }
}

#[test]
fn test_edge_style_is_direction_independent() {
    let dashed = edge_style_for(Some(NodeKind::Topic), Some(NodeKind::Subtopic));
    let reversed = edge_style_for(Some(NodeKind::Subtopic), Some(NodeKind::Topic));
    assert_eq!(dashed.line, LineStyle::Dashed);
    assert_eq!(dashed, reversed);
    assert_eq!(dashed.dash_array(), Some("5 5"));

    let solid = edge_style_for(Some(NodeKind::Topic), Some(NodeKind::Topic));
    assert_eq!(solid, EdgeStyle::solid());
    assert_eq!(solid.dash_array(), None);

    assert_eq!(
        edge_style_for(Some(NodeKind::Paragraph), Some(NodeKind::Section)).line,
        LineStyle::Solid
    );
    assert_eq!(edge_style_for(None, Some(NodeKind::Topic)).line, LineStyle::Solid);
}

#[test]
fn test_connect_resolves_style_from_kinds() {
    let mut diagram = RoadmapDiagram::new();
    let topic = diagram.create_node(NodeKind::Topic, Vec2::ZERO);
    let sub = diagram.create_node(NodeKind::Subtopic, Vec2::new(300.0, 0.0));

    let forward = diagram.connect(&topic, &sub).unwrap();
    let backward = diagram.connect(&sub, &topic).unwrap();

    assert_eq!(diagram.edge(&forward).unwrap().style.line, LineStyle::Dashed);
    assert_eq!(diagram.edge(&backward).unwrap().style.line, LineStyle::Dashed);
    assert_eq!(diagram.edge(&forward).unwrap().style.stroke, config::EDGE_STROKE);
}

#[test]
fn test_contrast_rule() {
    let near_black: HexColor = "#111827".parse().unwrap();
    let yellow: HexColor = "#fde047".parse().unwrap();

    assert_eq!(label_color_for(Paint::Solid(near_black)), HexColor::WHITE);
    assert_eq!(label_color_for(Paint::Solid(yellow)), HexColor::NEAR_BLACK);
}

#[test]
fn test_palette_has_single_dark_entry() {
    assert_eq!(PALETTE[0], HexColor::NEAR_BLACK);
    let dark: Vec<_> = PALETTE.iter().filter(|c| config::is_dark(**c)).collect();
    assert_eq!(dark.len(), 1);
}
