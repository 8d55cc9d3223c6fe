use glam::Vec2;
use roadmap_canvas::model::{NodeKind, RoadmapDiagram};
use roadmap_canvas::render::DrawCommand;
use roadmap_canvas::{Canvas, CanvasConfig, Orientation, PageSetup, PageSize};

#[test]
fn test_page_dimensions() {
    let portrait = PageSetup::new(PageSize::A4, Orientation::Portrait);
    let landscape = PageSetup::new(PageSize::A4, Orientation::Landscape);
    assert_eq!(portrait.dimensions(), Vec2::new(595.0, 842.0));
    assert_eq!(landscape.dimensions(), Vec2::new(842.0, 595.0));
    assert_eq!(PageSize::Letter.dimensions(), Vec2::new(612.0, 792.0));
}

#[test]
fn test_edges_are_drawn_behind_nodes() {
    let mut diagram = RoadmapDiagram::new();
    let a = diagram.create_node(NodeKind::Topic, Vec2::ZERO);
    let b = diagram.create_node(NodeKind::Subtopic, Vec2::new(300.0, 0.0));
    diagram.connect(&a, &b).unwrap();

    let canvas = Canvas::new(CanvasConfig::default());
    let list = canvas.print(&diagram, PageSetup::default(), None);

    let first_rect = list
        .iter()
        .position(|c| matches!(c, DrawCommand::Rect { .. }))
        .unwrap();
    let line = list
        .iter()
        .position(|c| matches!(c, DrawCommand::Line { .. }))
        .unwrap();
    assert!(line < first_rect);

    let DrawCommand::Line { dash, .. } = &list[line] else {
        unreachable!()
    };
    assert_eq!(dash.as_deref(), Some("5 5"));
}

#[test]
fn test_diagram_is_scaled_to_fit_page() {
    let mut diagram = RoadmapDiagram::new();
    diagram.create_node(NodeKind::Title, Vec2::ZERO);
    diagram.create_node(NodeKind::Title, Vec2::new(3000.0, 0.0));

    let config = CanvasConfig::default();
    let setup = PageSetup::new(PageSize::A4, Orientation::Landscape);
    let list = Canvas::new(config.clone()).print(&diagram, setup, Some("Roadmap"));

    assert!(matches!(&list[0], DrawCommand::Text { text, .. } if text == "Roadmap"));
    let page = setup.dimensions();
    for command in &list {
        if let DrawCommand::Rect { pos, size, .. } = command {
            assert!(pos.x >= config.page_margin - 0.01);
            assert!(pos.x + size.x <= page.x - config.page_margin + 0.01);
            assert!(pos.y + size.y <= page.y - config.page_margin + 0.01);
        }
    }
}

#[test]
fn test_transparent_section_has_no_fill() {
    let mut diagram = RoadmapDiagram::new();
    diagram.create_node(NodeKind::Section, Vec2::ZERO);

    let list = Canvas::new(CanvasConfig::default()).print(&diagram, PageSetup::default(), None);

    let DrawCommand::Rect { fill, dash, .. } = &list[0] else {
        panic!("expected a rect, got {:?}", list[0]);
    };
    assert!(fill.is_none());
    assert_eq!(dash.as_deref(), Some("6 4"));
}
