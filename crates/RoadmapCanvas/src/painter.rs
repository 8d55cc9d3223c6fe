use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::{self, CanvasConfig, HexColor, NodeShape};
use crate::math::{self, Rect};
use crate::model::{Node, RoadmapDiagram};
use crate::render::{DrawCommand, RenderList};

/// Paper formats offered by the print dialog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    A3,
}

impl PageSize {
    /// Portrait dimensions in points (1/72 inch).
    pub fn dimensions(&self) -> Vec2 {
        match self {
            PageSize::A4 => Vec2::new(595.0, 842.0),
            PageSize::Letter => Vec2::new(612.0, 792.0),
            PageSize::A3 => Vec2::new(842.0, 1191.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSetup {
    pub page_size: PageSize,
    pub orientation: Orientation,
}

impl PageSetup {
    pub fn new(page_size: PageSize, orientation: Orientation) -> Self {
        Self {
            page_size,
            orientation,
        }
    }

    /// Page dimensions with the orientation applied.
    pub fn dimensions(&self) -> Vec2 {
        let portrait = self.page_size.dimensions();
        match self.orientation {
            Orientation::Portrait => portrait,
            Orientation::Landscape => Vec2::new(portrait.y, portrait.x),
        }
    }
}

/// Maps diagram coordinates onto the page.
#[derive(Clone, Copy, Debug)]
struct PageTransform {
    origin: Vec2,
    content_min: Vec2,
    scale: f32,
}

impl PageTransform {
    fn point(&self, p: Vec2) -> Vec2 {
        self.origin + (p - self.content_min) * self.scale
    }
}

const LABEL_PADDING: f32 = 8.0;

/// Lays a diagram out on a single printed page.
///
/// The whole diagram is scaled uniformly to fit inside the page margins. Edges are drawn first,
/// center to center, so nodes sit on top of them; nodes follow in draw order.
pub struct PrintPainter;

impl PrintPainter {
    pub fn draw_diagram(
        diagram: &RoadmapDiagram,
        setup: PageSetup,
        config: &CanvasConfig,
        heading: Option<&str>,
    ) -> RenderList {
        let mut draw_list = Vec::new();
        let page = setup.dimensions();
        let margin = Vec2::splat(config.page_margin);
        let mut top_left = margin;

        if let Some(title) = heading.filter(|t| !t.is_empty()) {
            draw_list.push(DrawCommand::Text {
                pos: top_left,
                text: title.to_string(),
                color: HexColor::NEAR_BLACK.to_vec4(),
                size: config.heading_font_size,
                weight: 700,
            });
            top_left.y += config.heading_font_size * 1.6;
        }

        let Some(bounds) = Rect::bounding(diagram.nodes().map(|n| Rect::new(n.position, n.size))) else {
            return draw_list;
        };
        let available = (page - margin - top_left).max(Vec2::ZERO);
        let transform = PageTransform {
            origin: top_left,
            content_min: bounds.min,
            scale: math::fit_scale(bounds.size(), available, config.max_print_scale),
        };

        for edge in diagram.edges() {
            let (Some(source), Some(target)) = (diagram.node(&edge.source), diagram.node(&edge.target)) else {
                continue;
            };
            draw_list.push(DrawCommand::Line {
                start: transform.point(source.center()),
                end: transform.point(target.center()),
                color: edge.style.stroke.to_vec4(),
                width: edge.style.stroke_width * transform.scale,
                dash: edge.style.dash_array().map(str::to_string),
            });
        }

        for node in diagram.nodes() {
            Self::draw_node(node, &transform, &mut draw_list);
        }

        draw_list
    }

    fn draw_node(node: &Node, transform: &PageTransform, draw_list: &mut RenderList) {
        let kind_style = config::default_style_for(node.kind);
        let pos = transform.point(node.position);
        let size = node.size * transform.scale;
        let corner_radius = match kind_style.shape {
            NodeShape::Rounded { radius } => radius * transform.scale,
            NodeShape::Pill => size.y * 0.5,
        };

        draw_list.push(DrawCommand::Rect {
            pos,
            size,
            fill: node.style.fill_color.color().map(|c| c.to_vec4()),
            corner_radius,
            stroke_width: transform.scale,
            stroke_color: Some(kind_style.stroke.to_vec4()),
            dash: kind_style.stroke_dash.map(str::to_string),
        });

        if !node.label.is_empty() {
            draw_list.push(DrawCommand::Text {
                pos: pos + Vec2::splat(LABEL_PADDING * transform.scale),
                text: node.label.clone(),
                color: node.style.text_color.to_vec4(),
                size: node.style.font_size as f32 * transform.scale,
                weight: kind_style.font_weight,
            });
        }
    }
}

