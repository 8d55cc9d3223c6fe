//! # Style Resolver
//!
//! Fixed styling rules for roadmap nodes and edges.
//!
//! Everything in this module is a pure function of node kinds (and, for label contrast, of a
//! fill colour). The editor, the preview and the print painter all resolve styles through here,
//! so a diagram looks the same wherever it is shown.

use bitflags::bitflags;
use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::NodeKind;

/// An opaque RGB colour, written as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const WHITE: HexColor = HexColor::rgb(0xff, 0xff, 0xff);
    /// Label colour used on light fills (`#111827`).
    pub const NEAR_BLACK: HexColor = HexColor::rgb(0x11, 0x18, 0x27);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Relative luminance on the 0..=255 scale.
    pub fn luminance(&self) -> f32 {
        0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32
    }

    /// RGBA in the 0.0..=1.0 range, as consumed by `DrawCommand`s.
    pub fn to_vec4(&self) -> Vec4 {
        Vec4::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            1.0,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("colour `{0}` must start with '#'")]
    MissingHash(String),
    #[error("colour `{0}` is not a #rgb or #rrggbb hex value")]
    Invalid(String),
}

impl FromStr for HexColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let Some(digits) = trimmed.strip_prefix('#') else {
            return Err(ColorError::MissingHash(s.to_string()));
        };
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::Invalid(s.to_string()));
        }

        let channel = |hex: &str| u8::from_str_radix(hex, 16).map_err(|_| ColorError::Invalid(s.to_string()));
        match digits.len() {
            3 => {
                // #abc is shorthand for #aabbcc
                let expand = |i: usize| channel(&digits[i..i + 1].repeat(2));
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(ColorError::Invalid(s.to_string())),
        }
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for HexColor {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

/// A node fill: either a solid colour or fully transparent (sections).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Paint {
    Solid(HexColor),
    Transparent,
}

impl Paint {
    pub fn is_dark(&self) -> bool {
        match self {
            Paint::Solid(color) => is_dark(*color),
            // Transparent fills show the light canvas background.
            Paint::Transparent => false,
        }
    }

    pub fn color(&self) -> Option<HexColor> {
        match self {
            Paint::Solid(color) => Some(*color),
            Paint::Transparent => None,
        }
    }
}

impl From<HexColor> for Paint {
    fn from(color: HexColor) -> Self {
        Paint::Solid(color)
    }
}

impl FromStr for Paint {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("transparent") {
            return Ok(Paint::Transparent);
        }
        s.parse().map(Paint::Solid)
    }
}

impl fmt::Display for Paint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Paint::Solid(color) => color.fmt(f),
            Paint::Transparent => f.write_str("transparent"),
        }
    }
}

impl TryFrom<String> for Paint {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Paint> for String {
    fn from(paint: Paint) -> Self {
        paint.to_string()
    }
}

/// Fills whose luminance falls below this value get white label text.
pub const DARK_LUMINANCE_THRESHOLD: f32 = 140.0;

/// Returns true when `color` needs light text to stay readable.
pub fn is_dark(color: HexColor) -> bool {
    color.luminance() < DARK_LUMINANCE_THRESHOLD
}

/// Label text colour for a given fill: white on dark fills, near-black otherwise.
pub fn label_color_for(fill: Paint) -> HexColor {
    if fill.is_dark() {
        HexColor::WHITE
    } else {
        HexColor::NEAR_BLACK
    }
}

/// Colours offered for manual recolouring. The first entry is the only dark one.
pub const PALETTE: [HexColor; 8] = [
    HexColor::rgb(0x11, 0x18, 0x27),
    HexColor::rgb(0xfd, 0xe0, 0x47),
    HexColor::rgb(0xfe, 0xca, 0xca),
    HexColor::rgb(0xbb, 0xf7, 0xd0),
    HexColor::rgb(0xbf, 0xdb, 0xfe),
    HexColor::rgb(0xdd, 0xd6, 0xfe),
    HexColor::rgb(0xfb, 0xcf, 0xe8),
    HexColor::rgb(0xfe, 0xd7, 0xaa),
];

bitflags! {
    /// What a node of a given kind lets the user do with it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Width and height can be changed by the user.
        const RESIZABLE = 1 << 0;
        /// The node exposes connection ports on all four sides.
        const PORTS = 1 << 1;
    }
}

/// Side of a node a connection port sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Top,
    Right,
    Bottom,
    Left,
}

pub const PORT_SIDES: [PortSide; 4] = [PortSide::Top, PortSide::Right, PortSide::Bottom, PortSide::Left];

/// Outline of a node body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeShape {
    /// Rectangle with rounded corners.
    Rounded { radius: f32 },
    /// Fully rounded ends (radius = half the height).
    Pill,
}

/// The fixed default look of one node kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KindStyle {
    pub width: f32,
    pub height: f32,
    pub fill: Paint,
    pub stroke: HexColor,
    /// SVG-style dash pattern of the border, `None` for a solid border.
    pub stroke_dash: Option<&'static str>,
    pub text_color: HexColor,
    pub font_size: u32,
    pub font_weight: u16,
    pub shape: NodeShape,
    pub capabilities: Capabilities,
    /// Label a freshly created node starts with.
    pub default_label: &'static str,
}

impl KindStyle {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn is_resizable(&self) -> bool {
        self.capabilities.contains(Capabilities::RESIZABLE)
    }

    pub fn ports(&self) -> &'static [PortSide] {
        if self.capabilities.contains(Capabilities::PORTS) {
            &PORT_SIDES
        } else {
            &[]
        }
    }
}

const BODY_TEXT: HexColor = HexColor::rgb(0x1f, 0x29, 0x37);
const LIGHT_STROKE: HexColor = HexColor::rgb(0xe5, 0xe7, 0xeb);

/// Returns the default geometry and style table entry for `kind`.
pub fn default_style_for(kind: NodeKind) -> KindStyle {
    match kind {
        NodeKind::Title => KindStyle {
            width: 220.0,
            height: 64.0,
            fill: Paint::Solid(HexColor::WHITE),
            stroke: LIGHT_STROKE,
            stroke_dash: None,
            text_color: BODY_TEXT,
            font_size: 24,
            font_weight: 700,
            shape: NodeShape::Rounded { radius: 12.0 },
            capabilities: Capabilities::RESIZABLE,
            default_label: "Title",
        },
        NodeKind::Topic => KindStyle {
            width: 220.0,
            height: 80.0,
            fill: Paint::Solid(HexColor::rgb(0xee, 0xf2, 0xff)),
            stroke: HexColor::rgb(0xc7, 0xd2, 0xfe),
            stroke_dash: None,
            text_color: BODY_TEXT,
            font_size: 16,
            font_weight: 600,
            shape: NodeShape::Rounded { radius: 12.0 },
            capabilities: Capabilities::PORTS,
            default_label: "Topic",
        },
        NodeKind::Subtopic => KindStyle {
            width: 160.0,
            height: 56.0,
            fill: Paint::Solid(HexColor::rgb(0xf5, 0xf3, 0xff)),
            stroke: HexColor::rgb(0xdd, 0xd6, 0xfe),
            stroke_dash: Some("2 2"),
            text_color: BODY_TEXT,
            font_size: 14,
            font_weight: 600,
            shape: NodeShape::Rounded { radius: 10.0 },
            capabilities: Capabilities::PORTS,
            default_label: "Sub Topic",
        },
        NodeKind::Paragraph => KindStyle {
            width: 320.0,
            height: 120.0,
            fill: Paint::Solid(HexColor::WHITE),
            stroke: LIGHT_STROKE,
            stroke_dash: None,
            text_color: HexColor::rgb(0x37, 0x41, 0x51),
            font_size: 13,
            font_weight: 500,
            shape: NodeShape::Rounded { radius: 8.0 },
            capabilities: Capabilities::RESIZABLE,
            default_label: "Paragraph",
        },
        NodeKind::Label => KindStyle {
            width: 120.0,
            height: 40.0,
            fill: Paint::Solid(HexColor::WHITE),
            stroke: LIGHT_STROKE,
            stroke_dash: None,
            text_color: HexColor::NEAR_BLACK,
            font_size: 13,
            font_weight: 600,
            shape: NodeShape::Pill,
            capabilities: Capabilities::RESIZABLE,
            default_label: "Label",
        },
        NodeKind::Section => KindStyle {
            width: 380.0,
            height: 220.0,
            fill: Paint::Transparent,
            stroke: HexColor::rgb(0x9c, 0xa3, 0xaf),
            stroke_dash: Some("6 4"),
            text_color: HexColor::rgb(0x6b, 0x72, 0x80),
            font_size: 12,
            font_weight: 400,
            shape: NodeShape::Rounded { radius: 12.0 },
            capabilities: Capabilities::RESIZABLE,
            default_label: "Section",
        },
    }
}

/// Number of connection ports a node of `kind` exposes.
pub fn port_count(kind: NodeKind) -> usize {
    default_style_for(kind).ports().len()
}

/// Stroke pattern of an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Solid,
    Dashed,
}

pub const EDGE_STROKE: HexColor = HexColor::rgb(0xa2, 0xb1, 0xc3);
pub const EDGE_WIDTH: f32 = 2.0;
pub const EDGE_DASH: &str = "5 5";

/// Visual style of an edge.
///
/// Edges never carry arrowheads; the connector is undirected visually even though the model
/// keeps a source and a target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub line: LineStyle,
    pub stroke: HexColor,
    pub stroke_width: f32,
}

impl EdgeStyle {
    pub fn solid() -> Self {
        Self {
            line: LineStyle::Solid,
            stroke: EDGE_STROKE,
            stroke_width: EDGE_WIDTH,
        }
    }

    pub fn dashed() -> Self {
        Self {
            line: LineStyle::Dashed,
            ..Self::solid()
        }
    }

    /// SVG-style dash array, `None` for solid lines.
    pub fn dash_array(&self) -> Option<&'static str> {
        match self.line {
            LineStyle::Solid => None,
            LineStyle::Dashed => Some(EDGE_DASH),
        }
    }
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self::solid()
    }
}

/// Resolves the style of a new edge from its endpoint kinds.
///
/// Evaluated once, when the connection is made. Unknown kinds fall back to a solid line.
pub fn edge_style_for(source: Option<NodeKind>, target: Option<NodeKind>) -> EdgeStyle {
    match (source, target) {
        (Some(NodeKind::Topic), Some(NodeKind::Topic)) => EdgeStyle::solid(),
        (Some(NodeKind::Topic), Some(NodeKind::Subtopic))
        | (Some(NodeKind::Subtopic), Some(NodeKind::Topic)) => EdgeStyle::dashed(),
        _ => EdgeStyle::solid(),
    }
}

/// Configuration parameters for the Canvas.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Blank border kept around the diagram on printed pages, in points. Default: 36.0.
    pub page_margin: f32,
    /// Font size of the roadmap title printed above the diagram. Default: 18.0.
    pub heading_font_size: f32,
    /// Upper bound for the print scale; diagrams smaller than the page are not enlarged past it.
    pub max_print_scale: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            page_margin: 36.0,
            heading_font_size: 18.0,
            max_print_scale: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_parsing() {
        assert_eq!("#111827".parse::<HexColor>(), Ok(HexColor::NEAR_BLACK));
        assert_eq!("#FFF".parse::<HexColor>(), Ok(HexColor::WHITE));
        assert_eq!(" #A2B1C3 ".parse::<HexColor>(), Ok(EDGE_STROKE));
        assert!(matches!("111827".parse::<HexColor>(), Err(ColorError::MissingHash(_))));
        assert!(matches!("#12345".parse::<HexColor>(), Err(ColorError::Invalid(_))));
        assert!(matches!("#zzzzzz".parse::<HexColor>(), Err(ColorError::Invalid(_))));
        assert_eq!(HexColor::rgb(0xab, 0x0c, 0xff).to_string(), "#ab0cff");
    }

    #[test]
    fn test_paint_transparent_roundtrip() {
        let paint: Paint = "Transparent".parse().unwrap();
        assert_eq!(paint, Paint::Transparent);
        assert_eq!(paint.to_string(), "transparent");
        assert!(!paint.is_dark());
        assert_eq!(label_color_for(paint), HexColor::NEAR_BLACK);
    }

    #[test]
    fn test_section_has_no_ports_and_is_resizable() {
        let style = default_style_for(NodeKind::Section);
        assert!(style.is_resizable());
        assert!(style.ports().is_empty());
        assert_eq!(style.fill, Paint::Transparent);
        assert_eq!(style.stroke_dash, Some("6 4"));
    }
}
