//! # Rendering System
//!
//! The canvas never draws pixels itself. It outputs a display list of `DrawCommand`s and the host
//! (a print backend, an SVG writer, a GUI) interprets them.

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

/// A single drawing primitive.
///
/// Coordinates are in **page space** (points, origin top-left).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    /// A rounded rectangle with an optional fill and stroke.
    Rect {
        /// Top-left position.
        pos: Vec2,
        size: Vec2,
        /// Fill color (RGBA, 0.0 - 1.0). `None` leaves the interior unpainted.
        fill: Option<Vec4>,
        corner_radius: f32,
        stroke_width: f32,
        stroke_color: Option<Vec4>,
        /// SVG-style dash pattern for the border.
        dash: Option<String>,
    },
    /// A straight line segment.
    Line {
        start: Vec2,
        end: Vec2,
        /// Line color (RGBA, 0.0 - 1.0).
        color: Vec4,
        width: f32,
        /// SVG-style dash pattern, `None` for a solid line.
        dash: Option<String>,
    },
    /// Text to be rendered.
    Text {
        /// Top-left position.
        pos: Vec2,
        /// The styling and layout of text is handled by the consumer.
        text: String,
        color: Vec4,
        /// Font size in points.
        size: f32,
        /// CSS-style weight (400 regular, 700 bold).
        weight: u16,
    },
}

/// A list of draw commands for one page.
pub type RenderList = Vec<DrawCommand>;
