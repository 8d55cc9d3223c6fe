use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self {
            min: pos,
            max: pos + size,
        }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn union(&self, other: &Rect) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Smallest rectangle containing all of `rects`, or `None` for an empty input.
    pub fn bounding<I: IntoIterator<Item = Rect>>(rects: I) -> Option<Rect> {
        rects.into_iter().reduce(|acc, r| acc.union(&r))
    }
}

/// Uniform scale that fits `content` inside `available`, capped at `max_scale`.
pub fn fit_scale(content: Vec2, available: Vec2, max_scale: f32) -> f32 {
    if content.x <= 0.0 || content.y <= 0.0 {
        return max_scale;
    }
    (available.x / content.x)
        .min(available.y / content.y)
        .min(max_scale)
        .max(0.0)
}
