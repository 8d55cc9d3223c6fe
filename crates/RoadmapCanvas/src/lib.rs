//! # RoadmapCanvas
//!
//! `roadmap_canvas` is the headless core of the roadmap editor: the diagram document, its fixed
//! styling rules, the stored JSON form, and a print painter. It knows nothing about any GUI
//! toolkit; a host translates its own events into [`Gesture`]s and feeds them through
//! [`Canvas::dispatch`].
//!
//! ## Core Architecture
//! - **Model (`src/model.rs`)**: nodes and edges in flat arenas (SlotMap) plus draw order.
//! - **Config (`src/config.rs`)**: per-kind defaults, edge styles, colour contrast.
//! - **Persistence (`src/persistence.rs`)**: lenient parse and lossless serialize.
//! - **Painter (`src/painter.rs`)**: outputs a list of `DrawCommand`s for a printed page.

pub mod config;
pub mod interaction;
pub mod math;
pub mod model;
pub mod painter;
pub mod persistence;
pub mod render;

use model::RoadmapDiagram;
use render::RenderList;

// Re-exports for convenience
pub use config::CanvasConfig;
pub use interaction::{Access, Gesture, GestureError, LogicEvent};
pub use painter::{Orientation, PageSetup, PageSize};

/// The editing surface in front of a diagram.
///
/// The `Canvas` holds the access level and configuration. Every user-driven mutation goes through
/// [`Canvas::dispatch`], which is where read-only mode is enforced.
#[derive(Clone, Debug, Default)]
pub struct Canvas {
    pub config: CanvasConfig,
    access: Access,
}

impl Canvas {
    /// Creates a read-only canvas with the given configuration.
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            config,
            access: Access::ReadOnly,
        }
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn set_access(&mut self, access: Access) {
        if self.access != access {
            tracing::debug!(?access, "canvas access changed");
        }
        self.access = access;
    }

    pub fn is_editable(&self) -> bool {
        self.access.is_editable()
    }

    /// Applies a gesture to `diagram` and returns the resulting events.
    pub fn dispatch(
        &self,
        gesture: Gesture,
        diagram: &mut RoadmapDiagram,
    ) -> Result<Vec<LogicEvent>, GestureError> {
        let mut events = Vec::new();
        interaction::handle_gesture(self.access, gesture, diagram, &mut events)?;
        Ok(events)
    }

    /// Renders `diagram` onto one printed page.
    pub fn print(&self, diagram: &RoadmapDiagram, setup: PageSetup, heading: Option<&str>) -> RenderList {
        painter::PrintPainter::draw_diagram(diagram, setup, &self.config, heading)
    }
}
