use glam::Vec2;

use crate::config::Paint;
use crate::model::{self, DiagramError, EdgeId, NodeContent, NodeId, NodeKind, RoadmapDiagram};

/// Whether the current user may change the diagram.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Access {
    Editable,
    /// Every mutating gesture is rejected.
    #[default]
    ReadOnly,
}

impl Access {
    pub fn is_editable(&self) -> bool {
        matches!(self, Access::Editable)
    }
}

/// A user intent, already translated from whatever event the rendering library produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Gesture {
    /// Drop a new node from the palette.
    Create { kind: NodeKind, position: Vec2 },
    Move { id: NodeId, position: Vec2 },
    Resize { id: NodeId, size: Vec2 },
    /// Drag a connection from one node's port to another node.
    Connect { source: NodeId, target: NodeId },
    Delete { id: NodeId },
    DeleteEdge { id: EdgeId },
    Recolor { id: NodeId, fill: Paint },
    SetFontSize { id: NodeId, font_size: u32 },
    Rename { id: NodeId, label: String },
    EditContent { id: NodeId, content: NodeContent },
    BringToFront { id: NodeId },
}

/// Events emitted by the Canvas logic to the host application.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicEvent {
    NodeCreated { id: NodeId },
    NodeMoved { id: NodeId, position: Vec2 },
    NodeResized { id: NodeId, size: Vec2 },
    Connected { edge: EdgeId, source: NodeId, target: NodeId },
    /// A node was deleted along with the edges listed.
    NodeDeleted { id: NodeId, edges: Vec<EdgeId> },
    EdgeDeleted { id: EdgeId },
    /// Style, label or content of a node changed.
    NodeUpdated { id: NodeId },
    /// The diagram visual state has changed, requiring a repaint.
    RepaintNeeded,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GestureError {
    #[error("the diagram is read-only")]
    ReadOnly,
    #[error(transparent)]
    Diagram(#[from] DiagramError),
}

/// Applies one gesture to the diagram.
///
/// This is the only path through which user input mutates a diagram. With `Access::ReadOnly`
/// nothing is touched and `GestureError::ReadOnly` is returned.
pub fn handle_gesture(
    access: Access,
    gesture: Gesture,
    diagram: &mut RoadmapDiagram,
    events: &mut Vec<LogicEvent>,
) -> Result<(), GestureError> {
    if !access.is_editable() {
        tracing::debug!(?gesture, "gesture rejected on read-only canvas");
        return Err(GestureError::ReadOnly);
    }

    match gesture {
        Gesture::Create { kind, position } => {
            model::check_position(position)?;
            let id = diagram.create_node(kind, position);
            events.push(LogicEvent::NodeCreated { id });
        }
        Gesture::Move { id, position } => {
            diagram.move_node(&id, position)?;
            events.push(LogicEvent::NodeMoved { id, position });
        }
        Gesture::Resize { id, size } => {
            diagram.resize_node(&id, size)?;
            events.push(LogicEvent::NodeResized { id, size });
        }
        Gesture::Connect { source, target } => {
            let edge = diagram.connect(&source, &target)?;
            events.push(LogicEvent::Connected {
                edge,
                source,
                target,
            });
        }
        Gesture::Delete { id } => {
            let edges: Vec<EdgeId> = diagram
                .edges()
                .filter(|e| e.source == id || e.target == id)
                .map(|e| e.id.clone())
                .collect();
            diagram.remove_node(&id)?;
            events.push(LogicEvent::NodeDeleted { id, edges });
        }
        Gesture::DeleteEdge { id } => {
            diagram.remove_edge(&id)?;
            events.push(LogicEvent::EdgeDeleted { id });
        }
        Gesture::Recolor { id, fill } => {
            diagram.set_fill(&id, fill)?;
            events.push(LogicEvent::NodeUpdated { id });
        }
        Gesture::SetFontSize { id, font_size } => {
            diagram.set_font_size(&id, font_size)?;
            events.push(LogicEvent::NodeUpdated { id });
        }
        Gesture::Rename { id, label } => {
            diagram.set_label(&id, label)?;
            events.push(LogicEvent::NodeUpdated { id });
        }
        Gesture::EditContent { id, content } => {
            diagram.set_content(&id, content)?;
            events.push(LogicEvent::NodeUpdated { id });
        }
        Gesture::BringToFront { id } => {
            diagram.bring_to_front(&id)?;
        }
    }

    events.push(LogicEvent::RepaintNeeded);
    Ok(())
}
