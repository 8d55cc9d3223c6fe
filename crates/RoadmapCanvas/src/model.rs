//! # Core Data Models
//!
//! The roadmap diagram: typed nodes, undirected-looking edges, and the draw order.
//!
//! Nodes and edges live in flat `SlotMap` arenas. Persistent identity is carried by string ids
//! (`NodeId`, `EdgeId`) which the backend stores verbatim; the slot keys never leave this crate.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::{self, EdgeStyle, HexColor, Paint};

new_key_type! {
    /// Arena slot of a node.
    pub struct NodeKey;
    /// Arena slot of an edge.
    pub struct EdgeKey;
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh client-side id (UUID v4).
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Stable identity of a node, unique within a diagram.
    NodeId
);
string_id!(
    /// Stable identity of an edge.
    EdgeId
);

/// The closed set of node types a roadmap can contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Title,
    Topic,
    Subtopic,
    Paragraph,
    Label,
    Section,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Title,
        NodeKind::Topic,
        NodeKind::Subtopic,
        NodeKind::Paragraph,
        NodeKind::Label,
        NodeKind::Section,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Title => "title",
            NodeKind::Topic => "topic",
            NodeKind::Subtopic => "subtopic",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Label => "label",
            NodeKind::Section => "section",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown node type `{0}`")]
pub struct UnknownNodeKind(pub String);

impl FromStr for NodeKind {
    type Err = UnknownNodeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| UnknownNodeKind(s.to_string()))
    }
}

/// Category of a learning resource attached to a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Article,
    Video,
    Course,
    Docs,
    Tool,
    Other,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Article => "Article",
            ResourceKind::Video => "Video",
            ResourceKind::Course => "Course",
            ResourceKind::Docs => "Docs",
            ResourceKind::Tool => "Tool",
            ResourceKind::Other => "Other",
        }
    }
}

impl From<String> for ResourceKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "article" => ResourceKind::Article,
            "video" => ResourceKind::Video,
            "course" => ResourceKind::Course,
            "docs" | "documentation" => ResourceKind::Docs,
            "tool" => ResourceKind::Tool,
            _ => ResourceKind::Other,
        }
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A link shown in a node's details panel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub title: String,
    pub url: String,
}

/// Long-form content attached to a node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeContent {
    pub content_title: String,
    pub content_description: String,
    /// Ordered; the order is the display order.
    pub resources: Vec<Resource>,
}

/// Per-node visual overrides.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    /// Label size in points; never zero.
    pub font_size: u32,
    pub fill_color: Paint,
    pub text_color: HexColor,
}

impl NodeStyle {
    pub fn default_for(kind: NodeKind) -> Self {
        let style = config::default_style_for(kind);
        Self {
            font_size: style.font_size,
            fill_color: style.fill,
            text_color: style.text_color,
        }
    }
}

/// A node of the roadmap.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// World-space position of the top-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub label: String,
    pub style: NodeStyle,
    pub content: NodeContent,
}

impl Node {
    /// A node of `kind` with the kind's default size, label and style, and empty content.
    pub fn new(id: NodeId, kind: NodeKind, position: Vec2) -> Self {
        let defaults = config::default_style_for(kind);
        Self {
            id,
            kind,
            position,
            size: defaults.size(),
            label: defaults.default_label.to_string(),
            style: NodeStyle::default_for(kind),
            content: NodeContent::default(),
        }
    }

    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }
}

/// A connection between two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    /// Resolved once, when the connection was made.
    pub style: EdgeStyle,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DiagramError {
    #[error("node `{0}` already exists")]
    DuplicateNode(NodeId),
    #[error("edge `{0}` already exists")]
    DuplicateEdge(EdgeId),
    #[error("node `{0}` not found")]
    UnknownNode(NodeId),
    #[error("edge `{0}` not found")]
    UnknownEdge(EdgeId),
    #[error("{0} nodes cannot be resized")]
    NotResizable(NodeKind),
    #[error("invalid node size {width}x{height}")]
    InvalidSize { width: f32, height: f32 },
    #[error("invalid node position ({x}, {y})")]
    InvalidPosition { x: f32, y: f32 },
    #[error("font size must be at least 1, got {0}")]
    InvalidFontSize(u32),
    #[error("resource index {index} out of range ({len} resources)")]
    ResourceOutOfRange { index: usize, len: usize },
}

/// The whole roadmap document.
///
/// Nodes are kept in an arena plus an explicit draw order (lower index is drawn first), which is
/// also the order nodes are written back on save.
#[derive(Clone, Debug, Default)]
pub struct RoadmapDiagram {
    nodes: SlotMap<NodeKey, Node>,
    edges: SlotMap<EdgeKey, Edge>,
    draw_order: Vec<NodeKey>,
    node_index: HashMap<NodeId, NodeKey>,
    edge_index: HashMap<EdgeId, EdgeKey>,
}

impl RoadmapDiagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Creates a node of `kind` at `position` with the kind's defaults and puts it on top.
    pub fn create_node(&mut self, kind: NodeKind, position: Vec2) -> NodeId {
        let id = NodeId::generate();
        let key = self.nodes.insert(Node::new(id.clone(), kind, position));
        self.node_index.insert(id.clone(), key);
        self.draw_order.push(key);
        id
    }

    /// Inserts a fully specified node on top of the draw order.
    pub fn insert_node(&mut self, node: Node) -> Result<(), DiagramError> {
        if self.node_index.contains_key(&node.id) {
            return Err(DiagramError::DuplicateNode(node.id));
        }
        check_position(node.position)?;
        if node.style.font_size == 0 {
            return Err(DiagramError::InvalidFontSize(0));
        }
        let id = node.id.clone();
        let key = self.nodes.insert(node);
        self.node_index.insert(id, key);
        self.draw_order.push(key);
        Ok(())
    }

    /// Removes a node together with every edge that touches it.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<Node, DiagramError> {
        let key = self
            .node_index
            .remove(id)
            .ok_or_else(|| DiagramError::UnknownNode(id.clone()))?;
        self.draw_order.retain(|k| *k != key);

        let incident: Vec<EdgeKey> = self
            .edges
            .iter()
            .filter(|(_, e)| &e.source == id || &e.target == id)
            .map(|(k, _)| k)
            .collect();
        for edge_key in incident {
            if let Some(edge) = self.edges.remove(edge_key) {
                self.edge_index.remove(&edge.id);
            }
        }

        self.nodes
            .remove(key)
            .ok_or_else(|| DiagramError::UnknownNode(id.clone()))
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.node_index.get(id).and_then(|k| self.nodes.get(*k))
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        let key = *self.node_index.get(id)?;
        self.nodes.get_mut(key)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_index.contains_key(id)
    }

    /// Nodes in draw order, bottom first.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.draw_order.iter().filter_map(|k| self.nodes.get(*k))
    }

    /// Connects two existing nodes, resolving the edge style from their kinds.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> Result<EdgeId, DiagramError> {
        let source_kind = self.kind_of(source)?;
        let target_kind = self.kind_of(target)?;
        let edge = Edge {
            id: EdgeId::generate(),
            source: source.clone(),
            target: target.clone(),
            style: config::edge_style_for(Some(source_kind), Some(target_kind)),
        };
        let id = edge.id.clone();
        self.insert_edge(edge)?;
        Ok(id)
    }

    /// Inserts an edge as-is. Both endpoints must exist.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), DiagramError> {
        if self.edge_index.contains_key(&edge.id) {
            return Err(DiagramError::DuplicateEdge(edge.id));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !self.contains_node(endpoint) {
                return Err(DiagramError::UnknownNode(endpoint.clone()));
            }
        }
        let id = edge.id.clone();
        let key = self.edges.insert(edge);
        self.edge_index.insert(id, key);
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Result<Edge, DiagramError> {
        let key = self
            .edge_index
            .remove(id)
            .ok_or_else(|| DiagramError::UnknownEdge(id.clone()))?;
        self.edges
            .remove(key)
            .ok_or_else(|| DiagramError::UnknownEdge(id.clone()))
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edge_index.get(id).and_then(|k| self.edges.get(*k))
    }

    /// Edges in arena order. This is not insertion order: slots freed by a removal are reused.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values()
    }

    pub fn move_node(&mut self, id: &NodeId, position: Vec2) -> Result<(), DiagramError> {
        let node = self.require_node(id)?;
        check_position(position)?;
        node.position = position;
        Ok(())
    }

    /// Resizes a node. Only kinds with the `RESIZABLE` capability accept a new size.
    pub fn resize_node(&mut self, id: &NodeId, size: Vec2) -> Result<(), DiagramError> {
        let node = self.require_node(id)?;
        if !config::default_style_for(node.kind).is_resizable() {
            return Err(DiagramError::NotResizable(node.kind));
        }
        if !size.is_finite() || size.x <= 0.0 || size.y <= 0.0 {
            return Err(DiagramError::InvalidSize {
                width: size.x,
                height: size.y,
            });
        }
        node.size = size;
        Ok(())
    }

    pub fn set_label(&mut self, id: &NodeId, label: impl Into<String>) -> Result<(), DiagramError> {
        self.require_node(id)?.label = label.into();
        Ok(())
    }

    /// Recolours a node and switches its label colour to stay readable on the new fill.
    pub fn set_fill(&mut self, id: &NodeId, fill: Paint) -> Result<(), DiagramError> {
        let node = self.require_node(id)?;
        node.style.fill_color = fill;
        node.style.text_color = config::label_color_for(fill);
        Ok(())
    }

    pub fn set_font_size(&mut self, id: &NodeId, font_size: u32) -> Result<(), DiagramError> {
        let node = self.require_node(id)?;
        if font_size == 0 {
            return Err(DiagramError::InvalidFontSize(font_size));
        }
        node.style.font_size = font_size;
        Ok(())
    }

    pub fn set_content(&mut self, id: &NodeId, content: NodeContent) -> Result<(), DiagramError> {
        self.require_node(id)?.content = content;
        Ok(())
    }

    pub fn add_resource(&mut self, id: &NodeId, resource: Resource) -> Result<(), DiagramError> {
        self.require_node(id)?.content.resources.push(resource);
        Ok(())
    }

    pub fn remove_resource(&mut self, id: &NodeId, index: usize) -> Result<Resource, DiagramError> {
        let resources = &mut self.require_node(id)?.content.resources;
        if index >= resources.len() {
            return Err(DiagramError::ResourceOutOfRange {
                index,
                len: resources.len(),
            });
        }
        Ok(resources.remove(index))
    }

    /// Moves a node to the top of the draw order.
    pub fn bring_to_front(&mut self, id: &NodeId) -> Result<(), DiagramError> {
        let key = *self
            .node_index
            .get(id)
            .ok_or_else(|| DiagramError::UnknownNode(id.clone()))?;
        if let Some(index) = self.draw_order.iter().position(|k| *k == key) {
            let key = self.draw_order.remove(index);
            self.draw_order.push(key);
        }
        Ok(())
    }

    pub fn kind_of(&self, id: &NodeId) -> Result<NodeKind, DiagramError> {
        self.node(id)
            .map(|n| n.kind)
            .ok_or_else(|| DiagramError::UnknownNode(id.clone()))
    }

    fn require_node(&mut self, id: &NodeId) -> Result<&mut Node, DiagramError> {
        self.node_mut(id)
            .ok_or_else(|| DiagramError::UnknownNode(id.clone()))
    }
}

/// Positions must survive a trip through JSON, which has no NaN or infinity.
pub(crate) fn check_position(position: Vec2) -> Result<(), DiagramError> {
    if !position.is_finite() {
        return Err(DiagramError::InvalidPosition {
            x: position.x,
            y: position.y,
        });
    }
    Ok(())
}

impl PartialEq for RoadmapDiagram {
    /// Same nodes in the same draw order, and the same edges in any order.
    fn eq(&self, other: &Self) -> bool {
        if self.node_count() != other.node_count() || self.edge_count() != other.edge_count() {
            return false;
        }
        if !self.nodes().eq(other.nodes()) {
            return false;
        }

        let mut ours: Vec<&Edge> = self.edges().collect();
        let mut theirs: Vec<&Edge> = other.edges().collect();
        ours.sort_by(|a, b| a.id.cmp(&b.id));
        theirs.sort_by(|a, b| a.id.cmp(&b.id));
        ours == theirs
    }
}
