//! Diagram JSON codec.
//!
//! The backend stores a diagram as an opaque JSON string (`diagramJSON`). Reading is lenient:
//! anything that can be repaired from the node kind is repaired, anything that cannot is dropped
//! and reported. Writing is lossless.

use glam::Vec2;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::config::{self, EdgeStyle, HexColor, LineStyle, Paint};
use crate::model::{
    Edge, EdgeId, Node, NodeContent, NodeId, NodeKind, NodeStyle, Resource, ResourceKind,
    RoadmapDiagram,
};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("diagram is not valid JSON: {0}")]
    Json(String),
    #[error("diagram must be an object with `nodes` and `edges` arrays")]
    Shape,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode diagram: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Why an element of the stored document was left out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    NotAnObject,
    MissingId,
    UnknownKind(String),
    DuplicateId,
    /// The edge references a node that is not in the diagram.
    DanglingEndpoint,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedItem {
    /// Position in the stored array.
    pub index: usize,
    pub id: Option<String>,
    pub reason: DropReason,
}

/// What `parse_with_report` had to leave out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub dropped_nodes: Vec<DroppedItem>,
    pub dropped_edges: Vec<DroppedItem>,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_nodes.is_empty() && self.dropped_edges.is_empty()
    }
}

/// Parses a stored diagram, recovering from damaged elements where possible.
pub fn parse(raw: &str) -> Result<RoadmapDiagram, ParseError> {
    parse_with_report(raw).map(|(diagram, _)| diagram)
}

/// Like [`parse`], also returning the elements that were dropped.
pub fn parse_with_report(raw: &str) -> Result<(RoadmapDiagram, ParseReport), ParseError> {
    let root: Value = serde_json::from_str(raw).map_err(|e| ParseError::Json(e.to_string()))?;
    let (Some(raw_nodes), Some(raw_edges)) = (
        root.get("nodes").and_then(Value::as_array),
        root.get("edges").and_then(Value::as_array),
    ) else {
        return Err(ParseError::Shape);
    };

    let mut diagram = RoadmapDiagram::new();
    let mut report = ParseReport::default();

    for (index, value) in raw_nodes.iter().enumerate() {
        match read_node(value) {
            Ok(node) => {
                let id = node.id.clone();
                if diagram.insert_node(node).is_err() {
                    report.dropped_nodes.push(DroppedItem {
                        index,
                        id: Some(id.to_string()),
                        reason: DropReason::DuplicateId,
                    });
                }
            }
            Err(reason) => report.dropped_nodes.push(DroppedItem {
                index,
                id: value.get("id").and_then(id_string),
                reason,
            }),
        }
    }

    let mut seen_edges = HashSet::new();
    for (index, value) in raw_edges.iter().enumerate() {
        let dropped = |reason| DroppedItem {
            index,
            id: value.get("id").and_then(id_string),
            reason,
        };
        let Some(obj) = value.as_object() else {
            report.dropped_edges.push(dropped(DropReason::NotAnObject));
            continue;
        };
        let id = obj
            .get("id")
            .and_then(id_string)
            .map(EdgeId::new)
            .unwrap_or_else(EdgeId::generate);
        if !seen_edges.insert(id.clone()) {
            report.dropped_edges.push(dropped(DropReason::DuplicateId));
            continue;
        }

        let endpoint = |primary: &str, fallback: &str| {
            obj.get(primary)
                .or_else(|| obj.get(fallback))
                .and_then(id_string)
                .map(NodeId::new)
        };
        let (Some(source), Some(target)) = (endpoint("sourceId", "source"), endpoint("targetId", "target")) else {
            report.dropped_edges.push(dropped(DropReason::DanglingEndpoint));
            continue;
        };
        let (Ok(source_kind), Ok(target_kind)) = (diagram.kind_of(&source), diagram.kind_of(&target)) else {
            report.dropped_edges.push(dropped(DropReason::DanglingEndpoint));
            continue;
        };

        let resolved = config::edge_style_for(Some(source_kind), Some(target_kind));
        let style = obj
            .get("style")
            .and_then(Value::as_object)
            .map(|s| read_edge_style(s, resolved))
            .unwrap_or(resolved);

        if diagram
            .insert_edge(Edge {
                id,
                source,
                target,
                style,
            })
            .is_err()
        {
            report.dropped_edges.push(dropped(DropReason::DanglingEndpoint));
        }
    }

    if !report.is_clean() {
        tracing::warn!(
            dropped_nodes = report.dropped_nodes.len(),
            dropped_edges = report.dropped_edges.len(),
            "recovered damaged diagram"
        );
    }

    Ok((diagram, report))
}

/// Accepts ids stored either as strings or as numbers.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(obj: &Map<String, Value>, key: &str) -> Option<f32> {
    obj.get(key)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn read_node(value: &Value) -> Result<Node, DropReason> {
    let obj = value.as_object().ok_or(DropReason::NotAnObject)?;
    let id = obj.get("id").and_then(id_string).ok_or(DropReason::MissingId)?;
    let kind_name = obj.get("type").and_then(Value::as_str).unwrap_or_default();
    let kind: NodeKind = kind_name
        .parse()
        .map_err(|_| DropReason::UnknownKind(kind_name.to_string()))?;

    let mut node = Node::new(NodeId::new(id), kind, Vec2::ZERO);

    if let Some(pos) = obj.get("position").and_then(Value::as_object) {
        node.position = Vec2::new(number(pos, "x").unwrap_or(0.0), number(pos, "y").unwrap_or(0.0));
    }
    if let Some(size) = obj.get("size").and_then(Value::as_object) {
        if let (Some(w), Some(h)) = (number(size, "width"), number(size, "height")) {
            if w > 0.0 && h > 0.0 {
                node.size = Vec2::new(w, h);
            }
        }
    }
    if let Some(label) = text(obj, "label") {
        node.label = label;
    }
    if let Some(style) = obj.get("style").and_then(Value::as_object) {
        node.style = read_node_style(style, node.style);
    }
    if let Some(content) = obj.get("content").and_then(Value::as_object) {
        node.content = read_content(content);
    }

    Ok(node)
}

fn read_node_style(obj: &Map<String, Value>, defaults: NodeStyle) -> NodeStyle {
    let parsed = |key: &str| obj.get(key).and_then(Value::as_str);
    NodeStyle {
        font_size: number(obj, "fontSize")
            .map(f32::round)
            .filter(|v| *v >= 1.0)
            .map(|v| v as u32)
            .unwrap_or(defaults.font_size),
        fill_color: parsed("fillColor")
            .and_then(|s| s.parse::<Paint>().ok())
            .unwrap_or(defaults.fill_color),
        text_color: parsed("textColor")
            .and_then(|s| s.parse::<HexColor>().ok())
            .unwrap_or(defaults.text_color),
    }
}

fn read_content(obj: &Map<String, Value>) -> NodeContent {
    let resources = obj
        .get("resources")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|r| Resource {
                    kind: ResourceKind::from(text(r, "type").unwrap_or_default()),
                    title: text(r, "title").unwrap_or_default(),
                    url: text(r, "url").unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    NodeContent {
        content_title: text(obj, "contentTitle").unwrap_or_default(),
        content_description: text(obj, "contentDescription").unwrap_or_default(),
        resources,
    }
}

fn read_edge_style(obj: &Map<String, Value>, resolved: EdgeStyle) -> EdgeStyle {
    let line = match obj.get("line").and_then(Value::as_str) {
        Some("dashed") => LineStyle::Dashed,
        Some("solid") => LineStyle::Solid,
        _ => resolved.line,
    };
    EdgeStyle {
        line,
        stroke: obj
            .get("stroke")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(resolved.stroke),
        stroke_width: number(obj, "strokeWidth")
            .filter(|w| *w > 0.0)
            .unwrap_or(resolved.stroke_width),
    }
}

#[derive(Serialize)]
struct WirePoint {
    x: f32,
    y: f32,
}

#[derive(Serialize)]
struct WireSize {
    width: f32,
    height: f32,
}

#[derive(Serialize)]
struct WireNode<'a> {
    id: &'a NodeId,
    #[serde(rename = "type")]
    kind: NodeKind,
    position: WirePoint,
    size: WireSize,
    label: &'a str,
    style: &'a NodeStyle,
    content: &'a NodeContent,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireEdge<'a> {
    id: &'a EdgeId,
    source_id: &'a NodeId,
    target_id: &'a NodeId,
    style: &'a EdgeStyle,
}

#[derive(Serialize)]
struct WireDiagram<'a> {
    nodes: Vec<WireNode<'a>>,
    edges: Vec<WireEdge<'a>>,
}

/// Encodes a diagram into its stored JSON form. Nodes are written in draw order.
pub fn serialize(diagram: &RoadmapDiagram) -> Result<String, EncodeError> {
    let wire = WireDiagram {
        nodes: diagram
            .nodes()
            .map(|n| WireNode {
                id: &n.id,
                kind: n.kind,
                position: WirePoint {
                    x: n.position.x,
                    y: n.position.y,
                },
                size: WireSize {
                    width: n.size.x,
                    height: n.size.y,
                },
                label: &n.label,
                style: &n.style,
                content: &n.content,
            })
            .collect(),
        edges: diagram
            .edges()
            .map(|e| WireEdge {
                id: &e.id,
                source_id: &e.source,
                target_id: &e.target,
                style: &e.style,
            })
            .collect(),
    };
    Ok(serde_json::to_string(&wire)?)
}

/// The stored form of a diagram that was never edited.
pub const EMPTY_DIAGRAM: &str = r#"{"nodes":[],"edges":[]}"#;
