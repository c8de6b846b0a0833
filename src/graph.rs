// src/graph.rs

//! Node/edge collection serialized for the network visualization.
//!
//! Nodes are keyed by id: adding a node with a known id replaces it in place,
//! so the JSON keeps first-insertion order. Edges are never deduplicated and
//! are not checked against the node set, which lets dependency edges be
//! added once every package is known.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeGroup {
    Package,
    Person,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeShape {
    Circle,
    CircularImage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub group: NodeGroup,
    pub id: String,
    pub label: String,
    /// Lookup key, only set on package nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub shape: NodeShape,
}

impl Node {
    pub fn package(id: impl Into<String>, name: &str) -> Self {
        Self {
            group: NodeGroup::Package,
            id: id.into(),
            label: name.to_string(),
            name: Some(name.to_string()),
            image: None,
            shape: NodeShape::Circle,
        }
    }

    pub fn person(id: impl Into<String>, label: &str, image: impl Into<String>) -> Self {
        Self {
            group: NodeGroup::Person,
            id: id.into(),
            label: label.to_string(),
            name: None,
            image: Some(image.into()),
            shape: NodeShape::CircularImage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: String,
    #[serde(serialize_with = "serialize_width")]
    pub width: f64,
    pub color: String,
}

impl Edge {
    /// Creates an edge with the default width (1) and color (black).
    pub fn new(from: impl Into<String>, to: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: label.into(),
            width: 1.0,
            color: "black".to_string(),
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

/// Whole widths are written as integers, `1` rather than `1.0`.
fn serialize_width<S: Serializer>(width: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if width.fract() == 0.0 && width.abs() < 9_007_199_254_740_992.0 {
        serializer.serialize_i64(*width as i64)
    } else {
        serializer.serialize_f64(*width)
    }
}

#[derive(Serialize)]
struct GraphDocument<'a> {
    nodes: Vec<&'a Node>,
    edges: &'a [Edge],
}

#[cfg(test)]
#[derive(Deserialize)]
struct OwnedGraphDocument {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

#[derive(Debug, Default)]
pub struct Graph {
    nodes: IndexMap<String, Node>,
    by_name: HashMap<String, Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the node with the same id, indexing it by name
    /// when it has one.
    pub fn add_node(&mut self, node: Node) {
        if let Some(name) = &node.name {
            self.by_name.insert(name.clone(), node.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn get_node_by_name(&self, name: &str) -> Result<&Node> {
        self.by_name.get(name).ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Writes `{"nodes": [...], "edges": [...]}` to `path`, creating missing
    /// parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &self.document())?;
        writer.flush().map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    fn document(&self) -> GraphDocument<'_> {
        GraphDocument { nodes: self.nodes.values().collect(), edges: &self.edges }
    }
}

// Read access used to check saved output.
#[cfg(test)]
impl Graph {
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let document: OwnedGraphDocument = serde_json::from_reader(std::io::BufReader::new(file))?;
        let mut graph = Graph::new();
        for node in document.nodes {
            graph.add_node(node);
        }
        graph.edges = document.edges;
        Ok(graph)
    }
}
