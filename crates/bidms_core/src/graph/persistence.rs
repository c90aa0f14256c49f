//! JSON save/load for graphs.
//!
//! The document lists vertices by payload and edges by the payloads of their
//! endpoints:
//!
//! ```json
//! {
//!   "directed": true,
//!   "vertices": [1, 2],
//!   "edges": [{ "u": 1, "v": 2, "weight": -3 }]
//! }
//! ```
//!
//! Vertex payloads therefore have to be unique within a saved graph.

use super::Graph;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::map::ProbeHashMap;
use crate::types::VertexId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;
use std::path::Path;
use tracing::debug;

/// On-disk form of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument<V, E> {
    /// Whether edges are directed.
    pub directed: bool,
    /// Vertex payloads.
    pub vertices: Vec<V>,
    /// Edges keyed by endpoint payloads.
    pub edges: Vec<EdgeDocument<V, E>>,
}

/// One edge of a [`GraphDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDocument<V, E> {
    /// Origin payload.
    pub u: V,
    /// Destination payload.
    pub v: V,
    /// Edge payload.
    pub weight: E,
}

/// A graph rebuilt from JSON plus the lookup tables the caller needs.
#[derive(Debug)]
pub struct LoadedGraph<V, E> {
    /// The rebuilt graph.
    pub graph: Graph<V, E>,
    /// Vertex handle for each payload.
    pub locator: ProbeHashMap<V, VertexId>,
    /// Largest vertex payload, `None` for a graph without vertices.
    pub max_payload: Option<V>,
}

impl<V: Clone, E: Clone> Graph<V, E> {
    /// Captures the graph as a serializable document.
    ///
    /// Each edge appears once, including undirected ones.
    #[must_use]
    pub fn to_document(&self) -> GraphDocument<V, E> {
        let vertices = self
            .vertices()
            .filter_map(|v| self.vertex(v).cloned())
            .collect();
        let edges = self
            .edges()
            .filter_map(|(_, edge)| {
                let (u, v) = edge.endpoints();
                Some(EdgeDocument {
                    u: self.vertex(u)?.clone(),
                    v: self.vertex(v)?.clone(),
                    weight: edge.element().clone(),
                })
            })
            .collect();

        GraphDocument {
            directed: self.is_directed(),
            vertices,
            edges,
        }
    }
}

impl<V, E> Graph<V, E>
where
    V: Clone + Eq + Hash + Ord + Debug,
{
    /// Rebuilds a graph from a document.
    ///
    /// Vertices are created first, then edges are resolved through the
    /// payload locator.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] for a duplicate vertex payload or
    /// an edge naming an unknown payload, and [`CoreError::InvalidConfig`]
    /// for a bad `config`.
    pub fn from_document(document: GraphDocument<V, E>, config: &Config) -> CoreResult<LoadedGraph<V, E>> {
        let mut graph = Graph::with_config(document.directed, config)?;
        let mut locator = ProbeHashMap::with_config(config);
        let max_payload = document.vertices.iter().max().cloned();

        for payload in document.vertices {
            if locator.contains_key(&payload) {
                return Err(CoreError::invalid_format(format!(
                    "duplicate vertex payload {payload:?}"
                )));
            }
            let id = graph.insert_vertex(payload.clone());
            locator.insert(payload, id);
        }

        for edge in document.edges {
            let resolve = |payload: &V| {
                locator.get(payload).copied().ok_or_else(|| {
                    CoreError::invalid_format(format!("edge endpoint {payload:?} is not a vertex"))
                })
            };
            let u = resolve(&edge.u)?;
            let v = resolve(&edge.v)?;
            graph.insert_edge(u, v, edge.weight)?;
        }

        debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            directed = graph.is_directed(),
            "graph loaded"
        );
        Ok(LoadedGraph {
            graph,
            locator,
            max_payload,
        })
    }
}

impl<V, E> Graph<V, E>
where
    V: Clone + Serialize,
    E: Clone + Serialize,
{
    /// Serializes the graph as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Json`] if a payload fails to serialize.
    pub fn to_json_string(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Writes the graph to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_json(&self, path: &Path) -> CoreResult<()> {
        let data = self.to_json_string()?;
        std::fs::write(path, data)?;
        debug!(path = %path.display(), edges = self.edge_count(), "graph saved");
        Ok(())
    }
}

impl<V, E> Graph<V, E>
where
    V: Clone + Eq + Hash + Ord + Debug + DeserializeOwned,
    E: DeserializeOwned,
{
    /// Parses a graph from JSON text.
    ///
    /// Blank input means nothing was persisted and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Json`] for malformed JSON and
    /// [`CoreError::InvalidFormat`] for dangling edges.
    pub fn from_json_str(data: &str, config: &Config) -> CoreResult<Option<LoadedGraph<V, E>>> {
        if data.trim().is_empty() {
            return Ok(None);
        }
        let document: GraphDocument<V, E> = serde_json::from_str(data)?;
        Self::from_document(document, config).map(Some)
    }

    /// Loads a graph from `path` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_json(path: &Path) -> CoreResult<Option<LoadedGraph<V, E>>> {
        Self::load_json_with_config(path, &Config::default())
    }

    /// Loads a graph from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_json_with_config(path: &Path, config: &Config) -> CoreResult<Option<LoadedGraph<V, E>>> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Direction;
    use tempfile::tempdir;

    fn sample(directed: bool) -> Graph<i64, i64> {
        let mut g = Graph::new(directed);
        let a = g.insert_vertex(10);
        let b = g.insert_vertex(3);
        let c = g.insert_vertex(7);
        g.insert_edge(a, b, -5).unwrap();
        g.insert_edge(b, c, -2).unwrap();
        g
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let original = sample(true);
        original.save_json(&path).unwrap();

        let loaded: LoadedGraph<i64, i64> = Graph::load_json(&path).unwrap().unwrap();
        assert!(loaded.graph.is_directed());
        assert_eq!(loaded.graph.vertex_count(), 3);
        assert_eq!(loaded.graph.edge_count(), 2);
        assert_eq!(loaded.max_payload, Some(10));

        let a = *loaded.locator.get(&10).unwrap();
        let b = *loaded.locator.get(&3).unwrap();
        let e = loaded.graph.get_edge(a, b).unwrap();
        assert_eq!(*loaded.graph.edge(e).unwrap().element(), -5);
        assert!(loaded.graph.get_edge(b, a).is_none());
    }

    #[test]
    fn undirected_edges_written_once() {
        let g = sample(false);
        let doc = g.to_document();
        assert!(!doc.directed);
        assert_eq!(doc.edges.len(), 2);

        let loaded = Graph::from_document(doc, &Config::default()).unwrap();
        let b = *loaded.locator.get(&3).unwrap();
        assert_eq!(loaded.graph.degree(b, Direction::Outgoing).unwrap(), 2);
    }

    #[test]
    fn pretty_printed_with_two_space_indent() {
        let json = sample(true).to_json_string().unwrap();
        assert!(json.starts_with("{\n  \"directed\": true"));
        assert!(json.contains("\"weight\": -5"));
    }

    #[test]
    fn blank_file_means_nothing_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, "  \n").unwrap();

        let loaded: Option<LoadedGraph<i64, i64>> = Graph::load_json(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn empty_graph_has_no_max() {
        let json = r#"{"directed": false, "vertices": [], "edges": []}"#;
        let loaded: LoadedGraph<i64, f64> = Graph::from_json_str(json, &Config::default())
            .unwrap()
            .unwrap();
        assert_eq!(loaded.max_payload, None);
        assert_eq!(loaded.graph.vertex_count(), 0);
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let json = r#"{"directed": true, "vertices": [1], "edges": [{"u": 1, "v": 2, "weight": 0}]}"#;
        let err = Graph::<i64, i64>::from_json_str(json, &Config::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
    }

    #[test]
    fn duplicate_payload_is_rejected() {
        let json = r#"{"directed": true, "vertices": [1, 1], "edges": []}"#;
        let err = Graph::<i64, i64>::from_json_str(json, &Config::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = Graph::<i64, i64>::from_json_str("{not json", &Config::default()).unwrap_err();
        assert!(matches!(err, CoreError::Json(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = Graph::<i64, i64>::load_json(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
