//! Adjacency-map graph with traversal, shortest-path and ordering algorithms.
//!
//! Vertices and edges live in arenas addressed by [`VertexId`] and
//! [`EdgeId`]. Adjacency is a two-level [`ProbeHashMap`]: for every vertex
//! `u`, `outgoing[u][v]` holds the edge from `u` to `v`. A directed graph
//! keeps a mirrored `incoming` map; an undirected graph records each edge
//! under both endpoints in the single outgoing map.

mod order;
mod paths;
mod persistence;
mod traversal;

pub use paths::{Distance, DistanceMatrix, Weight};
pub use persistence::{EdgeDocument, GraphDocument, LoadedGraph};
pub use traversal::{BfsResult, LoopBfsResult};

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::map::ProbeHashMap;
use crate::types::{EdgeId, VertexId};
use tracing::warn;

type Adjacency = ProbeHashMap<VertexId, ProbeHashMap<VertexId, EdgeId>>;

/// Which adjacency of a vertex to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Edges leaving the vertex.
    #[default]
    Outgoing,
    /// Edges entering the vertex. Same as outgoing in an undirected graph.
    Incoming,
}

/// An edge and its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<E> {
    origin: VertexId,
    destination: VertexId,
    element: E,
}

impl<E> Edge<E> {
    /// Returns `(origin, destination)`.
    #[must_use]
    pub fn endpoints(&self) -> (VertexId, VertexId) {
        (self.origin, self.destination)
    }

    /// Returns the endpoint across from `v`.
    #[must_use]
    pub fn opposite(&self, v: VertexId) -> VertexId {
        if v == self.origin {
            self.destination
        } else {
            self.origin
        }
    }

    /// Returns the edge payload.
    #[must_use]
    pub fn element(&self) -> &E {
        &self.element
    }
}

/// A directed or undirected graph with vertex payloads `V` and edge
/// payloads `E`.
///
/// # Example
///
/// ```rust
/// use bidms_core::{Direction, Graph};
///
/// let mut g = Graph::new(true);
/// let a = g.insert_vertex("a");
/// let b = g.insert_vertex("b");
/// g.insert_edge(a, b, 3).unwrap();
///
/// assert_eq!(g.edge_count(), 1);
/// assert_eq!(g.degree(b, Direction::Incoming).unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct Graph<V, E> {
    vertices: Vec<Option<V>>,
    edges: Vec<Option<Edge<E>>>,
    outgoing: Adjacency,
    incoming: Option<Adjacency>,
    vertex_count: usize,
    edge_count: usize,
    config: Config,
}

impl<V, E> Graph<V, E> {
    /// Creates an empty graph.
    #[must_use]
    pub fn new(directed: bool) -> Self {
        Self::build(directed, &Config::default())
    }

    /// Creates an empty graph whose adjacency maps use `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `config` fails validation.
    pub fn with_config(directed: bool, config: &Config) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self::build(directed, config))
    }

    fn build(directed: bool, config: &Config) -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            outgoing: ProbeHashMap::with_config(config),
            incoming: directed.then(|| ProbeHashMap::with_config(config)),
            vertex_count: 0,
            edge_count: 0,
            config: config.clone(),
        }
    }

    /// Returns true if edges have a direction.
    #[must_use]
    pub fn is_directed(&self) -> bool {
        self.incoming.is_some()
    }

    /// Returns the configuration the graph was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of live vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of live edges. An undirected edge counts once.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Iterates over live vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_some())
            .map(|(i, _)| VertexId(i as u32))
    }

    /// Iterates over live edges, each exactly once, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge<E>)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId(i as u32), e)))
    }

    /// Returns true if `v` is a live vertex of this graph.
    #[must_use]
    pub fn contains_vertex(&self, v: VertexId) -> bool {
        matches!(self.vertices.get(v.index()), Some(Some(_)))
    }

    /// Returns the payload of `v`.
    #[must_use]
    pub fn vertex(&self, v: VertexId) -> Option<&V> {
        self.vertices.get(v.index())?.as_ref()
    }

    /// Returns the edge record behind `e`.
    #[must_use]
    pub fn edge(&self, e: EdgeId) -> Option<&Edge<E>> {
        self.edges.get(e.index())?.as_ref()
    }

    /// Adds a vertex carrying `payload`.
    pub fn insert_vertex(&mut self, payload: V) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Some(payload));
        self.outgoing
            .insert(id, ProbeHashMap::with_config(&self.config));
        if let Some(incoming) = self.incoming.as_mut() {
            incoming.insert(id, ProbeHashMap::with_config(&self.config));
        }
        self.vertex_count += 1;
        id
    }

    /// Adds an edge from `u` to `v`.
    ///
    /// An existing edge between the same endpoints is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VertexNotFound`] if either endpoint is missing.
    pub fn insert_edge(&mut self, u: VertexId, v: VertexId, payload: E) -> CoreResult<EdgeId> {
        self.require_vertex(u)?;
        self.require_vertex(v)?;

        if self.get_edge(u, v).is_some() {
            self.remove_edge(u, v)?;
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Some(Edge {
            origin: u,
            destination: v,
            element: payload,
        }));

        if let Some(row) = self.outgoing.get_mut(&u) {
            row.insert(v, id);
        }
        let mirror = self.incoming.as_mut().unwrap_or(&mut self.outgoing);
        if let Some(row) = mirror.get_mut(&v) {
            row.insert(u, id);
        }
        self.edge_count += 1;
        Ok(id)
    }

    /// Adds an edge only if it keeps the graph acyclic.
    ///
    /// The edge is inserted, the graph is checked for a cycle, and the edge
    /// is rolled back if one appeared. Returns whether the edge was kept.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VertexNotFound`] if either endpoint is missing.
    pub fn insert_edge_acyclic(&mut self, u: VertexId, v: VertexId, payload: E) -> CoreResult<bool> {
        self.insert_edge(u, v, payload)?;
        if self.has_cycle() {
            self.remove_edge(u, v)?;
            warn!(from = %u, to = %v, "rejected edge that would close a cycle");
            return Ok(false);
        }
        Ok(true)
    }

    /// Returns the edge from `u` to `v`, if any.
    #[must_use]
    pub fn get_edge(&self, u: VertexId, v: VertexId) -> Option<EdgeId> {
        self.outgoing.get(&u)?.get(&v).copied()
    }

    /// Replaces the payload of `v`, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VertexNotFound`] if `v` is missing.
    pub fn update_vertex(&mut self, v: VertexId, payload: V) -> CoreResult<V> {
        match self.vertices.get_mut(v.index()) {
            Some(Some(slot)) => Ok(std::mem::replace(slot, payload)),
            _ => Err(CoreError::vertex_not_found(v)),
        }
    }

    /// Replaces the payload of the edge from `u` to `v`, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EdgeNotFound`] if there is no such edge.
    pub fn update_edge(&mut self, u: VertexId, v: VertexId, payload: E) -> CoreResult<E> {
        let id = self
            .get_edge(u, v)
            .ok_or_else(|| CoreError::edge_not_found(u, v))?;
        match self.edges.get_mut(id.index()) {
            Some(Some(edge)) => Ok(std::mem::replace(&mut edge.element, payload)),
            _ => Err(CoreError::edge_not_found(u, v)),
        }
    }

    /// Removes the edge from `u` to `v` and returns its payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EdgeNotFound`] if there is no such edge.
    pub fn remove_edge(&mut self, u: VertexId, v: VertexId) -> CoreResult<E> {
        let id = self
            .outgoing
            .get_mut(&u)
            .and_then(|row| row.remove(&v))
            .ok_or_else(|| CoreError::edge_not_found(u, v))?;

        let mirror = self.incoming.as_mut().unwrap_or(&mut self.outgoing);
        if let Some(row) = mirror.get_mut(&v) {
            row.remove(&u);
        }
        self.edge_count -= 1;

        self.edges
            .get_mut(id.index())
            .and_then(Option::take)
            .map(|edge| edge.element)
            .ok_or_else(|| CoreError::invariant(format!("adjacency referenced dead edge {id}")))
    }

    /// Removes `v` together with every incident edge and returns its payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VertexNotFound`] if `v` is missing.
    pub fn remove_vertex(&mut self, v: VertexId) -> CoreResult<V> {
        self.require_vertex(v)?;

        let out: Vec<VertexId> = self.neighbors(v, Direction::Outgoing)?.collect();
        for w in out {
            self.remove_edge(v, w)?;
        }
        if self.is_directed() {
            let inc: Vec<VertexId> = self.neighbors(v, Direction::Incoming)?.collect();
            for w in inc {
                self.remove_edge(w, v)?;
            }
        }

        self.outgoing.remove(&v);
        if let Some(incoming) = self.incoming.as_mut() {
            incoming.remove(&v);
        }
        self.vertex_count -= 1;
        self.vertices
            .get_mut(v.index())
            .and_then(Option::take)
            .ok_or_else(|| CoreError::vertex_not_found(v))
    }

    /// Number of edges incident to `v` in the given direction.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VertexNotFound`] if `v` is missing.
    pub fn degree(&self, v: VertexId, direction: Direction) -> CoreResult<usize> {
        Ok(self.row(v, direction)?.len())
    }

    /// Iterates over the vertices adjacent to `v` in the given direction.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VertexNotFound`] if `v` is missing.
    pub fn neighbors(
        &self,
        v: VertexId,
        direction: Direction,
    ) -> CoreResult<impl Iterator<Item = VertexId> + '_> {
        Ok(self.row(v, direction)?.keys().copied())
    }

    /// Iterates over the edges incident to `v` in the given direction.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VertexNotFound`] if `v` is missing.
    pub fn incident_edges(
        &self,
        v: VertexId,
        direction: Direction,
    ) -> CoreResult<impl Iterator<Item = (EdgeId, &Edge<E>)> + '_> {
        let row = self.row(v, direction)?;
        Ok(row
            .values()
            .filter_map(move |&id| self.edge(id).map(|edge| (id, edge))))
    }

    fn row(&self, v: VertexId, direction: Direction) -> CoreResult<&ProbeHashMap<VertexId, EdgeId>> {
        let adjacency = match (direction, self.incoming.as_ref()) {
            (Direction::Incoming, Some(incoming)) => incoming,
            _ => &self.outgoing,
        };
        adjacency
            .get(&v)
            .ok_or_else(|| CoreError::vertex_not_found(v))
    }

    fn require_vertex(&self, v: VertexId) -> CoreResult<()> {
        if self.contains_vertex(v) {
            Ok(())
        } else {
            Err(CoreError::vertex_not_found(v))
        }
    }
}
