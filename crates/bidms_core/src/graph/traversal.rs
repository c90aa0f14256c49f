//! Breadth-first traversals.

use super::{Direction, Graph, Weight};
use crate::error::CoreResult;
use crate::map::ProbeHashMap;
use crate::types::{EdgeId, VertexId};
use tracing::debug;

/// Outcome of [`Graph::bfs`].
#[derive(Debug, Clone)]
pub struct BfsResult<W> {
    /// Sum of the payloads of every discovery edge.
    pub total: W,
    /// Each reached vertex with the edge that first reached it, in
    /// discovery order. The source is not included.
    pub discovered: Vec<(VertexId, EdgeId)>,
}

impl<W> BfsResult<W> {
    /// Iterates over the reached vertices.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.discovered.iter().map(|&(v, _)| v)
    }

    /// Iterates over the discovery edges.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.discovered.iter().map(|&(_, e)| e)
    }
}

/// Outcome of [`Graph::bfs_allow_loop`].
#[derive(Debug, Clone)]
pub struct LoopBfsResult<W> {
    /// Sum of the payloads of every traversed edge, repeats included.
    pub total: W,
    /// Every `(vertex, edge)` step taken, in traversal order.
    pub steps: Vec<(VertexId, EdgeId)>,
    /// Number of levels expanded.
    pub rounds: usize,
    /// True if the round limit stopped a traversal whose frontier still had
    /// outgoing edges.
    pub truncated: bool,
}

impl<V, E: Weight> Graph<V, E> {
    /// Level-order traversal from `source` along outgoing edges.
    ///
    /// Each vertex is discovered once, by the first edge that reaches it;
    /// the source counts as already discovered.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::VertexNotFound`] if `source` is missing.
    pub fn bfs(&self, source: VertexId) -> CoreResult<BfsResult<E>> {
        self.degree(source, Direction::Outgoing)?;

        let mut seen: ProbeHashMap<VertexId, ()> = ProbeHashMap::with_config(self.config());
        seen.insert(source, ());
        let mut discovered = Vec::new();
        let mut total = E::zero();
        let mut level = vec![source];

        while !level.is_empty() {
            let mut next = Vec::new();
            for u in level {
                for (id, edge) in self.incident_edges(u, Direction::Outgoing)? {
                    let v = edge.opposite(u);
                    if seen.contains_key(&v) {
                        continue;
                    }
                    seen.insert(v, ());
                    total = total + *edge.element();
                    discovered.push((v, id));
                    next.push(v);
                }
            }
            level = next;
        }

        Ok(BfsResult { total, discovered })
    }

    /// Level-order traversal that keeps no visited set.
    ///
    /// Every edge leaving every frontier vertex is followed on every level,
    /// so vertices on a cycle are revisited. Expansion stops after
    /// `max_rounds` levels; the frontier may grow geometrically, so keep the
    /// bound small on dense graphs.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::VertexNotFound`] if `source` is missing.
    pub fn bfs_allow_loop(&self, source: VertexId, max_rounds: usize) -> CoreResult<LoopBfsResult<E>> {
        self.degree(source, Direction::Outgoing)?;

        let mut steps = Vec::new();
        let mut total = E::zero();
        let mut level = vec![source];
        let mut rounds = 0;

        while !level.is_empty() && rounds < max_rounds {
            let mut next = Vec::new();
            for u in level {
                for (id, edge) in self.incident_edges(u, Direction::Outgoing)? {
                    let v = edge.opposite(u);
                    total = total + *edge.element();
                    steps.push((v, id));
                    next.push(v);
                }
            }
            level = next;
            rounds += 1;
        }

        // A frontier of sinks would add nothing in another round.
        let truncated = level
            .iter()
            .any(|&u| matches!(self.degree(u, Direction::Outgoing), Ok(d) if d > 0));
        if truncated {
            debug!(%source, rounds, frontier = level.len(), "loop bfs hit round limit");
        }
        Ok(LoopBfsResult {
            total,
            steps,
            rounds,
            truncated,
        })
    }

    /// [`Self::bfs_allow_loop`] with the round limit from the graph's config.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::VertexNotFound`] if `source` is missing.
    pub fn bfs_allow_loop_default(&self, source: VertexId) -> CoreResult<LoopBfsResult<E>> {
        self.bfs_allow_loop(source, self.config().loop_bfs_max_rounds)
    }
}
