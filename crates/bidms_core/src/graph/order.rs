//! Topological ordering and cycle detection.

use super::{Direction, Graph};
use crate::map::ProbeHashMap;
use crate::types::VertexId;

impl<V, E> Graph<V, E> {
    /// Kahn's algorithm with a stack of ready vertices.
    ///
    /// No vertex in the result has an edge to an earlier one. If the graph
    /// has a directed cycle, the vertices on or behind it are missing from
    /// the result. Undirected graphs have no topological order and yield an
    /// empty result.
    #[must_use]
    pub fn topological_sort(&self) -> Vec<VertexId> {
        if !self.is_directed() {
            return Vec::new();
        }
        let mut order = Vec::with_capacity(self.vertex_count());
        let mut ready = Vec::new();
        let mut in_count: ProbeHashMap<VertexId, usize> = ProbeHashMap::with_config(self.config());

        for u in self.vertices() {
            let degree = self.degree(u, Direction::Incoming).unwrap_or(0);
            in_count.insert(u, degree);
            if degree == 0 {
                ready.push(u);
            }
        }

        while let Some(u) = ready.pop() {
            order.push(u);
            let Ok(edges) = self.incident_edges(u, Direction::Outgoing) else {
                continue;
            };
            for (_, edge) in edges {
                let v = edge.opposite(u);
                if let Some(count) = in_count.get_mut(&v) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.push(v);
                    }
                }
            }
        }

        order
    }

    /// Returns true if the graph contains a cycle.
    ///
    /// Directed graphs are checked for a directed cycle through
    /// [`Self::topological_sort`]. In an undirected graph a single edge is
    /// not a cycle; a self-loop or a second path between two vertices is.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        if self.is_directed() {
            self.topological_sort().len() != self.vertex_count()
        } else {
            // A forest has exactly `vertices - components` edges.
            self.edge_count() + self.component_count() > self.vertex_count()
        }
    }

    /// Number of connected components of an undirected graph.
    fn component_count(&self) -> usize {
        let mut seen: ProbeHashMap<VertexId, ()> = ProbeHashMap::with_config(self.config());
        let mut components = 0;
        let mut stack = Vec::new();

        for start in self.vertices() {
            if seen.contains_key(&start) {
                continue;
            }
            components += 1;
            seen.insert(start, ());
            stack.push(start);
            while let Some(u) = stack.pop() {
                let Ok(neighbors) = self.neighbors(u, Direction::Outgoing) else {
                    continue;
                };
                for v in neighbors {
                    if !seen.contains_key(&v) {
                        seen.insert(v, ());
                        stack.push(v);
                    }
                }
            }
        }

        components
    }
}
