//! Single-source and all-pairs shortest paths.

use super::{Direction, Graph};
use crate::error::CoreResult;
use crate::map::ProbeHashMap;
use crate::queue::{Locator, PriorityQueue};
use crate::types::VertexId;
use std::fmt;
use std::ops::Add;

/// Numeric edge payload usable by the weighted algorithms.
pub trait Weight: Copy + PartialOrd + Add<Output = Self> {
    /// The additive identity.
    fn zero() -> Self;
}

macro_rules! impl_weight {
    ($($t:ty => $zero:expr),* $(,)?) => {
        $(impl Weight for $t {
            fn zero() -> Self {
                $zero
            }
        })*
    };
}

impl_weight!(
    i8 => 0, i16 => 0, i32 => 0, i64 => 0, isize => 0,
    u8 => 0, u16 => 0, u32 => 0, u64 => 0, usize => 0,
    f32 => 0.0, f64 => 0.0,
);

/// A path length that may be unbounded.
///
/// Variant order makes every finite distance compare below `Infinite`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Distance<W> {
    /// Reachable with this total weight.
    Finite(W),
    /// Not reachable.
    Infinite,
}

impl<W> Distance<W> {
    /// Returns the finite length, if any.
    pub fn finite(self) -> Option<W> {
        match self {
            Self::Finite(w) => Some(w),
            Self::Infinite => None,
        }
    }

    /// Returns true for [`Distance::Infinite`].
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }
}

impl<W: Add<Output = W>> Add for Distance<W> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Finite(a), Self::Finite(b)) => Self::Finite(a + b),
            _ => Self::Infinite,
        }
    }
}

impl<W: fmt::Display> fmt::Display for Distance<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(w) => write!(f, "{w}"),
            Self::Infinite => f.write_str("inf"),
        }
    }
}

/// All-pairs distances produced by [`Graph::floyd_warshall`].
#[derive(Debug, Clone)]
pub struct DistanceMatrix<W> {
    order: Vec<VertexId>,
    index: ProbeHashMap<VertexId, usize>,
    dist: Vec<Distance<W>>,
}

impl<W: Copy> DistanceMatrix<W> {
    /// Distance from `u` to `v`, or `None` if either is not in the matrix.
    #[must_use]
    pub fn get(&self, u: VertexId, v: VertexId) -> Option<Distance<W>> {
        let i = *self.index.get(&u)?;
        let j = *self.index.get(&v)?;
        self.dist.get(i * self.order.len() + j).copied()
    }

    /// Vertices covered, in row order.
    #[must_use]
    pub fn vertices(&self) -> &[VertexId] {
        &self.order
    }

    /// One row of the matrix, aligned with [`Self::vertices`].
    #[must_use]
    pub fn row(&self, u: VertexId) -> Option<&[Distance<W>]> {
        let i = *self.index.get(&u)?;
        let n = self.order.len();
        self.dist.get(i * n..(i + 1) * n)
    }
}

impl<V, E: Weight> Graph<V, E> {
    /// Dijkstra shortest-path lengths from `source` along outgoing edges.
    ///
    /// Candidate distances that meet or exceed `threshold` are discarded, so
    /// vertices only reachable beyond it are left out. Returns the final
    /// distance of every reached vertex, the source included at zero.
    ///
    /// Edge weights are expected to be non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::VertexNotFound`] if `source` is missing.
    pub fn shortest_path_lengths(
        &self,
        source: VertexId,
        threshold: Option<E>,
    ) -> CoreResult<ProbeHashMap<VertexId, E>> {
        self.degree(source, Direction::Outgoing)?;

        let mut pq: PriorityQueue<Distance<E>, VertexId> = PriorityQueue::new();
        let mut label: ProbeHashMap<VertexId, Distance<E>> = ProbeHashMap::with_config(self.config());
        let mut locator: ProbeHashMap<VertexId, Locator> = ProbeHashMap::with_config(self.config());
        let mut cloud: ProbeHashMap<VertexId, E> = ProbeHashMap::with_config(self.config());

        for v in self.vertices() {
            let d = if v == source {
                Distance::Finite(E::zero())
            } else {
                Distance::Infinite
            };
            label.insert(v, d);
            locator.insert(v, pq.add(d, v));
        }

        while let Some((key, u)) = pq.remove_min() {
            let Distance::Finite(du) = key else {
                break;
            };
            cloud.insert(u, du);
            locator.remove(&u);

            for (_, edge) in self.incident_edges(u, Direction::Outgoing)? {
                let v = edge.opposite(u);
                if cloud.contains_key(&v) {
                    continue;
                }
                let candidate = du + *edge.element();
                if threshold.is_some_and(|limit| candidate >= limit) {
                    continue;
                }
                let improves = label
                    .get(&v)
                    .is_some_and(|current| Distance::Finite(candidate) < *current);
                if improves {
                    label.insert(v, Distance::Finite(candidate));
                    if let Some(&loc) = locator.get(&v) {
                        pq.update(loc, Distance::Finite(candidate), v)?;
                    }
                }
            }
        }

        Ok(cloud)
    }

    /// All-pairs shortest distances in O(V³).
    ///
    /// Self distance is zero, missing edges start at infinity. Edges in an
    /// undirected graph count in both directions.
    #[must_use]
    pub fn floyd_warshall(&self) -> DistanceMatrix<E> {
        let order: Vec<VertexId> = self.vertices().collect();
        let n = order.len();
        let mut index = ProbeHashMap::with_config(self.config());
        for (i, &v) in order.iter().enumerate() {
            index.insert(v, i);
        }

        let mut dist = vec![Distance::Infinite; n * n];
        for i in 0..n {
            dist[i * n + i] = Distance::Finite(E::zero());
        }
        for (_, edge) in self.edges() {
            let (u, v) = edge.endpoints();
            let (Some(&i), Some(&j)) = (index.get(&u), index.get(&v)) else {
                continue;
            };
            if i == j {
                continue;
            }
            dist[i * n + j] = Distance::Finite(*edge.element());
            if !self.is_directed() {
                dist[j * n + i] = Distance::Finite(*edge.element());
            }
        }

        for k in 0..n {
            for i in 0..n {
                let ik = dist[i * n + k];
                if ik.is_infinite() {
                    continue;
                }
                for j in 0..n {
                    let through = ik + dist[k * n + j];
                    if through < dist[i * n + j] {
                        dist[i * n + j] = through;
                    }
                }
            }
        }

        DistanceMatrix { order, index, dist }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted(directed: bool) -> (Graph<char, u32>, Vec<VertexId>) {
        let mut g = Graph::new(directed);
        let v: Vec<_> = "abcde".chars().map(|c| g.insert_vertex(c)).collect();
        g.insert_edge(v[0], v[1], 4).unwrap();
        g.insert_edge(v[0], v[2], 1).unwrap();
        g.insert_edge(v[2], v[1], 2).unwrap();
        g.insert_edge(v[1], v[3], 5).unwrap();
        // v[4] is isolated.
        (g, v)
    }

    #[test]
    fn dijkstra_finds_shorter_detour() {
        let (g, v) = weighted(true);
        let d = g.shortest_path_lengths(v[0], None).unwrap();

        assert_eq!(d.get(&v[0]), Some(&0));
        assert_eq!(d.get(&v[2]), Some(&1));
        assert_eq!(d.get(&v[1]), Some(&3));
        assert_eq!(d.get(&v[3]), Some(&8));
        assert_eq!(d.get(&v[4]), None);
        assert_eq!(d.len(), 4);
    }

    #[test]
    fn dijkstra_threshold_prunes() {
        let (g, v) = weighted(true);
        let d = g.shortest_path_lengths(v[0], Some(3)).unwrap();

        assert_eq!(d.get(&v[2]), Some(&1));
        // 3 meets the threshold, so b and everything past it is dropped.
        assert_eq!(d.get(&v[1]), None);
        assert_eq!(d.get(&v[3]), None);
    }

    #[test]
    fn dijkstra_undirected_goes_both_ways() {
        let (g, v) = weighted(false);
        let d = g.shortest_path_lengths(v[3], None).unwrap();
        assert_eq!(d.get(&v[0]), Some(&8));
    }

    #[test]
    fn floyd_warshall_matches_dijkstra() {
        let (g, v) = weighted(true);
        let m = g.floyd_warshall();

        for &u in &v {
            assert_eq!(m.get(u, u), Some(Distance::Finite(0)));
            let single = g.shortest_path_lengths(u, None).unwrap();
            for &w in &v {
                let expected = single
                    .get(&w)
                    .map_or(Distance::Infinite, |&d| Distance::Finite(d));
                assert_eq!(m.get(u, w), Some(expected), "{u} -> {w}");
            }
        }
        assert_eq!(m.get(v[4], v[0]), Some(Distance::Infinite));
        assert_eq!(m.vertices().len(), 5);
        assert_eq!(m.row(v[0]).map(<[_]>::len), Some(5));
    }

    #[test]
    fn floyd_warshall_ignores_self_loop_weight() {
        let mut g: Graph<u8, i32> = Graph::new(true);
        let a = g.insert_vertex(0);
        g.insert_edge(a, a, 9).unwrap();
        assert_eq!(g.floyd_warshall().get(a, a), Some(Distance::Finite(0)));
    }

    #[test]
    fn distance_ordering_and_sum() {
        assert!(Distance::Finite(i64::MAX) < Distance::Infinite);
        assert_eq!(Distance::Finite(2) + Distance::Finite(3), Distance::Finite(5));
        assert_eq!(Distance::Finite(2) + Distance::Infinite, Distance::Infinite);
        assert_eq!(Distance::<f64>::Infinite.to_string(), "inf");
        assert_eq!(Distance::Finite(1.5).finite(), Some(1.5));
    }

    #[test]
    fn float_weights() {
        let mut g: Graph<u8, f64> = Graph::new(false);
        let a = g.insert_vertex(0);
        let b = g.insert_vertex(1);
        let c = g.insert_vertex(2);
        g.insert_edge(a, b, 0.5).unwrap();
        g.insert_edge(b, c, 0.25).unwrap();
        g.insert_edge(a, c, 1.0).unwrap();

        let d = g.shortest_path_lengths(a, None).unwrap();
        assert_eq!(d.get(&c), Some(&0.75));
    }
}
