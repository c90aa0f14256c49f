//! Property-based test generators using proptest.
//!
//! Provides strategies for key operation sequences, priority queue
//! workloads and random graphs.

use proptest::prelude::*;

/// One operation against an ordered key structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOp {
    /// Insert a key (value is derived from the key)
    Insert(i64),
    /// Remove a key
    Remove(i64),
    /// Look a key up
    Get(i64),
}

impl KeyOp {
    /// The key the operation touches.
    #[must_use]
    pub fn key(self) -> i64 {
        match self {
            Self::Insert(k) | Self::Remove(k) | Self::Get(k) => k,
        }
    }
}

/// Strategy for operations over keys in `-range..range`.
///
/// A narrow range makes removes and duplicate inserts hit existing keys.
pub fn key_op_strategy(range: i64) -> impl Strategy<Value = KeyOp> {
    let key = -range..range;
    prop_oneof![
        4 => key.clone().prop_map(KeyOp::Insert),
        2 => key.clone().prop_map(KeyOp::Remove),
        1 => key.prop_map(KeyOp::Get),
    ]
}

/// Strategy for a sequence of key operations.
pub fn key_op_sequence_strategy(
    range: i64,
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<KeyOp>> {
    prop::collection::vec(key_op_strategy(range), min_ops..max_ops)
}

/// One operation against a priority queue.
///
/// Indices pick among the locators still live, modulo their count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOp {
    /// Add an entry with this key
    Add(i32),
    /// Remove the minimum
    RemoveMin,
    /// Rekey a live entry
    Update {
        /// Which live entry
        index: usize,
        /// Its new key
        key: i32,
    },
    /// Remove a live entry
    Remove {
        /// Which live entry
        index: usize,
    },
}

/// Strategy for priority queue operations.
pub fn queue_op_strategy() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        4 => (-1000..1000i32).prop_map(QueueOp::Add),
        2 => Just(QueueOp::RemoveMin),
        2 => (any::<usize>(), -1000..1000i32).prop_map(|(index, key)| QueueOp::Update { index, key }),
        1 => any::<usize>().prop_map(|index| QueueOp::Remove { index }),
    ]
}

/// Strategy for a sequence of priority queue operations.
pub fn queue_op_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<QueueOp>> {
    prop::collection::vec(queue_op_strategy(), min_ops..max_ops)
}

/// A random weighted graph description over vertices `0..vertices`.
#[derive(Debug, Clone)]
pub struct GraphSpec {
    /// Number of vertices.
    pub vertices: usize,
    /// Edges as `(from, to, weight)` vertex indices.
    pub edges: Vec<(usize, usize, u32)>,
}

/// Strategy for graphs with up to `max_vertices` vertices and non-negative
/// weights. Self-loops and repeated pairs may occur.
pub fn graph_strategy(max_vertices: usize, max_edges: usize) -> impl Strategy<Value = GraphSpec> {
    (1..=max_vertices).prop_flat_map(move |n| {
        prop::collection::vec((0..n, 0..n, 0..50u32), 0..=max_edges)
            .prop_map(move |edges| GraphSpec { vertices: n, edges })
    })
}

/// Strategy for acyclic graphs: every edge goes from a lower to a higher
/// vertex index.
pub fn dag_strategy(max_vertices: usize, max_edges: usize) -> impl Strategy<Value = GraphSpec> {
    graph_strategy(max_vertices, max_edges).prop_map(|mut spec| {
        spec.edges.retain(|&(u, v, _)| u != v);
        for edge in &mut spec.edges {
            if edge.0 > edge.1 {
                std::mem::swap(&mut edge.0, &mut edge.1);
            }
        }
        spec
    })
}

/// Strategy for a list of short lowercase texts and a pattern drawn from
/// the same small alphabet, so matches are common.
pub fn text_list_strategy() -> impl Strategy<Value = (String, Vec<String>)> {
    (
        prop::string::string_regex("[abc]{0,3}").expect("Invalid regex"),
        prop::collection::vec(
            prop::string::string_regex("[abcx]{0,12}").expect("Invalid regex"),
            0..12,
        ),
    )
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn key_ops_stay_in_range(ops in key_op_sequence_strategy(8, 1, 40)) {
            for op in ops {
                prop_assert!((-8..8).contains(&op.key()));
            }
        }

        #[test]
        fn dag_edges_point_forward(spec in dag_strategy(10, 30)) {
            for (u, v, _) in spec.edges {
                prop_assert!(u < v);
                prop_assert!(v < spec.vertices);
            }
        }
    }

    #[test]
    fn config_presets() {
        assert!(PropTestConfig::quick().cases < PropTestConfig::default().cases);
        assert!(PropTestConfig::thorough().cases > PropTestConfig::default().cases);
    }
}
