//! # BiDMS Core
//!
//! Hand-built index and graph structures for BiDMS.
//!
//! This crate provides:
//! - [`PriorityQueue`] - adaptable binary min-heap with stable [`Locator`]s
//! - [`ProbeHashMap`] - open-addressing hash map with linear probing
//! - [`Graph`] - directed/undirected graph with BFS, Dijkstra,
//!   Floyd-Warshall, topological sort and JSON persistence
//! - [`AvlTreeMap`] - height-balanced ordered map with range queries
//! - [`BPlusTree`] - in-memory B+ tree with a linked leaf chain
//! - [`DiskBTree`] - B-tree over fixed-size records in a
//!   [`bidms_storage::StorageBackend`]
//! - [`kmp`] - Knuth-Morris-Pratt search and one-pass list filtering
//!
//! Structures are single-threaded; mutation takes `&mut self`. Each one has
//! a `new()` constructor using [`Config::default`] and a `with_config`
//! variant.
//!
//! ## Example
//!
//! ```rust
//! use bidms_core::{Direction, Graph};
//!
//! let mut g = Graph::new(true);
//! let a = g.insert_vertex("a");
//! let b = g.insert_vertex("b");
//! g.insert_edge(a, b, 2u32).unwrap();
//!
//! let dist = g.shortest_path_lengths(a, None).unwrap();
//! assert_eq!(dist.get(&b), Some(&2));
//! assert_eq!(g.degree(b, Direction::Incoming).unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod config;
mod disk;
mod error;
mod graph;
mod map;
mod queue;
mod tree;
mod types;

pub mod kmp;

pub use config::Config;
pub use disk::{DiskBTree, DiskNode, MAX_CHILDREN, MAX_KEYS, MIN_DEGREE, NODE_SIZE};
pub use error::{CoreError, CoreResult};
pub use graph::{
    BfsResult, Direction, Distance, DistanceMatrix, Edge, EdgeDocument, Graph, GraphDocument,
    LoadedGraph, LoopBfsResult, Weight,
};
pub use map::{Iter as MapIter, IntoIter as MapIntoIter, ProbeHashMap};
pub use queue::{Locator, PriorityQueue};
pub use tree::{AvlTreeMap, BPlusIter, BPlusTree, Range};
pub use types::{EdgeId, NodeId, VertexId};

// Storage types the disk tree is generic over.
pub use bidms_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError};
