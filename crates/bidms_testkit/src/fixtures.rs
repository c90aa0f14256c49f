//! Test fixtures and scenario helpers.
//!
//! Provides disk B-trees in temporary files and the canned data sets the
//! integration tests share.

use bidms_core::{DiskBTree, Graph, InMemoryBackend, VertexId};
use bidms_storage::FileBackend;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A disk B-tree in a temporary file with automatic cleanup.
pub struct TempDiskTree {
    /// The tree instance.
    pub tree: DiskBTree<FileBackend>,
    path: PathBuf,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TempDiskTree {
    /// Creates an empty tree in a fresh temporary file.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("btree.db");
        let backend = FileBackend::open(&path).expect("Failed to create B-tree file");
        let tree = DiskBTree::new(backend).expect("Failed to create B-tree");
        Self {
            tree,
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Creates a tree holding `keys`, inserted in order.
    pub fn with_keys(keys: &[i64]) -> Self {
        let mut fixture = Self::new();
        for &k in keys {
            fixture.tree.insert(k).expect("Failed to insert key");
        }
        fixture
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drops the open tree and reopens the file from the current root,
    /// the way a caller that persisted the root offset would.
    ///
    /// Does nothing for an empty tree, which has no root to reopen from.
    pub fn reopen(&mut self) {
        let Some(root) = self.tree.root_offset() else {
            return;
        };
        let backend = FileBackend::open(&self.path).expect("Failed to reopen B-tree file");
        self.tree = DiskBTree::open(backend, root).expect("Failed to reopen B-tree");
    }
}

impl Default for TempDiskTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TempDiskTree {
    type Target = DiskBTree<FileBackend>;

    fn deref(&self) -> &Self::Target {
        &self.tree
    }
}

impl std::ops::DerefMut for TempDiskTree {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tree
    }
}

/// Creates an empty disk B-tree in memory.
pub fn memory_tree() -> DiskBTree<InMemoryBackend> {
    DiskBTree::new(InMemoryBackend::new()).expect("Failed to create in-memory B-tree")
}

/// Canned data sets.
pub mod scenarios {
    use super::*;

    /// Keys of the reference disk B-tree scenario.
    pub const DISK_KEYS: [i64; 13] = [2, 3, 4, 5, 6, 12, 7, 8, 9, 10, 11, 15, 13];

    /// Keys added after the scenario tree is reopened.
    pub const DISK_MORE_KEYS: [i64; 11] = [1, 20, 30, 40, 50, 60, 70, 80, 90, 100, 21];

    /// Texts of the reference pattern filter scenario.
    pub const TEXTS: [&str; 6] = ["abc421", "a12abc", "39akbc", "3ma3b1abc", "a31bc", "1ac1abc"];

    /// The disk scenario tree in a temporary file.
    pub fn disk_scenario() -> TempDiskTree {
        TempDiskTree::with_keys(&DISK_KEYS)
    }

    /// A small task dependency DAG: payloads are task ids, weights are
    /// durations.
    ///
    /// ```text
    /// 1 -> 2 (3)   1 -> 3 (1)   3 -> 2 (1)   2 -> 4 (2)   3 -> 5 (7)   4 -> 5 (1)
    /// ```
    pub fn task_graph() -> (Graph<i64, u32>, Vec<VertexId>) {
        let mut graph = Graph::new(true);
        let ids: Vec<VertexId> = (1..=5).map(|p| graph.insert_vertex(p)).collect();
        for (u, v, w) in [(0, 1, 3), (0, 2, 1), (2, 1, 1), (1, 3, 2), (2, 4, 7), (3, 4, 1)] {
            graph
                .insert_edge(ids[u], ids[v], w)
                .expect("Failed to insert edge");
        }
        (graph, ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_tree_reopens() {
        let mut fixture = TempDiskTree::with_keys(&[5, 1, 9]);
        assert!(fixture.path().exists());
        fixture.reopen();
        assert_eq!(fixture.keys().unwrap(), vec![1, 5, 9]);
    }

    #[test]
    fn empty_reopen_is_noop() {
        let mut fixture = TempDiskTree::new();
        fixture.reopen();
        assert!(fixture.is_empty());
    }

    #[test]
    fn task_graph_shape() {
        let (graph, ids) = scenarios::task_graph();
        assert_eq!(graph.vertex_count(), 5);
        assert_eq!(graph.edge_count(), 6);
        assert_eq!(ids.len(), 5);
    }
}
