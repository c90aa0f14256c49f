//! End-to-end scenarios over file-backed storage.

use bidms_core::kmp::find_all_from_list;
use bidms_core::{Config, DiskBTree, Graph, NODE_SIZE};
use bidms_storage::{FileBackend, StorageBackend};
use bidms_testkit::fixtures::scenarios::{self, DISK_KEYS, DISK_MORE_KEYS, TEXTS};
use bidms_testkit::fixtures::TempDiskTree;
use tempfile::TempDir;

#[test]
fn disk_scenario_search_and_remove() {
    let mut fixture = scenarios::disk_scenario();

    let node = fixture.search(4).unwrap().expect("4 is stored");
    assert!(node.keys().contains(&4));

    assert!(fixture.remove(4).unwrap());
    assert!(fixture.search(4).unwrap().is_none());
    let node = fixture.search(7).unwrap().expect("7 is stored");
    assert!(node.keys().contains(&7));
    fixture.validate().unwrap();

    let mut expected: Vec<i64> = DISK_KEYS.iter().copied().filter(|&k| k != 4).collect();
    expected.sort_unstable();
    assert_eq!(fixture.keys().unwrap(), expected);
}

#[test]
fn disk_tree_survives_reopen() {
    let mut fixture = scenarios::disk_scenario();
    let root = fixture.root_offset();
    fixture.reopen();
    assert_eq!(fixture.root_offset(), root);

    for k in DISK_MORE_KEYS {
        assert!(fixture.insert(k).unwrap());
    }
    fixture.reopen();
    fixture.validate().unwrap();

    let mut expected: Vec<i64> = DISK_KEYS.iter().chain(DISK_MORE_KEYS.iter()).copied().collect();
    expected.sort_unstable();
    assert_eq!(fixture.keys().unwrap(), expected);
}

#[test]
fn disk_file_holds_whole_records() {
    let fixture = TempDiskTree::with_keys(&(0..200).collect::<Vec<_>>());
    let size = fixture.backend().size().unwrap();
    assert_eq!(size % NODE_SIZE as u64, 0);
    assert_eq!(fixture.dump().unwrap().len() as u64, size / NODE_SIZE as u64);
}

#[test]
fn disk_tree_with_sync_on_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("synced.db");
    let config = Config::default().sync_on_write(true);

    let root = {
        let backend = FileBackend::open(&path).unwrap();
        let mut tree = DiskBTree::with_config(backend, &config).unwrap();
        for k in (0..60).rev() {
            tree.insert(k).unwrap();
        }
        for k in (0..60).step_by(3) {
            assert!(tree.remove(k).unwrap());
        }
        tree.root_offset().unwrap()
    };

    let backend = FileBackend::open(&path).unwrap();
    let tree = DiskBTree::open_with_config(backend, root, &config).unwrap();
    tree.validate().unwrap();
    let expected: Vec<i64> = (0..60).filter(|k| k % 3 != 0).collect();
    assert_eq!(tree.keys().unwrap(), expected);
}

#[test]
fn list_filter_scenario() {
    assert_eq!(find_all_from_list("abc", &TEXTS[..3], '*').unwrap(), vec![0, 1]);
    assert_eq!(find_all_from_list("abc", &TEXTS, '*').unwrap(), vec![0, 1, 3, 5]);
    assert!(find_all_from_list("zz", &TEXTS, '*').unwrap().is_empty());
}

#[test]
fn graph_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    let (graph, ids) = scenarios::task_graph();
    graph.save_json(&path).unwrap();

    let loaded = Graph::<i64, u32>::load_json(&path).unwrap().expect("file has a graph");
    assert!(loaded.graph.is_directed());
    assert_eq!(loaded.graph.vertex_count(), 5);
    assert_eq!(loaded.graph.edge_count(), 6);
    assert_eq!(loaded.max_payload, Some(5));

    let source = *loaded.locator.get(&1).unwrap();
    let sink = *loaded.locator.get(&5).unwrap();
    let before = graph.shortest_path_lengths(ids[0], None).unwrap();
    let after = loaded.graph.shortest_path_lengths(source, None).unwrap();
    assert_eq!(before.get(&ids[4]), after.get(&sink));
    assert_eq!(after.get(&sink), Some(&5));
}

#[test]
fn graph_load_empty_file_is_none() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.json");
    std::fs::write(&path, "").unwrap();
    assert!(Graph::<i64, u32>::load_json(&path).unwrap().is_none());
    assert!(Graph::<i64, u32>::load_json(&dir.path().join("absent.json")).is_err());
}

#[test]
fn task_graph_orders_and_measures() {
    let (graph, ids) = scenarios::task_graph();
    let order = graph.topological_sort();
    assert_eq!(order.len(), 5);
    assert_eq!(order.first(), Some(&ids[0]));
    assert_eq!(order.last(), Some(&ids[4]));

    let matrix = graph.floyd_warshall();
    assert_eq!(matrix.get(ids[0], ids[4]).and_then(|d| d.finite()), Some(5));
    assert!(matrix.get(ids[4], ids[0]).unwrap().is_infinite());

    let bfs = graph.bfs(ids[0]).unwrap();
    assert_eq!(bfs.discovered.len(), 4);
}
