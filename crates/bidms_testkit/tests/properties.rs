//! Property tests across the BiDMS structures.

use bidms_core::kmp;
use bidms_core::{Distance, Graph, PriorityQueue, VertexId};
use bidms_testkit::generators::{
    dag_strategy, graph_strategy, key_op_sequence_strategy, queue_op_sequence_strategy,
    text_list_strategy, GraphSpec, PropTestConfig, QueueOp,
};
use bidms_testkit::harness::OrderedHarness;
use proptest::prelude::*;

fn build(spec: &GraphSpec, directed: bool) -> (Graph<usize, u32>, Vec<VertexId>) {
    let mut graph = Graph::new(directed);
    let ids: Vec<VertexId> = (0..spec.vertices).map(|i| graph.insert_vertex(i)).collect();
    for &(u, v, w) in &spec.edges {
        graph.insert_edge(ids[u], ids[v], w).unwrap();
    }
    (graph, ids)
}

fn naive_find_all(pattern: &[u8], text: &[u8]) -> Vec<usize> {
    if pattern.is_empty() {
        return (0..=text.len()).collect();
    }
    text.windows(pattern.len())
        .enumerate()
        .filter(|(_, w)| *w == pattern)
        .map(|(i, _)| i)
        .collect()
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn ordered_structures_match_model(ops in key_op_sequence_strategy(40, 1, 200)) {
        let mut harness = OrderedHarness::new();
        harness.run(&ops);
    }

    #[test]
    fn wide_bplus_matches_model(ops in key_op_sequence_strategy(60, 1, 200), order in 4usize..9) {
        let mut harness = OrderedHarness::with_bplus_order(order);
        harness.run(&ops);
    }

    #[test]
    fn bplus_range_matches_model(
        ops in key_op_sequence_strategy(30, 1, 120),
        start in -35i64..35,
        width in 0i64..40,
    ) {
        let mut harness = OrderedHarness::new();
        harness.run(&ops);
        let end = start + width;
        let got: Vec<i64> = harness
            .bplus
            .search_range(&start, &end)
            .into_iter()
            .map(|(&k, _)| k)
            .collect();
        prop_assert_eq!(got, harness.model_range(start, end));
        let avl: Vec<i64> = harness.avl.range(start..end).map(|(&k, _)| k).collect();
        prop_assert_eq!(avl, harness.model_range(start, end));
    }

    #[test]
    fn queue_pops_in_key_order(ops in queue_op_sequence_strategy(1, 150)) {
        let mut pq: PriorityQueue<i32, u64> = PriorityQueue::new();
        // (locator, id, key) of every queued entry
        let mut live = Vec::new();
        let mut next_id = 0u64;

        for op in ops {
            match op {
                QueueOp::Add(key) => {
                    let loc = pq.add(key, next_id);
                    live.push((loc, next_id, key));
                    next_id += 1;
                }
                QueueOp::RemoveMin => {
                    let expected = live.iter().map(|&(_, _, k)| k).min();
                    match pq.remove_min() {
                        Some((key, id)) => {
                            prop_assert_eq!(Some(key), expected);
                            let pos = live.iter().position(|&(_, i, _)| i == id).unwrap();
                            let (loc, _, _) = live.swap_remove(pos);
                            prop_assert!(!pq.contains(loc));
                        }
                        None => prop_assert!(expected.is_none()),
                    }
                }
                QueueOp::Update { index, key } => {
                    if live.is_empty() {
                        continue;
                    }
                    let i = index % live.len();
                    let (loc, id, _) = live[i];
                    pq.update(loc, key, id).unwrap();
                    live[i].2 = key;
                }
                QueueOp::Remove { index } => {
                    if live.is_empty() {
                        continue;
                    }
                    let (loc, id, key) = live.swap_remove(index % live.len());
                    prop_assert_eq!(pq.remove(loc).unwrap(), (key, id));
                    prop_assert!(pq.remove(loc).is_err());
                }
            }
            prop_assert_eq!(pq.len(), live.len());
        }

        let mut drained = Vec::new();
        while let Some((key, _)) = pq.remove_min() {
            drained.push(key);
        }
        prop_assert!(drained.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(drained.len(), live.len());
    }

    #[test]
    fn kmp_matches_naive(pattern in "[ab]{0,4}", text in "[ab]{0,40}") {
        let expected = naive_find_all(pattern.as_bytes(), text.as_bytes());
        prop_assert_eq!(kmp::find_all(pattern.as_bytes(), text.as_bytes()), expected.clone());
        prop_assert_eq!(kmp::find_first(pattern.as_bytes(), text.as_bytes()), expected.first().copied());
    }

    #[test]
    fn list_filter_matches_contains((pattern, texts) in text_list_strategy()) {
        let expected: Vec<usize> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| t.contains(pattern.as_str()))
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(kmp::find_all_from_list(&pattern, &texts, '*').unwrap(), expected);
    }

    #[test]
    fn dijkstra_agrees_with_floyd_warshall(spec in graph_strategy(9, 30), directed in any::<bool>()) {
        let (graph, ids) = build(&spec, directed);
        let matrix = graph.floyd_warshall();
        for &s in &ids {
            let lengths = graph.shortest_path_lengths(s, None).unwrap();
            for &v in &ids {
                let all_pairs = matrix.get(s, v).unwrap();
                match lengths.get(&v) {
                    Some(&d) => prop_assert_eq!(all_pairs, Distance::Finite(d)),
                    None => prop_assert!(all_pairs.is_infinite()),
                }
            }
        }
    }

    #[test]
    fn threshold_only_drops_far_vertices(spec in graph_strategy(9, 30), limit in 0u32..80) {
        let (graph, ids) = build(&spec, true);
        let full = graph.shortest_path_lengths(ids[0], None).unwrap();
        let bounded = graph.shortest_path_lengths(ids[0], Some(limit)).unwrap();
        for &v in &ids {
            match full.get(&v) {
                Some(&d) if v == ids[0] || d < limit => prop_assert_eq!(bounded.get(&v), Some(&d)),
                _ => prop_assert!(bounded.get(&v).is_none()),
            }
        }
    }

    #[test]
    fn dag_sorts_completely(spec in dag_strategy(12, 40)) {
        let (graph, ids) = build(&spec, true);
        prop_assert!(!graph.has_cycle());
        let order = graph.topological_sort();
        prop_assert_eq!(order.len(), ids.len());
        let position = |v: VertexId| order.iter().position(|&x| x == v).unwrap();
        for (_, edge) in graph.edges() {
            let (u, v) = edge.endpoints();
            prop_assert!(position(u) < position(v));
        }
    }

    #[test]
    fn bfs_reaches_what_dijkstra_reaches(spec in graph_strategy(10, 30)) {
        let (graph, ids) = build(&spec, true);
        let bfs = graph.bfs(ids[0]).unwrap();
        let lengths = graph.shortest_path_lengths(ids[0], None).unwrap();
        // Every reached vertex except the source has one discovery edge.
        prop_assert_eq!(bfs.discovered.len() + 1, lengths.len());
    }
}
