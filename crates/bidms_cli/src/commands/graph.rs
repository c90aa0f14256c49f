//! Graph file commands.
//!
//! Graph files hold integer vertex payloads and numeric edge weights.

use bidms_core::{Graph, LoadedGraph};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Graph inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// File path.
    pub path: String,
    /// Whether edges are directed.
    pub directed: bool,
    /// Number of vertices.
    pub vertex_count: usize,
    /// Number of edges.
    pub edge_count: usize,
    /// Largest vertex payload.
    pub max_payload: Option<i64>,
    /// Whether a cycle exists, directed or undirected to match the graph.
    pub has_cycle: bool,
    /// Payloads in topological order, absent for a cyclic graph.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topological_order: Option<Vec<i64>>,
}

fn load(file: &Path) -> Result<LoadedGraph<i64, f64>, Box<dyn std::error::Error>> {
    info!("Loading graph from {:?}", file);
    Graph::load_json(file)?.ok_or_else(|| format!("Graph file {:?} is empty", file).into())
}

/// Loads a graph file and summarizes its shape.
pub fn summarize(file: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let loaded = load(file)?;
    let graph = &loaded.graph;

    let has_cycle = graph.has_cycle();
    let topological_order = (graph.is_directed() && !has_cycle).then(|| {
        graph
            .topological_sort()
            .iter()
            .filter_map(|&v| graph.vertex(v).copied())
            .collect()
    });
    Ok(InspectResult {
        path: file.display().to_string(),
        directed: graph.is_directed(),
        vertex_count: graph.vertex_count(),
        edge_count: graph.edge_count(),
        max_payload: loaded.max_payload,
        has_cycle,
        topological_order,
    })
}

/// Loads a graph file and reports its shape.
pub fn inspect(file: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = summarize(file)?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => print_text_output(&result),
    }
    Ok(())
}

/// Prints Dijkstra distances from the vertex with payload `from`.
pub fn shortest(
    file: &Path,
    from: i64,
    threshold: Option<f64>,
) -> Result<Vec<(i64, f64)>, Box<dyn std::error::Error>> {
    let loaded = load(file)?;
    let source = *loaded
        .locator
        .get(&from)
        .ok_or_else(|| format!("No vertex with payload {from}"))?;

    let distances = loaded.graph.shortest_path_lengths(source, threshold)?;
    let mut rows: Vec<(i64, f64)> = distances
        .iter()
        .filter_map(|(&v, &d)| loaded.graph.vertex(v).map(|&payload| (payload, d)))
        .collect();
    rows.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    println!("Shortest paths from {from}:");
    for (payload, distance) in &rows {
        println!("  {payload:>8}  {distance}");
    }
    Ok(rows)
}

fn print_text_output(result: &InspectResult) {
    println!("Graph Inspection");
    println!("================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("  Directed:  {}", result.directed);
    println!("  Vertices:  {}", result.vertex_count);
    println!("  Edges:     {}", result.edge_count);
    match result.max_payload {
        Some(max) => println!("  Max id:    {max}"),
        None => println!("  Max id:    -"),
    }
    println!("  Cycle:     {}", if result.has_cycle { "yes" } else { "no" });

    if let Some(order) = &result.topological_order {
        let line: Vec<String> = order.iter().map(i64::to_string).collect();
        println!();
        println!("Topological order:");
        println!("  {}", line.join(" -> "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_graph(dir: &TempDir, name: &str, directed: bool, edges: &[(i64, i64, f64)]) -> std::path::PathBuf {
        let mut graph: Graph<i64, f64> = Graph::new(directed);
        let ids: Vec<_> = (1..=4).map(|payload| graph.insert_vertex(payload)).collect();
        for &(u, v, w) in edges {
            graph.insert_edge(ids[u as usize - 1], ids[v as usize - 1], w).unwrap();
        }
        let path = dir.path().join(name);
        graph.save_json(&path).unwrap();
        path
    }

    #[test]
    fn summarizes_directed_acyclic_graph() {
        let dir = TempDir::new().unwrap();
        let path = write_graph(&dir, "dag.json", true, &[(1, 2, 1.0), (2, 3, 1.0), (1, 4, 5.0)]);

        let result = summarize(&path).unwrap();
        assert!(result.directed);
        assert_eq!(result.vertex_count, 4);
        assert_eq!(result.edge_count, 3);
        assert_eq!(result.max_payload, Some(4));
        assert!(!result.has_cycle);
        let order = result.topological_order.unwrap();
        assert_eq!(order.len(), 4);
        let pos = |p: i64| order.iter().position(|&x| x == p).unwrap();
        assert!(pos(1) < pos(2) && pos(2) < pos(3) && pos(1) < pos(4));

        inspect(&path, "text").unwrap();
        inspect(&path, "json").unwrap();
    }

    #[test]
    fn directed_cycle_has_no_order() {
        let dir = TempDir::new().unwrap();
        let path = write_graph(&dir, "cycle.json", true, &[(1, 2, 1.0), (2, 3, 1.0), (3, 1, 1.0)]);
        let result = summarize(&path).unwrap();
        assert!(result.has_cycle);
        assert!(result.topological_order.is_none());
    }

    #[test]
    fn undirected_path_is_not_a_cycle() {
        let dir = TempDir::new().unwrap();
        let path = write_graph(&dir, "path.json", false, &[(1, 2, 1.0), (2, 3, 1.0)]);
        let result = summarize(&path).unwrap();
        assert!(!result.directed);
        assert!(!result.has_cycle);
        assert!(result.topological_order.is_none());

        let path = write_graph(&dir, "ring.json", false, &[(1, 2, 1.0), (2, 3, 1.0), (3, 1, 1.0)]);
        assert!(summarize(&path).unwrap().has_cycle);
    }

    #[test]
    fn shortest_sorts_by_distance() {
        let dir = TempDir::new().unwrap();
        let path = write_graph(&dir, "dag.json", true, &[(1, 2, 1.0), (2, 3, 1.0), (1, 4, 5.0)]);

        let rows = shortest(&path, 1, None).unwrap();
        assert_eq!(rows, vec![(1, 0.0), (2, 1.0), (3, 2.0), (4, 5.0)]);

        let rows = shortest(&path, 1, Some(2.0)).unwrap();
        assert_eq!(rows, vec![(1, 0.0), (2, 1.0)]);

        assert!(shortest(&path, 42, None).is_err());
    }

    #[test]
    fn empty_or_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "").unwrap();
        assert!(summarize(&empty).is_err());
        assert!(inspect(&dir.path().join("absent.json"), "text").is_err());
    }
}
