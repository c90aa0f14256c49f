//! Disk B-tree commands.

use bidms_core::{CoreResult, DiskBTree, DiskNode, NODE_SIZE};
use bidms_storage::{FileBackend, StorageBackend};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One record as printed by `dump --format json`.
#[derive(Debug, Serialize)]
pub struct NodeRecord {
    /// Byte offset of the record.
    pub offset: u64,
    /// Whether the node is a leaf.
    pub leaf: bool,
    /// Stored keys.
    pub keys: Vec<i64>,
    /// Child offsets.
    pub children: Vec<u64>,
}

impl From<&DiskNode> for NodeRecord {
    fn from(node: &DiskNode) -> Self {
        Self {
            offset: node.offset(),
            leaf: node.is_leaf(),
            keys: node.keys().to_vec(),
            children: node.children().to_vec(),
        }
    }
}

fn open_tree(file: &Path, root: Option<u64>) -> CoreResult<DiskBTree<FileBackend>> {
    let backend = FileBackend::open(file)?;
    match root {
        Some(offset) => DiskBTree::open(backend, offset),
        None => DiskBTree::new(backend),
    }
}

fn require_file(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if file.exists() {
        Ok(())
    } else {
        Err(format!("No B-tree file found at {:?}", file).into())
    }
}

fn print_root(root: Option<u64>) {
    match root {
        Some(offset) => println!("Root offset: {offset}"),
        None => println!("Root offset: none (tree is empty)"),
    }
}

/// Inserts keys and prints the new root offset.
///
/// Without `root` the file must be empty or absent; records already in the
/// file would be unreachable from a fresh root.
pub fn insert(
    file: &Path,
    root: Option<u64>,
    keys: &[i64],
) -> Result<Option<u64>, Box<dyn std::error::Error>> {
    if root.is_none() && file.exists() && std::fs::metadata(file)?.len() > 0 {
        return Err(format!(
            "{:?} already holds B-tree records; pass --root to extend that tree",
            file
        )
        .into());
    }

    let mut tree = open_tree(file, root)?;
    let mut added = 0;
    for &key in keys {
        if tree.insert(key)? {
            added += 1;
        } else {
            println!("  {key} already present");
        }
    }
    info!(added, file = %file.display(), "insert finished");
    println!("Inserted {added} of {} keys", keys.len());
    print_root(tree.root_offset());
    Ok(tree.root_offset())
}

/// Prints the node holding each key.
pub fn search(file: &Path, root: u64, keys: &[i64]) -> Result<(), Box<dyn std::error::Error>> {
    require_file(file)?;
    let tree = open_tree(file, Some(root))?;
    for &key in keys {
        match tree.search(key)? {
            Some(node) => println!("{key}: {node}"),
            None => println!("{key}: not found"),
        }
    }
    Ok(())
}

/// Removes keys and prints the new root offset.
pub fn remove(file: &Path, root: u64, keys: &[i64]) -> Result<Option<u64>, Box<dyn std::error::Error>> {
    require_file(file)?;
    let mut tree = open_tree(file, Some(root))?;
    let mut removed = 0;
    for &key in keys {
        if tree.remove(key)? {
            removed += 1;
        } else {
            println!("  {key} not found");
        }
    }
    println!("Removed {removed} of {} keys", keys.len());
    print_root(tree.root_offset());
    Ok(tree.root_offset())
}

/// Prints every record in file order.
pub fn dump(file: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    require_file(file)?;
    let tree = open_tree(file, None)?;
    let nodes = tree.dump()?;

    match format {
        "json" => {
            let records: Vec<NodeRecord> = nodes.iter().map(NodeRecord::from).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            println!(
                "{} records of {NODE_SIZE} bytes ({} bytes)",
                nodes.len(),
                tree.backend().size()?
            );
            for node in &nodes {
                println!("  {node}");
            }
        }
    }
    Ok(())
}

/// Prints all keys in ascending order.
pub fn keys(file: &Path, root: u64) -> Result<(), Box<dyn std::error::Error>> {
    require_file(file)?;
    let tree = open_tree(file, Some(root))?;
    let keys = tree.keys()?;
    let line: Vec<String> = keys.iter().map(i64::to_string).collect();
    println!("{}", line.join(" "));
    println!("({} keys)", keys.len());
    Ok(())
}

/// Checks the tree reachable from `root`.
pub fn verify(file: &Path, root: u64) -> Result<(), Box<dyn std::error::Error>> {
    require_file(file)?;
    println!("Verifying B-tree at {:?} from root {root}", file);
    let tree = open_tree(file, Some(root))?;

    match tree.validate() {
        Ok(()) => {
            println!("✓ B-tree verification passed ({} keys)", tree.keys()?.len());
            Ok(())
        }
        Err(e) => {
            println!("✗ B-tree verification failed: {e}");
            Err("Verification failed".into())
        }
    }
}
