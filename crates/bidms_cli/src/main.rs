//! BiDMS CLI
//!
//! Command-line tools for BiDMS structure files.
//!
//! # Commands
//!
//! - `btree` - Operate on a disk B-tree file
//! - `graph` - Inspect a graph JSON file or run Dijkstra over it
//! - `search` - Filter texts by a pattern with one KMP pass

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// BiDMS structure tools.
#[derive(Parser)]
#[command(name = "bidms")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Operate on a disk B-tree file
    Btree {
        #[command(subcommand)]
        action: BtreeAction,
    },

    /// Work with a graph JSON file
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },

    /// Print the indices of the texts containing a pattern
    Search {
        /// Pattern to look for
        #[arg(short, long)]
        pattern: String,

        /// Separator used to join the texts; must not occur in them
        #[arg(short, long, default_value = "*")]
        separator: char,

        /// Texts to filter
        texts: Vec<String>,
    },

    /// Show version information
    Version,
}

/// Location of a disk B-tree.
#[derive(Args)]
struct TreeArgs {
    /// Path to the B-tree file
    #[arg(short, long)]
    file: PathBuf,

    /// Byte offset of the root record, as printed by the last mutation
    #[arg(short, long)]
    root: Option<u64>,
}

#[derive(Subcommand)]
enum BtreeAction {
    /// Insert keys, creating the file if needed
    Insert {
        #[command(flatten)]
        tree: TreeArgs,

        /// Keys to insert
        #[arg(required = true, allow_negative_numbers = true)]
        keys: Vec<i64>,
    },

    /// Show the node holding each key
    Search {
        #[command(flatten)]
        tree: TreeArgs,

        /// Keys to look up
        #[arg(required = true, allow_negative_numbers = true)]
        keys: Vec<i64>,
    },

    /// Remove keys
    Remove {
        #[command(flatten)]
        tree: TreeArgs,

        /// Keys to remove
        #[arg(required = true, allow_negative_numbers = true)]
        keys: Vec<i64>,
    },

    /// Print every record in file order
    Dump {
        /// Path to the B-tree file
        #[arg(short, long)]
        file: PathBuf,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print all keys in order
    Keys {
        #[command(flatten)]
        tree: TreeArgs,
    },

    /// Check the tree structure
    Verify {
        #[command(flatten)]
        tree: TreeArgs,
    },
}

#[derive(Subcommand)]
enum GraphAction {
    /// Report counts, cycle status and topological order
    Inspect {
        /// Path to the graph JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Shortest path lengths from one vertex
    Shortest {
        /// Path to the graph JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Source vertex payload
        #[arg(long, allow_negative_numbers = true)]
        from: i64,

        /// Drop paths whose length reaches this value
        #[arg(short, long)]
        threshold: Option<f64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Btree { action } => match action {
            BtreeAction::Insert { tree, keys } => {
                commands::btree::insert(&tree.file, tree.root, &keys)?;
            }
            BtreeAction::Search { tree, keys } => {
                let root = tree.root.ok_or("--root is required for search")?;
                commands::btree::search(&tree.file, root, &keys)?;
            }
            BtreeAction::Remove { tree, keys } => {
                let root = tree.root.ok_or("--root is required for remove")?;
                commands::btree::remove(&tree.file, root, &keys)?;
            }
            BtreeAction::Dump { file, format } => {
                commands::btree::dump(&file, &format)?;
            }
            BtreeAction::Keys { tree } => {
                let root = tree.root.ok_or("--root is required for keys")?;
                commands::btree::keys(&tree.file, root)?;
            }
            BtreeAction::Verify { tree } => {
                let root = tree.root.ok_or("--root is required for verify")?;
                commands::btree::verify(&tree.file, root)?;
            }
        },
        Commands::Graph { action } => match action {
            GraphAction::Inspect { file, format } => {
                commands::graph::inspect(&file, &format)?;
            }
            GraphAction::Shortest {
                file,
                from,
                threshold,
            } => {
                commands::graph::shortest(&file, from, threshold)?;
            }
        },
        Commands::Search {
            pattern,
            separator,
            texts,
        } => {
            commands::search::run(&pattern, separator, &texts)?;
        }
        Commands::Version => {
            println!("BiDMS CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("BiDMS Core v{}", bidms_core::VERSION);
        }
    }

    Ok(())
}
