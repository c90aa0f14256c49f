//! CLI command implementations.

pub mod btree;
pub mod graph;
pub mod search;
