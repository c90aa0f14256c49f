//! # BiDMS Testkit
//!
//! Test utilities for BiDMS structures.
//!
//! This crate provides:
//! - Fixtures for disk B-trees in temporary files and canned scenarios
//! - Property-based test generators using proptest
//! - A harness that replays key operations against every ordered structure
//!   and a reference model
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bidms_testkit::prelude::*;
//!
//! #[test]
//! fn survives_reopen() {
//!     let mut fixture = TempDiskTree::new();
//!     fixture.tree.insert(7).unwrap();
//!     fixture.reopen();
//!     assert!(fixture.tree.contains(7).unwrap());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod harness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
}

pub use fixtures::*;
pub use generators::*;
pub use harness::*;
