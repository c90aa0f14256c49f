//! # BiDMS Storage
//!
//! Storage backend trait and implementations for BiDMS disk structures.
//!
//! Backends are **opaque byte stores** addressed by offset. They do not
//! interpret the data they hold: the disk B-tree in `bidms_core` owns the
//! record layout and only asks for bytes at an offset.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral trees
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use bidms_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! backend.write_at(offset, b"HELLO").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"HELLO world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
