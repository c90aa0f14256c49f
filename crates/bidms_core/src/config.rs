//! Structure configuration.

use crate::error::{CoreError, CoreResult};

/// Tuning knobs shared by the core structures.
///
/// Every structure has a `new()` that uses [`Config::default`] and a
/// `with_config(&Config)` constructor for explicit values.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of keys in a B+ tree node.
    pub bplus_order: usize,

    /// Initial slot count of a probe hash map.
    pub map_initial_capacity: usize,

    /// Load factor above which a probe hash map rehashes.
    pub map_max_load: f64,

    /// Round limit for the loop-permitting BFS.
    pub loop_bfs_max_rounds: usize,

    /// Whether the disk B-tree syncs (instead of flushes) after each mutation.
    pub sync_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bplus_order: 3,
            map_initial_capacity: 11,
            map_max_load: 0.5,
            loop_bfs_max_rounds: 64,
            sync_on_write: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the B+ tree order.
    #[must_use]
    pub const fn bplus_order(mut self, order: usize) -> Self {
        self.bplus_order = order;
        self
    }

    /// Sets the initial probe map capacity.
    #[must_use]
    pub const fn map_initial_capacity(mut self, capacity: usize) -> Self {
        self.map_initial_capacity = capacity;
        self
    }

    /// Sets the probe map rehash threshold.
    #[must_use]
    pub const fn map_max_load(mut self, load: f64) -> Self {
        self.map_max_load = load;
        self
    }

    /// Sets the loop-permitting BFS round limit.
    #[must_use]
    pub const fn loop_bfs_max_rounds(mut self, rounds: usize) -> Self {
        self.loop_bfs_max_rounds = rounds;
        self
    }

    /// Sets whether disk writes are synced rather than flushed.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> CoreResult<()> {
        if self.bplus_order < 3 {
            return Err(CoreError::invalid_config(format!(
                "bplus_order must be at least 3, got {}",
                self.bplus_order
            )));
        }
        if self.map_initial_capacity == 0 {
            return Err(CoreError::invalid_config(
                "map_initial_capacity must be non-zero",
            ));
        }
        if !(self.map_max_load > 0.0 && self.map_max_load < 1.0) {
            return Err(CoreError::invalid_config(format!(
                "map_max_load must be in (0, 1), got {}",
                self.map_max_load
            )));
        }
        if self.loop_bfs_max_rounds == 0 {
            return Err(CoreError::invalid_config(
                "loop_bfs_max_rounds must be non-zero",
            ));
        }
        Ok(())
    }
}
