//! n5zarr global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for the n5zarr crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Number of Threads
/// > default: `1`
///
/// The default number of worker threads used by a dataset for operations spanning multiple chunks.
/// A value of `1` processes chunks sequentially on the calling thread.
/// Datasets without their own number of threads use the current value, and it can be overridden per call with [`IoOptions`](crate::array::IoOptions).
///
/// ## Write Empty Chunks
/// > default: [`false`]
///
/// If `false`, a chunk whose elements all equal the fill value is erased from the store instead of being written.
/// If `true`, such chunks are written like any other chunk.
#[derive(Debug)]
pub struct Config {
    num_threads: usize,
    write_empty_chunks: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Config {
            num_threads: 1,
            write_empty_chunks: false,
        }
    }
}

impl Config {
    /// Get the [number of threads](#number-of-threads) configuration.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Set the [number of threads](#number-of-threads) configuration.
    ///
    /// A value of zero is treated as one.
    pub fn set_num_threads(&mut self, num_threads: usize) {
        self.num_threads = num_threads.max(1);
    }

    /// Get the [write empty chunks](#write-empty-chunks) configuration.
    #[must_use]
    pub fn write_empty_chunks(&self) -> bool {
        self.write_empty_chunks
    }

    /// Set the [write empty chunks](#write-empty-chunks) configuration.
    pub fn set_write_empty_chunks(&mut self, write_empty_chunks: bool) {
        self.write_empty_chunks = write_empty_chunks;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global n5zarr configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global n5zarr configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_num_threads() {
        let num_threads = global_config().num_threads();
        global_config_mut().set_num_threads(0);
        assert_eq!(global_config().num_threads(), 1);
        global_config_mut().set_num_threads(num_threads);
        assert_eq!(global_config().num_threads(), num_threads);
    }

    #[test]
    fn config_default() {
        let config = Config::default();
        assert_eq!(config.num_threads(), 1);
        assert!(!config.write_empty_chunks());
    }
}
