//! Concurrency utilities for array I/O.
//!
//! Each array I/O call fans its per-chunk work out over a worker pool sized for that call.
//! The pool is scoped to the call: it is built when the call starts and joined before the call returns.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::global_config;

use super::ArrayError;

/// Options for array I/O.
#[derive(Debug, Clone)]
pub struct IoOptions {
    num_threads: usize,
    write_empty_chunks: bool,
}

impl Default for IoOptions {
    fn default() -> Self {
        let config = global_config();
        Self {
            num_threads: config.num_threads(),
            write_empty_chunks: config.write_empty_chunks(),
        }
    }
}

impl IoOptions {
    /// Create a new I/O options builder.
    #[must_use]
    pub fn builder() -> IoOptionsBuilder {
        IoOptionsBuilder::new()
    }

    /// Return the number of worker threads.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Set the number of worker threads. Zero is treated as one.
    pub fn set_num_threads(&mut self, num_threads: usize) {
        self.num_threads = num_threads.max(1);
    }

    /// Return whether chunks equal to the fill value are written rather than erased.
    #[must_use]
    pub fn write_empty_chunks(&self) -> bool {
        self.write_empty_chunks
    }

    /// Set whether chunks equal to the fill value are written rather than erased.
    pub fn set_write_empty_chunks(&mut self, write_empty_chunks: bool) {
        self.write_empty_chunks = write_empty_chunks;
    }
}

/// Builder for [`IoOptions`].
#[derive(Debug, Clone)]
pub struct IoOptionsBuilder {
    options: IoOptions,
}

impl Default for IoOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IoOptionsBuilder {
    /// Create a new I/O options builder, initialised from the global configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: IoOptions::default(),
        }
    }

    /// Build into I/O options.
    #[must_use]
    pub fn build(&self) -> IoOptions {
        self.options.clone()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.options.set_num_threads(num_threads);
        self
    }

    /// Set whether chunks equal to the fill value are written rather than erased.
    #[must_use]
    pub fn write_empty_chunks(mut self, write_empty_chunks: bool) -> Self {
        self.options.set_write_empty_chunks(write_empty_chunks);
        self
    }
}

/// Apply `op` to every item, on a pool of `num_threads` workers.
///
/// All items are attempted unless one fails, in which case remaining items may be skipped.
/// Work already completed is not undone.
///
/// # Errors
/// Returns the first error returned by `op`, or [`ArrayError::ThreadPoolBuildError`] if the pool cannot be built.
pub(crate) fn for_each_chunk<I, F>(num_threads: usize, items: Vec<I>, op: F) -> Result<(), ArrayError>
where
    I: Send,
    F: Fn(I) -> Result<(), ArrayError> + Send + Sync,
{
    if num_threads <= 1 || items.len() <= 1 {
        return items.into_iter().try_for_each(op);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads.min(items.len()))
        .build()?;
    pool.install(|| items.into_par_iter().try_for_each(op))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn io_options() {
        let options = IoOptions::builder()
            .num_threads(0)
            .write_empty_chunks(true)
            .build();
        assert_eq!(options.num_threads(), 1);
        assert!(options.write_empty_chunks());
    }

    #[test]
    fn for_each_chunk_all() {
        for num_threads in [1, 4] {
            let count = AtomicUsize::new(0);
            for_each_chunk(num_threads, (0..100).collect(), |i: usize| {
                count.fetch_add(i, Ordering::Relaxed);
                Ok(())
            })
            .unwrap();
            assert_eq!(count.load(Ordering::Relaxed), 4950);
        }
    }

    #[test]
    fn for_each_chunk_error() {
        let result = for_each_chunk(4, (0..100).collect(), |i: usize| {
            if i == 50 {
                Err(ArrayError::from("failed"))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }
}
