use rayon::prelude::*;

use veil_image::ImageError;

/// Number of pixels from which [`ExecutionStrategy::Auto`] switches to parallel execution.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 100_000;

/// Controls how the filter loops are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Parallel for images with at least [`PARALLEL_PIXEL_THRESHOLD`] pixels, serial otherwise.
    #[default]
    Auto,

    /// Use the global Rayon thread pool.
    Parallel,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the overhead of parallelization
    /// outweighs the benefits.
    Serial,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    Fixed(usize),
}

impl ExecutionStrategy {
    /// Whether the strategy runs in parallel for an image with `num_pixels` pixels.
    pub fn is_parallel(&self, num_pixels: usize) -> bool {
        match self {
            ExecutionStrategy::Serial => false,
            ExecutionStrategy::Parallel | ExecutionStrategy::Fixed(_) => true,
            ExecutionStrategy::Auto => num_pixels >= PARALLEL_PIXEL_THRESHOLD,
        }
    }

    /// Check the strategy can run before any output is written.
    pub fn validate(&self) -> Result<(), ImageError> {
        match self {
            ExecutionStrategy::Fixed(0) => Err(ImageError::InvalidThreadCount(0)),
            _ => Ok(()),
        }
    }
}

/// Apply `f` to every disjoint `chunk_len` chunk of `data`.
///
/// `f` receives the index of the chunk and the chunk itself. The last chunk may be
/// shorter than `chunk_len`. Chunks are independent, so the result does not depend
/// on the strategy.
///
/// # Arguments
///
/// * `strategy` - The execution strategy.
/// * `num_pixels` - The number of pixels of the image, used by [`ExecutionStrategy::Auto`].
/// * `data` - The buffer to split.
/// * `chunk_len` - The length of each chunk. A zero length processes nothing.
/// * `f` - The function to apply to each chunk.
pub fn for_each_chunk_mut<T, F>(
    strategy: ExecutionStrategy,
    num_pixels: usize,
    data: &mut [T],
    chunk_len: usize,
    f: F,
) -> Result<(), ImageError>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    strategy.validate()?;

    if chunk_len == 0 || data.is_empty() {
        return Ok(());
    }

    match strategy {
        ExecutionStrategy::Fixed(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ImageError::ThreadPoolBuild(e.to_string()))?;

            pool.install(|| {
                data.par_chunks_mut(chunk_len)
                    .enumerate()
                    .for_each(|(i, chunk)| f(i, chunk));
            });
        }
        s if s.is_parallel(num_pixels) => {
            data.par_chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(i, chunk)| f(i, chunk));
        }
        _ => {
            data.chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(i, chunk)| f(i, chunk));
        }
    }

    Ok(())
}
