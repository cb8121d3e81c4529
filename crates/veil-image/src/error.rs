/// An error type for the image and filtering crates.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when the data length does not match the image size.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when the source and destination sizes differ.
    #[error("Image size mismatch: source {0}x{1}, destination {2}x{3}")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when a buffer of the requested size cannot be allocated.
    #[error("Failed to allocate a buffer of {0} bytes")]
    AllocationFailed(usize),

    /// Error when the gaussian sigma is not strictly positive and finite.
    #[error("Sigma must be positive and finite, got {0}")]
    InvalidSigma(f64),

    /// Error when a fixed thread pool is requested with zero threads.
    #[error("Thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// Error when the local thread pool cannot be built.
    #[error("Failed to build thread pool: {0}")]
    ThreadPoolBuild(String),
}
