#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`IoError`] variants for file access and encoding/decoding failures.
pub mod error;

/// PNG image encoding and decoding.
///
/// Read and write 8-bit RGB PNG images.
pub mod png;

/// Raw interleaved pixel output.
///
/// Write the pixel buffer as is, for consumers that take raw `rgb` frames.
pub mod raw;

pub use crate::error::IoError;
