//! Filter operations
//!
//! This module provides the filters used to obscure a captured screen: a direct
//! gaussian convolution, a repeated separable box blur and a block pixelation.

/// Filter kernels
pub mod kernels;

/// Direct 2D convolution
mod convolution;
pub use convolution::*;

/// Separable box blur
mod box_blur;
pub use box_blur::*;

/// Block pixelation
mod pixelate;
pub use pixelate::*;

/// Filter selection
mod obscure;
pub use obscure::*;
