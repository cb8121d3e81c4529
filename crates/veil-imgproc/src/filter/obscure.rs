use std::time::Instant;

use veil_image::{Image, ImageError};

use super::{box_blur_with_strategy, gaussian_blur_with_strategy, pixelate_with_strategy};
use super::BoxBlurStrategy;
use crate::parallel::ExecutionStrategy;

/// The filters that can obscure a captured screen.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "filter", rename_all = "snake_case"))]
pub enum ObscureFilter {
    /// Direct 2D convolution with a gaussian kernel.
    Gaussian {
        /// The half-width of the kernel.
        radius: usize,
        /// The standard deviation of the gaussian.
        sigma: f64,
    },
    /// Repeated separable box blur.
    BoxBlur {
        /// The half-width of the window.
        radius: usize,
        /// How many times the blur is applied.
        passes: usize,
        /// How the vertical half of each pass is computed.
        #[cfg_attr(feature = "serde", serde(default))]
        strategy: BoxBlurStrategy,
    },
    /// Block averaging.
    Pixelate {
        /// Blocks have side `2 * radius + 1`.
        radius: usize,
    },
}

impl ObscureFilter {
    /// A box blur using the default transpose strategy.
    pub fn box_blur(radius: usize, passes: usize) -> Self {
        ObscureFilter::BoxBlur {
            radius,
            passes,
            strategy: BoxBlurStrategy::default(),
        }
    }

    /// Check the filter parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidSigma`] for a gaussian with a sigma that is not
    /// positive and finite.
    pub fn validate(&self) -> Result<(), ImageError> {
        match *self {
            ObscureFilter::Gaussian { sigma, .. } if !(sigma.is_finite() && sigma > 0.0) => {
                Err(ImageError::InvalidSigma(sigma))
            }
            _ => Ok(()),
        }
    }

    /// Apply the filter into a preallocated destination.
    ///
    /// # Arguments
    ///
    /// * `src` - The source image with shape (H, W, 3).
    /// * `dst` - The destination image with shape (H, W, 3).
    /// * `strategy` - The execution strategy.
    pub fn apply_into(
        &self,
        src: &Image<u8, 3>,
        dst: &mut Image<u8, 3>,
        strategy: ExecutionStrategy,
    ) -> Result<(), ImageError> {
        self.validate()?;
        strategy.validate()?;

        let start = Instant::now();
        match *self {
            ObscureFilter::Gaussian { radius, sigma } => {
                gaussian_blur_with_strategy(src, dst, radius, sigma, strategy)?
            }
            ObscureFilter::BoxBlur {
                radius,
                passes,
                strategy: blur_strategy,
            } => box_blur_with_strategy(src, dst, radius, passes, blur_strategy, strategy)?,
            ObscureFilter::Pixelate { radius } => {
                pixelate_with_strategy(src, dst, radius, strategy)?
            }
        }
        log::debug!("{:?} on {} took {:?}", self, src.size(), start.elapsed());

        Ok(())
    }

    /// Apply the filter with an explicit execution strategy.
    ///
    /// # Returns
    ///
    /// A new image with the same size as `src`.
    pub fn apply_with_strategy(
        &self,
        src: &Image<u8, 3>,
        strategy: ExecutionStrategy,
    ) -> Result<Image<u8, 3>, ImageError> {
        self.validate()?;
        let mut dst = Image::from_size_val(src.size(), 0u8)?;
        self.apply_into(src, &mut dst, strategy)?;
        Ok(dst)
    }

    /// Apply the filter using [`ExecutionStrategy::Auto`].
    ///
    /// # Example
    ///
    /// ```
    /// use veil_image::Image;
    /// use veil_imgproc::filter::ObscureFilter;
    ///
    /// let src = Image::<u8, 3>::from_size_val([8, 6].into(), 128).unwrap();
    /// let dst = ObscureFilter::Pixelate { radius: 2 }.apply(&src).unwrap();
    ///
    /// assert_eq!(dst, src);
    /// ```
    pub fn apply(&self, src: &Image<u8, 3>) -> Result<Image<u8, 3>, ImageError> {
        self.apply_with_strategy(src, ExecutionStrategy::Auto)
    }
}
