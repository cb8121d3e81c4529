use veil_image::{Image, ImageError};

use super::kernels::{self, Kernel2d};
use crate::parallel::{for_each_chunk_mut, ExecutionStrategy};

/// Round an accumulated value to the nearest 8-bit sample.
pub(crate) fn round_to_u8(val: f64) -> u8 {
    (val + 0.5).floor().clamp(0.0, 255.0) as u8
}

/// Convolve an image with a 2D kernel.
///
/// Every output sample is the weighted sum of the source samples under the kernel.
/// Source samples outside the image are skipped, so border pixels are weighted by
/// the part of the kernel that overlaps the image.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel` - The 2D kernel.
/// * `strategy` - The execution strategy.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn convolve_2d<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    kernel: &Kernel2d,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let rows = src.rows();
    let cols = src.cols();
    let radius = kernel.radius() as isize;
    let side = kernel.side();
    let weights = kernel.weights();
    let src_data = src.as_slice();

    for_each_chunk_mut(
        strategy,
        src.size().num_pixels(),
        dst.as_slice_mut(),
        cols * C,
        |r, row_dst| {
            // rows of the kernel that overlap the image
            let ky_start = (radius - r as isize).max(0) as usize;
            let ky_end = (rows as isize - r as isize + radius).min(side as isize) as usize;

            for c in 0..cols {
                let kx_start = (radius - c as isize).max(0) as usize;
                let kx_end = (cols as isize - c as isize + radius).min(side as isize) as usize;

                let mut acc = [0.0f64; C];
                for ky in ky_start..ky_end {
                    let y = r + ky - radius as usize;
                    let kernel_row = &weights[ky * side..(ky + 1) * side];
                    let src_row = &src_data[y * cols * C..(y + 1) * cols * C];
                    for kx in kx_start..kx_end {
                        let x = c + kx - radius as usize;
                        let k = kernel_row[kx];
                        let pixel = &src_row[x * C..(x + 1) * C];
                        for (acc_val, &v) in acc.iter_mut().zip(pixel) {
                            *acc_val += v as f64 * k;
                        }
                    }
                }

                let out = &mut row_dst[c * C..(c + 1) * C];
                for (o, &acc_val) in out.iter_mut().zip(acc.iter()) {
                    *o = round_to_u8(acc_val);
                }
            }
        },
    )
}

/// Blur an image using a 2D gaussian kernel.
///
/// The kernel is computed for this call only and read by every row in parallel.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `radius` - The half-width of the kernel.
/// * `sigma` - The standard deviation of the gaussian. Must be positive.
/// * `strategy` - The execution strategy.
///
/// # Example
///
/// ```
/// use veil_image::Image;
/// use veil_imgproc::filter::gaussian_blur_with_strategy;
/// use veil_imgproc::parallel::ExecutionStrategy;
///
/// let src = Image::<u8, 3>::from_size_val([4, 4].into(), 0).unwrap();
/// let mut dst = Image::<u8, 3>::from_size_val(src.size(), 0).unwrap();
///
/// gaussian_blur_with_strategy(&src, &mut dst, 1, 1.0, ExecutionStrategy::Serial).unwrap();
/// assert!(dst.as_slice().iter().all(|&v| v == 0));
/// ```
pub fn gaussian_blur_with_strategy<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    radius: usize,
    sigma: f64,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    let kernel = kernels::gaussian_kernel_2d(radius, sigma)?;
    convolve_2d(src, dst, &kernel, strategy)
}

/// Blur an image using a 2D gaussian kernel.
///
/// Uses [`ExecutionStrategy::Auto`]. For explicit control, use [`gaussian_blur_with_strategy`].
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn gaussian_blur<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    radius: usize,
    sigma: f64,
) -> Result<(), ImageError> {
    gaussian_blur_with_strategy(src, dst, radius, sigma, ExecutionStrategy::Auto)
}
