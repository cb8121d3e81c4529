use veil_image::{Image, ImageError};

use crate::parallel::{for_each_chunk_mut, ExecutionStrategy};

/// Pixelate an image by averaging square blocks.
///
/// The image is split into `b x b` blocks anchored at the top-left corner, where
/// `b = 2 * radius + 1`. Every pixel of a block is replaced by the block mean. Blocks
/// on the right and bottom edges may be smaller and only average the pixels they
/// cover. The mean is truncated toward zero, so a block can lose up to one level
/// per channel.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `radius` - Half of the block size minus one; zero leaves the image unchanged.
/// * `strategy` - The execution strategy. One row of blocks is one unit of work.
///
/// # Example
///
/// ```
/// use veil_image::Image;
/// use veil_imgproc::filter::pixelate_with_strategy;
/// use veil_imgproc::parallel::ExecutionStrategy;
///
/// let src = Image::<u8, 1>::new([3, 1].into(), vec![0, 10, 21]).unwrap();
/// let mut dst = Image::<u8, 1>::from_size_val(src.size(), 0).unwrap();
///
/// pixelate_with_strategy(&src, &mut dst, 1, ExecutionStrategy::Serial).unwrap();
/// assert_eq!(dst.as_slice(), &[10, 10, 10]);
/// ```
pub fn pixelate_with_strategy<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    radius: usize,
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

    let cols = src.cols();
    let row_len = cols * C;
    let block = radius.saturating_mul(2).saturating_add(1);
    // a single block row spans at most the whole image
    let band_len = block.min(src.rows()) * row_len;
    let src_data = src.as_slice();

    log::debug!("pixelate: block={} size={}", block, src.size());

    for_each_chunk_mut(
        strategy,
        src.size().num_pixels(),
        dst.as_slice_mut(),
        band_len,
        |band, band_dst| {
            let band_src = &src_data[band * band_len..band * band_len + band_dst.len()];
            let band_rows = band_dst.len() / row_len;

            let mut x0 = 0;
            while x0 < cols {
                let x1 = x0.saturating_add(block).min(cols);

                let mut acc = [0u64; C];
                for src_row in band_src.chunks_exact(row_len) {
                    for pixel in src_row[x0 * C..x1 * C].chunks_exact(C) {
                        for (a, &v) in acc.iter_mut().zip(pixel) {
                            *a += v as u64;
                        }
                    }
                }

                let amount = (band_rows * (x1 - x0)) as u64;
                let mut mean = [0u8; C];
                for (m, &a) in mean.iter_mut().zip(acc.iter()) {
                    *m = (a / amount) as u8;
                }

                for dst_row in band_dst.chunks_exact_mut(row_len) {
                    for pixel in dst_row[x0 * C..x1 * C].chunks_exact_mut(C) {
                        pixel.copy_from_slice(&mean);
                    }
                }

                x0 = x1;
            }
        },
    )
}

/// Pixelate an image by averaging square blocks of side `2 * radius + 1`.
///
/// Uses [`ExecutionStrategy::Auto`]. For explicit control, use [`pixelate_with_strategy`].
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn pixelate<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    radius: usize,
) -> Result<(), ImageError> {
    pixelate_with_strategy(src, dst, radius, ExecutionStrategy::Auto)
}
