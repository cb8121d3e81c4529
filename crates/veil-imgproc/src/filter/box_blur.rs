use veil_image::{Image, ImageError, ImageSize};

use crate::parallel::{for_each_chunk_mut, ExecutionStrategy};

/// How the vertical half of a box blur pass is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BoxBlurStrategy {
    /// Transpose, run the horizontal pass again, and transpose back.
    #[default]
    Transpose,
    /// Slide the window down the columns directly.
    Vertical,
}

/// Divides a window sum by the fixed window width `2 * radius + 1`, rounding half up.
///
/// The window width is not reduced at the borders, so windows clipped by the image
/// edge are darker than the samples they cover.
#[derive(Debug, Clone, Copy)]
struct WindowDivisor {
    width: u64,
}

impl WindowDivisor {
    fn new(radius: usize) -> Self {
        Self {
            width: (radius as u64).saturating_mul(2).saturating_add(1),
        }
    }

    // floor(sum / width + 0.5) without floating point drift or overflow
    #[inline]
    fn round(&self, sum: u64) -> u8 {
        let quotient = sum / self.width;
        let remainder = sum % self.width;
        let rounded = quotient + u64::from(remainder >= self.width - remainder);
        rounded.min(u8::MAX as u64) as u8
    }
}

// sliding window over one row of interleaved pixels
fn blur_row<const C: usize>(src_row: &[u8], dst_row: &mut [u8], radius: usize, div: WindowDivisor) {
    let cols = src_row.len() / C;
    if cols == 0 {
        return;
    }

    let mut acc = [0u64; C];
    for pixel in src_row.chunks_exact(C).take(radius.saturating_add(1)) {
        for (a, &v) in acc.iter_mut().zip(pixel) {
            *a += v as u64;
        }
    }

    for (c, out) in dst_row.chunks_exact_mut(C).enumerate() {
        for (o, &a) in out.iter_mut().zip(acc.iter()) {
            *o = div.round(a);
        }

        if c >= radius {
            let leaving = (c - radius) * C;
            for (a, &v) in acc.iter_mut().zip(&src_row[leaving..leaving + C]) {
                *a -= v as u64;
            }
        }

        if let Some(entering) = c.checked_add(radius).and_then(|x| x.checked_add(1)) {
            if entering < cols {
                let entering = entering * C;
                for (a, &v) in acc.iter_mut().zip(&src_row[entering..entering + C]) {
                    *a += v as u64;
                }
            }
        }
    }
}

#[inline]
fn row_slice(data: &[u8], row_len: usize, y: usize) -> &[u8] {
    &data[y * row_len..(y + 1) * row_len]
}

fn check_same_size<const C: usize>(
    src: &Image<u8, C>,
    dst_size: ImageSize,
) -> Result<(), ImageError> {
    if src.size() != dst_size {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst_size.width,
            dst_size.height,
        ));
    }
    Ok(())
}

/// Apply a horizontal box filter of half-width `radius` to every row.
///
/// The window sum is updated in O(1) per pixel. Columns outside the image contribute
/// nothing, and the sum is always divided by `2 * radius + 1`.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `radius` - The half-width of the window.
/// * `strategy` - The execution strategy.
pub fn box_blur_horizontal<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    radius: usize,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    check_same_size(src, dst.size())?;

    let div = WindowDivisor::new(radius);
    let row_len = src.cols() * C;
    let src_data = src.as_slice();

    for_each_chunk_mut(
        strategy,
        src.size().num_pixels(),
        dst.as_slice_mut(),
        row_len,
        |r, dst_row| {
            let src_row = &src_data[r * row_len..(r + 1) * row_len];
            blur_row::<C>(src_row, dst_row, radius, div);
        },
    )
}

/// Apply a vertical box filter of half-width `radius` to every column.
///
/// Output rows are split into bands; each band seeds its own column sums and then
/// slides them downwards, so the bands are independent.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `radius` - The half-width of the window.
/// * `strategy` - The execution strategy.
pub fn box_blur_vertical<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    radius: usize,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    check_same_size(src, dst.size())?;

    let rows = src.rows();
    let row_len = src.cols() * C;
    if rows == 0 || row_len == 0 {
        return Ok(());
    }

    let num_pixels = src.size().num_pixels();
    let band_rows = match strategy {
        ExecutionStrategy::Fixed(n) => rows.div_ceil(n.max(1)),
        s if s.is_parallel(num_pixels) => rows.div_ceil(rayon::current_num_threads()),
        _ => rows,
    }
    .max(1);

    let div = WindowDivisor::new(radius);
    let src_data = src.as_slice();

    for_each_chunk_mut(
        strategy,
        num_pixels,
        dst.as_slice_mut(),
        band_rows * row_len,
        |band, band_dst| {
            let first = band * band_rows;
            let mut acc = vec![0u64; row_len];

            let lo = first.saturating_sub(radius);
            let hi = first.saturating_add(radius).min(rows - 1);
            for y in lo..=hi {
                for (a, &v) in acc.iter_mut().zip(row_slice(src_data, row_len, y)) {
                    *a += v as u64;
                }
            }

            for (i, out_row) in band_dst.chunks_exact_mut(row_len).enumerate() {
                let y = first + i;
                for (o, &a) in out_row.iter_mut().zip(acc.iter()) {
                    *o = div.round(a);
                }

                if y >= radius {
                    for (a, &v) in acc.iter_mut().zip(row_slice(src_data, row_len, y - radius)) {
                        *a -= v as u64;
                    }
                }

                if let Some(entering) = y.checked_add(radius).and_then(|x| x.checked_add(1)) {
                    if entering < rows {
                        for (a, &v) in acc.iter_mut().zip(row_slice(src_data, row_len, entering)) {
                            *a += v as u64;
                        }
                    }
                }
            }
        },
    )
}

/// Transpose an image, swapping rows and columns.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (W, H, C).
/// * `strategy` - The execution strategy.
///
/// # Example
///
/// ```
/// use veil_image::Image;
/// use veil_imgproc::filter::transpose;
/// use veil_imgproc::parallel::ExecutionStrategy;
///
/// let src = Image::<u8, 1>::new([3, 2].into(), vec![1, 2, 3, 4, 5, 6]).unwrap();
/// let mut dst = Image::<u8, 1>::from_size_val([2, 3].into(), 0).unwrap();
///
/// transpose(&src, &mut dst, ExecutionStrategy::Serial).unwrap();
/// assert_eq!(dst.as_slice(), &[1, 4, 2, 5, 3, 6]);
/// ```
pub fn transpose<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    if src.size().transposed() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.rows(),
            src.cols(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let rows = src.rows();
    let cols = src.cols();
    let src_data = src.as_slice();

    // each destination row is one source column
    for_each_chunk_mut(
        strategy,
        src.size().num_pixels(),
        dst.as_slice_mut(),
        rows * C,
        |c, dst_row| {
            for (r, out) in dst_row.chunks_exact_mut(C).enumerate() {
                let idx = (r * cols + c) * C;
                out.copy_from_slice(&src_data[idx..idx + C]);
            }
        },
    )
}

/// Intermediate buffers for [`box_blur_with_scratch`].
///
/// The scratch belongs to one blur invocation at a time; concurrent blurs need their
/// own scratch. It can be reused across calls on images of the same size.
pub struct BoxBlurScratch<const C: usize> {
    strategy: BoxBlurStrategy,
    horizontal: Image<u8, C>,
    transposed: Option<(Image<u8, C>, Image<u8, C>)>,
}

impl<const C: usize> BoxBlurScratch<C> {
    /// Allocate the buffers needed to blur images of `size` with `strategy`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::AllocationFailed`] if a buffer cannot be allocated.
    pub fn new(size: ImageSize, strategy: BoxBlurStrategy) -> Result<Self, ImageError> {
        let horizontal = Image::from_size_val(size, 0)?;
        let transposed = match strategy {
            BoxBlurStrategy::Transpose => Some((
                Image::from_size_val(size.transposed(), 0)?,
                Image::from_size_val(size.transposed(), 0)?,
            )),
            BoxBlurStrategy::Vertical => None,
        };

        Ok(Self {
            strategy,
            horizontal,
            transposed,
        })
    }

    /// The size of the images this scratch can blur.
    pub fn size(&self) -> ImageSize {
        self.horizontal.size()
    }

    /// The strategy the scratch was allocated for.
    pub fn strategy(&self) -> BoxBlurStrategy {
        self.strategy
    }
}

/// Blur an image with `passes` repetitions of a separable box filter, reusing `scratch`.
///
/// Each pass runs the horizontal sliding window and then the vertical one, rounding
/// to 8 bits after each. The output of a pass is the input of the next. Zero passes
/// copy `src` into `dst` unchanged.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `radius` - The half-width of the window.
/// * `passes` - How many times the blur is applied.
/// * `scratch` - Intermediate buffers allocated for the image size.
/// * `strategy` - The execution strategy.
pub fn box_blur_with_scratch<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    radius: usize,
    passes: usize,
    scratch: &mut BoxBlurScratch<C>,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    check_same_size(src, dst.size())?;
    check_same_size(src, scratch.size())?;
    strategy.validate()?;

    log::debug!(
        "box blur: radius={} passes={} strategy={:?} size={}",
        radius,
        passes,
        scratch.strategy,
        src.size()
    );

    if passes == 0 {
        dst.as_slice_mut().copy_from_slice(src.as_slice());
        return Ok(());
    }

    for pass in 0..passes {
        let input = if pass == 0 { src } else { &*dst };
        box_blur_horizontal(input, &mut scratch.horizontal, radius, strategy)?;

        match scratch.transposed.as_mut() {
            Some((transposed, blurred)) => {
                transpose(&scratch.horizontal, transposed, strategy)?;
                box_blur_horizontal(transposed, blurred, radius, strategy)?;
                transpose(blurred, dst, strategy)?;
            }
            None => {
                box_blur_vertical(&scratch.horizontal, dst, radius, strategy)?;
            }
        }
    }

    Ok(())
}

/// Blur an image with `passes` repetitions of a separable box filter.
///
/// Allocates the intermediate buffers for this call only.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `radius` - The half-width of the window.
/// * `passes` - How many times the blur is applied.
/// * `blur_strategy` - How the vertical half of each pass is computed.
/// * `strategy` - The execution strategy.
pub fn box_blur_with_strategy<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    radius: usize,
    passes: usize,
    blur_strategy: BoxBlurStrategy,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    check_same_size(src, dst.size())?;
    let mut scratch = BoxBlurScratch::new(src.size(), blur_strategy)?;
    box_blur_with_scratch(src, dst, radius, passes, &mut scratch, strategy)
}

/// Blur an image with `passes` repetitions of a separable box filter.
///
/// Uses the transpose strategy and [`ExecutionStrategy::Auto`].
///
/// # Example
///
/// ```
/// use veil_image::Image;
/// use veil_imgproc::filter::box_blur;
///
/// let src = Image::<u8, 3>::from_size_val([4, 4].into(), 90).unwrap();
/// let mut dst = Image::<u8, 3>::from_size_val(src.size(), 0).unwrap();
///
/// box_blur(&src, &mut dst, 1, 1).unwrap();
/// assert_eq!(dst.get([1, 1, 0]), Some(&90));
/// ```
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn box_blur<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    radius: usize,
    passes: usize,
) -> Result<(), ImageError> {
    box_blur_with_strategy(
        src,
        dst,
        radius,
        passes,
        BoxBlurStrategy::Transpose,
        ExecutionStrategy::Auto,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::kernels::box_blur_kernel_1d;

    // re-sums the whole window for every pixel
    fn naive_horizontal(src: &Image<u8, 1>, radius: usize) -> Vec<u8> {
        let kernel = box_blur_kernel_1d(radius);
        let cols = src.cols() as isize;
        let mut out = Vec::with_capacity(src.as_slice().len());
        for row in src.as_slice().chunks_exact(src.cols()) {
            for c in 0..cols {
                let mut acc = 0.0f64;
                for (k, &w) in kernel.iter().enumerate() {
                    let x = c + k as isize - radius as isize;
                    if x >= 0 && x < cols {
                        acc += row[x as usize] as f64 * w;
                    }
                }
                out.push((acc + 0.5).floor() as u8);
            }
        }
        out
    }

    #[test]
    fn test_window_divisor() {
        let div = WindowDivisor::new(1);
        assert_eq!(div.round(0), 0);
        assert_eq!(div.round(200), 67);
        assert_eq!(div.round(201), 67);
        assert_eq!(div.round(765), 255);
        // 2.5 rounds up
        assert_eq!(WindowDivisor::new(0).round(3), 3);
        assert_eq!(WindowDivisor::new(usize::MAX).round(0), 0);
        assert_eq!(WindowDivisor::new(usize::MAX).round(255), 0);
        assert_eq!(WindowDivisor::new(usize::MAX).round(u64::MAX / 2 + 1), 1);
    }

    #[test]
    fn test_box_blur_huge_radius() -> Result<(), ImageError> {
        let black = Image::<u8, 3>::from_size_val([3, 3].into(), 0)?;
        let mut dst = Image::<u8, 3>::from_size_val(black.size(), 255)?;
        for blur_strategy in [BoxBlurStrategy::Transpose, BoxBlurStrategy::Vertical] {
            box_blur_with_strategy(
                &black,
                &mut dst,
                usize::MAX,
                1,
                blur_strategy,
                ExecutionStrategy::Serial,
            )?;
            assert!(dst.as_slice().iter().all(|&v| v == 0));
        }

        // a window far wider than the image divides a bright row down to zero
        let white = Image::<u8, 3>::from_size_val([3, 3].into(), 255)?;
        box_blur(&white, &mut dst, usize::MAX, 1)?;
        assert!(dst.as_slice().iter().all(|&v| v == 0));
        Ok(())
    }

    #[test]
    fn test_box_blur_horizontal() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 2,
        };

        #[rustfmt::skip]
        let img = Image::<u8, 1>::new(
            size,
            vec![
                0, 0, 9, 0, 0,
                30, 30, 30, 30, 30,
            ],
        )?;

        let mut dst = Image::<u8, 1>::from_size_val(size, 0)?;
        box_blur_horizontal(&img, &mut dst, 1, ExecutionStrategy::Serial)?;

        #[rustfmt::skip]
        assert_eq!(
            dst.as_slice(),
            &[
                0, 3, 3, 3, 0,
                20, 30, 30, 30, 20,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_box_blur_horizontal_matches_naive() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 11,
            height: 3,
        };
        let data = (0..size.num_pixels()).map(|i| (i * 53 % 256) as u8).collect();
        let img = Image::<u8, 1>::new(size, data)?;

        for radius in [0, 1, 2, 5, 10, 30] {
            let mut dst = Image::<u8, 1>::from_size_val(size, 0)?;
            box_blur_horizontal(&img, &mut dst, radius, ExecutionStrategy::Serial)?;
            assert_eq!(dst.as_slice(), naive_horizontal(&img, radius).as_slice());
        }
        Ok(())
    }

    #[test]
    fn test_box_blur_vertical_is_transposed_horizontal() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 4,
            height: 9,
        };
        let data = (0..size.num_pixels() * 3)
            .map(|i| (i * 29 % 256) as u8)
            .collect();
        let img = Image::<u8, 3>::new(size, data)?;

        for strategy in [
            ExecutionStrategy::Serial,
            ExecutionStrategy::Parallel,
            ExecutionStrategy::Fixed(4),
        ] {
            let mut vertical = Image::<u8, 3>::from_size_val(size, 0)?;
            box_blur_vertical(&img, &mut vertical, 2, strategy)?;

            let mut transposed = Image::<u8, 3>::from_size_val(size.transposed(), 0)?;
            transpose(&img, &mut transposed, strategy)?;
            let mut blurred = Image::<u8, 3>::from_size_val(size.transposed(), 0)?;
            box_blur_horizontal(&transposed, &mut blurred, 2, strategy)?;
            let mut expected = Image::<u8, 3>::from_size_val(size, 0)?;
            transpose(&blurred, &mut expected, strategy)?;

            assert_eq!(vertical, expected);
        }
        Ok(())
    }

    #[test]
    fn test_transpose_round_trip() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 3,
            height: 2,
        };
        let img = Image::<u8, 3>::new(size, (0..18).collect())?;

        let mut transposed = Image::<u8, 3>::from_size_val(size.transposed(), 0)?;
        transpose(&img, &mut transposed, ExecutionStrategy::Serial)?;
        assert_eq!(transposed.get([2, 1, 0]), img.get([1, 2, 0]));
        assert_eq!(transposed.get([0, 1, 2]), img.get([1, 0, 2]));

        let mut back = Image::<u8, 3>::from_size_val(size, 0)?;
        transpose(&transposed, &mut back, ExecutionStrategy::Parallel)?;
        assert_eq!(back, img);
        Ok(())
    }

    #[test]
    fn test_transpose_wrong_size() -> Result<(), ImageError> {
        let img = Image::<u8, 3>::from_size_val([3, 2].into(), 0)?;
        let mut dst = Image::<u8, 3>::from_size_val([3, 2].into(), 0)?;
        assert!(transpose(&img, &mut dst, ExecutionStrategy::Serial).is_err());
        Ok(())
    }

    #[test]
    fn test_box_blur_impulse() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 5,
        };

        let mut img = Image::<u8, 1>::from_size_val(size, 0)?;
        img.as_slice_mut()[12] = 90;

        let mut dst = Image::<u8, 1>::from_size_val(size, 0)?;
        box_blur(&img, &mut dst, 1, 1)?;

        #[rustfmt::skip]
        assert_eq!(
            dst.as_slice(),
            &[
                0, 0, 0, 0, 0,
                0, 10, 10, 10, 0,
                0, 10, 10, 10, 0,
                0, 10, 10, 10, 0,
                0, 0, 0, 0, 0,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_box_blur_zero_passes() -> Result<(), ImageError> {
        let img = Image::<u8, 3>::new([2, 2].into(), (0..12).collect())?;
        let mut dst = Image::<u8, 3>::from_size_val(img.size(), 255)?;
        box_blur(&img, &mut dst, 3, 0)?;
        assert_eq!(dst, img);
        Ok(())
    }

    #[test]
    fn test_box_blur_scratch_reuse() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 6,
            height: 4,
        };
        let img = Image::<u8, 3>::new(size, (0..72).map(|i| (i * 7) as u8).collect())?;
        let mut scratch = BoxBlurScratch::new(size, BoxBlurStrategy::Vertical)?;
        assert_eq!(scratch.strategy(), BoxBlurStrategy::Vertical);

        let mut first = Image::<u8, 3>::from_size_val(size, 0)?;
        box_blur_with_scratch(&img, &mut first, 1, 2, &mut scratch, ExecutionStrategy::Serial)?;
        let mut second = Image::<u8, 3>::from_size_val(size, 0)?;
        box_blur_with_scratch(&img, &mut second, 1, 2, &mut scratch, ExecutionStrategy::Serial)?;
        assert_eq!(first, second);

        let other = Image::<u8, 3>::from_size_val([4, 6].into(), 0)?;
        let mut other_dst = other.clone();
        let res = box_blur_with_scratch(
            &other,
            &mut other_dst,
            1,
            1,
            &mut scratch,
            ExecutionStrategy::Serial,
        );
        assert_eq!(res, Err(ImageError::InvalidImageSize(4, 6, 6, 4)));
        Ok(())
    }

    #[test]
    fn test_box_blur_size_mismatch_leaves_dst() -> Result<(), ImageError> {
        let img = Image::<u8, 3>::from_size_val([4, 4].into(), 10)?;
        let mut dst = Image::<u8, 3>::from_size_val([5, 4].into(), 1)?;
        assert!(box_blur(&img, &mut dst, 1, 1).is_err());
        assert!(dst.as_slice().iter().all(|&v| v == 1));
        Ok(())
    }
}
