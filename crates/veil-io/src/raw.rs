use std::io::Write;

use veil_image::Image;

use crate::error::IoError;

/// Describe the raw layout of an rgb8 image as `WIDTHxHEIGHT:rgb`.
///
/// This is the format string screen lockers take when reading raw frames from a pipe.
///
/// # Example
///
/// ```
/// use veil_image::Image;
/// use veil_io::raw::raw_format_rgb8;
///
/// let image = Image::<u8, 3>::from_size_val([1920, 1080].into(), 0).unwrap();
/// assert_eq!(raw_format_rgb8(&image), "1920x1080:rgb");
/// ```
pub fn raw_format_rgb8(image: &Image<u8, 3>) -> String {
    format!("{}x{}:rgb", image.width(), image.height())
}

/// Write the interleaved rgb8 samples of an image, without any header.
///
/// # Arguments
///
/// - `writer` - The destination, for example a file or the stdin of another process.
/// - `image` - The image to write.
pub fn write_image_raw_rgb8<W: Write>(mut writer: W, image: &Image<u8, 3>) -> Result<(), IoError> {
    writer.write_all(image.as_slice())?;
    writer.flush()?;
    Ok(())
}
