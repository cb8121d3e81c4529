use std::{fs, fs::File, io::BufWriter, path::Path};

use png::{BitDepth, ColorType, Compression, Decoder, Encoder, Transformations};
use veil_image::{Image, ImageSize};

use crate::error::IoError;

/// Read a PNG image as three channels (rgb8).
///
/// Palette and 16-bit images are expanded to 8 bits, alpha is dropped and
/// grayscale is replicated to the three channels.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
///
/// # Returns
///
/// A RGB image with three channels (rgb8).
pub fn read_image_png_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let file_path = file_path.as_ref();
    check_png_path(file_path)?;
    let bytes = fs::read(file_path)?;
    decode_image_png_rgb8(&bytes)
}

/// Decode a PNG image as three channels (rgb8) from raw bytes.
///
/// # Arguments
///
/// * `bytes` - Raw bytes of the png file.
pub fn decode_image_png_rgb8(bytes: &[u8]) -> Result<Image<u8, 3>, IoError> {
    let mut decoder = Decoder::new(bytes);
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);

    let mut reader = decoder
        .read_info()
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;
    buf.truncate(info.buffer_size());

    let size = ImageSize {
        width: info.width as usize,
        height: info.height as usize,
    };

    let rgb = match (info.color_type, info.bit_depth) {
        (ColorType::Rgb, BitDepth::Eight) => buf,
        (ColorType::Rgba, BitDepth::Eight) => buf
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect(),
        (ColorType::Grayscale, BitDepth::Eight) => buf.iter().flat_map(|&v| [v, v, v]).collect(),
        (ColorType::GrayscaleAlpha, BitDepth::Eight) => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0]])
            .collect(),
        (color, depth) => return Err(IoError::UnsupportedPngFormat(color, depth)),
    };

    Ok(Image::new(size, rgb)?)
}

/// Writes the given PNG _(rgb8)_ data to the given file path.
///
/// Uses fast compression, since the image is usually consumed right away.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The image containing the PNG image data.
pub fn write_image_png_rgb8(
    file_path: impl AsRef<Path>,
    image: &Image<u8, 3>,
) -> Result<(), IoError> {
    let file = File::create(file_path)?;
    encode_png_impl(BufWriter::new(file), image)
}

/// Encode the given image as an rgb8 PNG into a byte vector.
pub fn encode_image_png_rgb8(image: &Image<u8, 3>) -> Result<Vec<u8>, IoError> {
    let mut bytes = Vec::new();
    encode_png_impl(&mut bytes, image)?;
    Ok(bytes)
}

fn encode_png_impl<W: std::io::Write>(writer: W, image: &Image<u8, 3>) -> Result<(), IoError> {
    let mut encoder = Encoder::new(writer, image.width() as u32, image.height() as u32);
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(Compression::Fast);

    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    writer
        .write_image_data(image.as_slice())
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| IoError::PngEncodingError(e.to_string()))
}

// verify the file exists and carries a png extension
fn check_png_path(file_path: &Path) -> Result<(), IoError> {
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    match file_path.extension() {
        Some(extension) if extension.eq_ignore_ascii_case("png") => Ok(()),
        _ => Err(IoError::InvalidFileExtension(file_path.to_path_buf())),
    }
}
