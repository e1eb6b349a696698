//! Image decode dispatch.
//!
//! Embedded images arrive as raw response bodies. PNG goes through the
//! `png` crate; uncompressed BMP is decoded by hand. Everything else is
//! a [`MarkletError::Decode`].

use std::io::Cursor;

use marklet_types::error::{MarkletError, Result};

/// Decoded image data (RGBA pixels).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, 4 bytes per pixel.
    pub pixels: Vec<u8>,
}

/// Image format detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Bmp,
    Jpeg,
    Gif,
    Unknown,
}

/// Detect image format from the first few bytes.
pub fn detect_format(data: &[u8]) -> ImageFormat {
    if data.len() < 4 {
        return ImageFormat::Unknown;
    }

    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        ImageFormat::Png
    } else if data.starts_with(b"BM") {
        ImageFormat::Bmp
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ImageFormat::Jpeg
    } else if data.starts_with(b"GIF8") {
        ImageFormat::Gif
    } else {
        ImageFormat::Unknown
    }
}

/// Decode an image from raw bytes.
pub fn decode_image(data: &[u8]) -> Result<DecodedImage> {
    match detect_format(data) {
        ImageFormat::Png => decode_png(data),
        ImageFormat::Bmp => decode_bmp(data),
        format => Err(MarkletError::Decode(format!(
            "unsupported image format: {format:?}"
        ))),
    }
}

fn decode_png(data: &[u8]) -> Result<DecodedImage> {
    let png_err = |e: png::DecodingError| MarkletError::Decode(format!("png: {e}"));

    let mut decoder = png::Decoder::new(Cursor::new(data));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(png_err)?;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).map_err(png_err)?;
    buf.truncate(info.buffer_size());

    let pixels = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Indexed => {
            return Err(MarkletError::Decode(
                "png: palette was not expanded".to_string(),
            ));
        },
    };

    Ok(DecodedImage {
        width: info.width,
        height: info.height,
        pixels,
    })
}

/// Decode a BMP image (uncompressed 24-bit or 32-bit).
fn decode_bmp(data: &[u8]) -> Result<DecodedImage> {
    let bad = |msg: &str| MarkletError::Decode(format!("bmp: {msg}"));

    if data.len() < 54 || &data[0..2] != b"BM" {
        return Err(bad("truncated header"));
    }

    let pixel_offset = le_u32(data, 10) as usize;
    let width = le_u32(data, 18) as i32;
    let height = le_u32(data, 22) as i32;
    let bpp = u16::from_le_bytes([data[28], data[29]]);
    let compression = le_u32(data, 30);

    if width <= 0 || height == 0 {
        return Err(bad("zero-sized image"));
    }
    if compression != 0 {
        return Err(bad("compressed bitmaps are not supported"));
    }
    if bpp != 24 && bpp != 32 {
        return Err(bad("only 24 and 32 bits per pixel are supported"));
    }

    let w = width.unsigned_abs();
    let abs_h = height.unsigned_abs();
    let bottom_up = height > 0;
    let bytes_per_pixel = usize::from(bpp / 8);

    // Rows are padded to a 4-byte boundary; the last one may end at the
    // file end. Pixel data must fit in `data` before anything is allocated.
    let line_bytes = (w as usize)
        .checked_mul(bytes_per_pixel)
        .ok_or_else(|| bad("image too large"))?;
    let row_size = line_bytes.div_ceil(4) * 4;
    let pixel_end = row_size
        .checked_mul(abs_h as usize - 1)
        .and_then(|n| n.checked_add(line_bytes))
        .and_then(|n| n.checked_add(pixel_offset))
        .filter(|&end| end <= data.len())
        .ok_or_else(|| bad("pixel data truncated"))?;
    let pixel_data = &data[pixel_offset..pixel_end];

    let mut pixels = Vec::with_capacity(w as usize * abs_h as usize * 4);
    for row in 0..abs_h as usize {
        let src_row = if bottom_up { abs_h as usize - 1 - row } else { row };
        let start = src_row * row_size;
        // Stored as BGR(A).
        for px in pixel_data[start..start + line_bytes].chunks_exact(bytes_per_pixel) {
            let alpha = if bpp == 32 { px[3] } else { 255 };
            pixels.extend_from_slice(&[px[2], px[1], px[0], alpha]);
        }
    }

    Ok(DecodedImage {
        width: w,
        height: abs_h,
        pixels,
    })
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}
