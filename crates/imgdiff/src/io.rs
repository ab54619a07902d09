use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::qoi::QoiEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use imgdiff_core::Image;
use thiserror::Error;

/// Input problems that map to exit code 2.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("{}: unsupported image format (expected png, jpeg or qoi)", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("{}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// File extensions the codec reads and writes.
pub const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "qoi"];

pub const DEFAULT_JPEG_QUALITY: u8 = 90;
const PAD_COLOR: [u8; 4] = [255, 0, 255, 255];

/// Encoder settings for written images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Encoding {
    /// PNG compression level, 0..9.
    pub compression: u8,
    /// JPEG quality, 1..100.
    pub quality: u8,
}

impl Default for Encoding {
    fn default() -> Self {
        Self {
            compression: 0,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

fn format_for(path: &Path) -> Option<ImageFormat> {
    match ImageFormat::from_path(path).ok()? {
        f @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Qoi) => Some(f),
        _ => None,
    }
}

pub fn is_supported(path: &Path) -> bool {
    format_for(path).is_some()
}

/// Decode a PNG, JPEG or QOI file into RGBA8.
pub fn decode(path: &Path) -> Result<Image> {
    if !path.exists() {
        return Err(InputError::Missing(path.to_path_buf()).into());
    }
    if !is_supported(path) {
        return Err(InputError::UnsupportedFormat(path.to_path_buf()).into());
    }
    let rgba = image::open(path)
        .map_err(|source| InputError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (w, h) = rgba.dimensions();
    Image::from_raw(rgba.into_raw(), w, h)
        .with_context(|| format!("Failed to load {}", path.display()))
}

pub fn decode_bytes(bytes: &[u8]) -> Result<Image> {
    let rgba = image::load_from_memory(bytes)
        .context("Failed to decode image")?
        .to_rgba8();
    let (w, h) = rgba.dimensions();
    Ok(Image::from_raw(rgba.into_raw(), w, h)?)
}

/// Map the 0..9 level onto the encoder's presets.
fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

pub fn png_bytes(image: &Image, compression: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(
        Cursor::new(&mut buf),
        png_compression(compression),
        FilterType::Adaptive,
    )
    .write_image(
        image.data(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )
    .context("Failed to encode PNG")?;
    Ok(buf)
}

/// Write `image` as PNG, JPEG or QOI, chosen by extension. JPEG drops alpha.
pub fn encode(image: &Image, path: &Path, encoding: Encoding) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let bytes = match format_for(path) {
        Some(ImageFormat::Jpeg) => {
            let rgb: Vec<u8> = image
                .data()
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            let mut buf = Vec::new();
            JpegEncoder::new_with_quality(Cursor::new(&mut buf), encoding.quality)
                .write_image(&rgb, image.width(), image.height(), ExtendedColorType::Rgb8)
                .context("Failed to encode JPEG")?;
            buf
        }
        Some(ImageFormat::Qoi) => {
            let mut buf = Vec::new();
            QoiEncoder::new(Cursor::new(&mut buf))
                .write_image(
                    image.data(),
                    image.width(),
                    image.height(),
                    ExtendedColorType::Rgba8,
                )
                .context("Failed to encode QOI")?;
            buf
        }
        Some(_) => png_bytes(image, encoding.compression)?,
        None => return Err(InputError::UnsupportedFormat(path.to_path_buf()).into()),
    };
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// File contents as PNG: PNG files are passed through, anything else is
/// re-encoded.
pub fn read_as_png(path: &Path) -> Result<Vec<u8>> {
    if format_for(path) == Some(ImageFormat::Png) {
        return std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()));
    }
    png_bytes(&decode(path)?, 0)
}

/// Paste `src` onto a magenta canvas of `w x h`, anchored at top-left.
pub fn pad_to(src: &Image, w: u32, h: u32) -> Result<Image> {
    let mut canvas = Image::filled(w, h, PAD_COLOR)?;
    let row_bytes = src.width() as usize * 4;
    let stride = w as usize * 4;
    for (y, row) in src.data().chunks_exact(row_bytes).enumerate() {
        let start = y * stride;
        canvas.data_mut()[start..start + row_bytes].copy_from_slice(row);
    }
    Ok(canvas)
}
