// src/services/image_normalizer.rs
// DOCUMENTATION: Single-image normalization
// PURPOSE: Decode an uploaded image, bound its width, re-encode it and store it

use crate::errors::RentalError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Widest image we store; larger uploads are scaled down to this width
pub const MAX_IMAGE_WIDTH: u32 = 1200;

/// Quality used when re-encoding JPEG uploads
pub const JPEG_QUALITY: u8 = 80;

/// Encodings accepted for rental images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedFormat {
    Jpeg,
    Png,
}

impl NormalizedFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            NormalizedFormat::Jpeg => "jpg",
            NormalizedFormat::Png => "png",
        }
    }
}

/// Identify the encoding of an upload from its magic bytes
/// DOCUMENTATION: Unrecognizable bytes are a decode failure; recognized but
/// unaccepted encodings (GIF, WebP, ...) are `UnsupportedFormat`
pub fn detect_format(bytes: &[u8]) -> Result<NormalizedFormat, RentalError> {
    let format = image::guess_format(bytes)
        .map_err(|e| RentalError::DecodeError(format!("unrecognized image data: {}", e)))?;

    match format {
        ImageFormat::Jpeg => Ok(NormalizedFormat::Jpeg),
        ImageFormat::Png => Ok(NormalizedFormat::Png),
        other => Err(RentalError::UnsupportedFormat(format!("{:?}", other).to_lowercase())),
    }
}

/// Dimensions after bounding the width to MAX_IMAGE_WIDTH
/// DOCUMENTATION: Aspect ratio is preserved and narrower images are never upscaled
pub fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_IMAGE_WIDTH {
        return (width, height);
    }

    let scaled = (u64::from(height) * u64::from(MAX_IMAGE_WIDTH) + u64::from(width) / 2)
        / u64::from(width);

    (MAX_IMAGE_WIDTH, scaled.clamp(1, u64::from(u32::MAX)) as u32)
}

/// Decode, resize and re-encode an image entirely in memory
pub fn normalize_bytes(bytes: &[u8]) -> Result<(NormalizedFormat, Vec<u8>), RentalError> {
    let format = detect_format(bytes)?;

    let decoded = image::load_from_memory_with_format(
        bytes,
        match format {
            NormalizedFormat::Jpeg => ImageFormat::Jpeg,
            NormalizedFormat::Png => ImageFormat::Png,
        },
    )
    .map_err(|e| RentalError::DecodeError(e.to_string()))?;

    let (width, height) = decoded.dimensions();
    let (target_width, target_height) = target_dimensions(width, height);

    let resized = if (target_width, target_height) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_width, target_height, FilterType::Lanczos3)
    };

    let encoded = encode(&resized, format)?;
    Ok((format, encoded))
}

/// Normalize one image and write it next to `destination_stem`
/// DOCUMENTATION: The extension is chosen from the detected format, so the
/// written path is returned. The parent directory must already exist.
/// Nothing is written unless decoding and encoding both succeeded.
pub fn normalize_image(bytes: &[u8], destination_stem: &Path) -> Result<PathBuf, RentalError> {
    let (format, encoded) = normalize_bytes(bytes)?;
    let destination = destination_stem.with_extension(format.extension());

    std::fs::write(&destination, &encoded).map_err(|e| {
        log::error!("Failed to write image {}: {}", destination.display(), e);
        RentalError::IoError(format!("failed to write {}: {}", destination.display(), e))
    })?;

    log::debug!(
        "Normalized image written to {} ({} bytes)",
        destination.display(),
        encoded.len()
    );
    Ok(destination)
}

fn encode(image: &DynamicImage, format: NormalizedFormat) -> Result<Vec<u8>, RentalError> {
    let mut buf = Vec::new();
    match format {
        NormalizedFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            encoder
                .encode_image(&image.to_rgb8())
                .map_err(|e| RentalError::IoError(format!("failed to encode jpeg: {}", e)))?;
        }
        NormalizedFormat::Png => {
            image
                .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
                .map_err(|e| RentalError::IoError(format!("failed to encode png: {}", e)))?;
        }
    }
    Ok(buf)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    pub(crate) fn sample_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, 90)
            .encode_image(&sample_image(width, height).to_rgb8())
            .unwrap();
        buf
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        sample_image(width, height)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_target_dimensions_bounds_width() {
        assert_eq!(target_dimensions(2400, 1600), (1200, 800));
        assert_eq!(target_dimensions(1201, 1), (1200, 1));
        assert_eq!(target_dimensions(5000, 100), (1200, 24));
    }

    #[test]
    fn test_target_dimensions_never_upscales() {
        assert_eq!(target_dimensions(800, 600), (800, 600));
        assert_eq!(target_dimensions(1200, 900), (1200, 900));
    }

    #[test]
    fn test_wide_jpeg_is_resized() {
        let dir = tempfile::tempdir().unwrap();
        let written = normalize_image(&jpeg_bytes(2400, 1600), &dir.path().join("wide")).unwrap();

        assert_eq!(written.extension().unwrap(), "jpg");
        assert_eq!(image::image_dimensions(&written).unwrap(), (1200, 800));
    }

    #[test]
    fn test_png_stays_png() {
        let dir = tempfile::tempdir().unwrap();
        let written = normalize_image(&png_bytes(300, 200), &dir.path().join("small")).unwrap();

        assert_eq!(written.extension().unwrap(), "png");
        let bytes = std::fs::read(&written).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        assert_eq!(image::image_dimensions(&written).unwrap(), (300, 200));
    }

    #[test]
    fn test_corrupt_bytes_fail_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let result = normalize_image(b"definitely not an image", &dir.path().join("bad"));

        assert!(matches!(result, Err(RentalError::DecodeError(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_truncated_jpeg_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = jpeg_bytes(64, 64);
        bytes.truncate(40);

        let result = normalize_image(&bytes, &dir.path().join("truncated"));
        assert!(matches!(result, Err(RentalError::DecodeError(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_gif_is_unsupported() {
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
        assert!(matches!(
            detect_format(gif),
            Err(RentalError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("missing").join("image");
        let result = normalize_image(&jpeg_bytes(10, 10), &stem);

        assert!(matches!(result, Err(RentalError::IoError(_))));
    }
}
