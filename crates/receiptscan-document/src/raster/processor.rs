// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, probe, downscale and encode in-memory images
// using the `image` crate.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use receiptscan_core::error::{Result, ScanError};
use tracing::{debug, info, instrument};

/// A downscaled working copy and the factor it was scaled by.
#[derive(Debug, Clone)]
pub struct Downscaled {
    pub image: DynamicImage,
    /// `target_height / original_height`; always finite and greater than 0.
    pub ratio: f64,
}

/// Wrapper around a single decoded image.
///
/// ```ignore
/// let processor = ImageProcessor::open("receipt.jpg")?;
/// let small = processor.downscale_to_height(500)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode an image file. The format is sniffed from the content, not the
    /// file extension.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = sniffing_reader(path)?
            .decode()
            .map_err(|err| ScanError::Decode(format!("failed to decode {}: {}", path.display(), err)))?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Check that `path` holds a decodable image without decoding the pixels.
    ///
    /// Returns the image dimensions.
    pub fn probe(path: impl AsRef<Path>) -> Result<(u32, u32)> {
        let path = path.as_ref();
        sniffing_reader(path)?
            .into_dimensions()
            .map_err(|err| ScanError::Decode(format!("{} is not a readable image: {}", path.display(), err)))
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Scale the image so its height becomes `target_height`; see
    /// [`downscale_to_height`].
    pub fn downscale_to_height(&self, target_height: u32) -> Result<Downscaled> {
        downscale_to_height(&self.image, target_height)
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Write the image to a file. The format follows the file extension and
    /// falls back to PNG when the extension is not recognised.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
        self.image.save_with_format(path, format).map_err(|err| {
            ScanError::Encode(format!(
                "failed to save image to {}: {}",
                path.display(),
                err
            ))
        })
    }
}

/// Scale the image so its height becomes `target_height`, preserving the
/// aspect ratio.
///
/// Shrinking uses area averaging; enlarging uses a triangle filter. Both
/// new dimensions are rounded and at least one pixel.
#[instrument(skip(image), fields(from_w = image.width(), from_h = image.height()))]
pub fn downscale_to_height(image: &DynamicImage, target_height: u32) -> Result<Downscaled> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(ScanError::InvalidDimensions { width, height });
    }
    if target_height == 0 {
        return Err(ScanError::InvalidDimensions {
            width,
            height: target_height,
        });
    }

    let ratio = target_height as f64 / height as f64;
    let new_w = ((width as f64 * ratio).round() as u32).max(1);
    let new_h = ((height as f64 * ratio).round() as u32).max(1);

    let scaled = if (new_w, new_h) == (width, height) {
        image.clone()
    } else if new_h < height {
        image.thumbnail_exact(new_w, new_h)
    } else {
        image.resize_exact(new_w, new_h, FilterType::Triangle)
    };
    debug!(new_w, new_h, ratio, "Downscale complete");
    Ok(Downscaled {
        image: scaled,
        ratio,
    })
}

fn sniffing_reader(path: &Path) -> Result<ImageReader<BufReader<File>>> {
    let file = File::open(path)
        .map_err(|err| ScanError::Decode(format!("failed to open {}: {}", path.display(), err)))?;
    ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(|err| ScanError::Decode(format!("failed to read {}: {}", path.display(), err)))
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| ScanError::Encode(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
