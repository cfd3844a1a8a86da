// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement: sharpening, binarization, percentile contrast stretch
// and orientation fix-up for rectified receipt images.

use image::imageops;
use image::{DynamicImage, GrayImage, Luma};
use receiptscan_core::{PipelineConfig, ThresholdMode};
use tracing::{debug, info, instrument};

/// 3x3 sharpening kernel: centre weight 9, neighbours -1 (sums to 1).
const SHARPEN_KERNEL: [[i32; 3]; 3] = [[-1, -1, -1], [-1, 9, -1], [-1, -1, -1]];

/// Turns a rectified receipt into a clean, high-contrast grayscale image.
///
/// Each method consumes `self` and returns the transformed enhancer so the
/// steps chain:
///
/// ```ignore
/// let output = ScanEnhancer::from_dynamic(&rectified)
///     .sharpen()
///     .binarize_otsu()
///     .stretch_percentiles(4.5, 95.0)
///     .rotate_quarter_turns(1)
///     .into_gray();
/// ```
pub struct ScanEnhancer {
    /// The working image, always single-channel.
    image: GrayImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    /// Convert any image to grayscale and wrap it.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            image: image.to_luma8(),
        }
    }

    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    // -- Pipeline -------------------------------------------------------------

    /// Run every normalization step the configuration asks for:
    ///
    /// 1. Sharpen (optional)
    /// 2. Binarize (Otsu or local mean)
    /// 3. Percentile contrast stretch
    /// 4. Quarter-turn rotation
    #[instrument(skip_all, fields(width = self.image.width(), height = self.image.height()))]
    pub fn normalize(self, config: &PipelineConfig) -> Self {
        info!(threshold = ?config.threshold, sharpen = config.sharpen, "Normalizing scan");

        let sharpened = if config.sharpen { self.sharpen() } else { self };
        let binary = match config.threshold {
            ThresholdMode::Otsu => sharpened.binarize_otsu(),
            ThresholdMode::LocalMean => {
                sharpened.binarize(config.local_block_radius, config.local_offset)
            }
        };
        binary
            .stretch_percentiles(config.low_percentile, config.high_percentile)
            .rotate_quarter_turns(config.quarter_turns)
    }

    // -- Sharpening -----------------------------------------------------------

    /// Convolve with [`SHARPEN_KERNEL`], replicating edge pixels at the border.
    pub fn sharpen(self) -> Self {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return self;
        }
        let src = &self.image;
        let sample = |x: i64, y: i64| -> i32 {
            let cx = x.clamp(0, width as i64 - 1) as u32;
            let cy = y.clamp(0, height as i64 - 1) as u32;
            src.get_pixel(cx, cy).0[0] as i32
        };

        let output = GrayImage::from_fn(width, height, |x, y| {
            let mut acc = 0i32;
            for (dy, row) in SHARPEN_KERNEL.iter().enumerate() {
                for (dx, weight) in row.iter().enumerate() {
                    acc += weight * sample(x as i64 + dx as i64 - 1, y as i64 + dy as i64 - 1);
                }
            }
            Luma([acc.clamp(0, 255) as u8])
        });
        debug!("Sharpening complete");
        Self { image: output }
    }

    // -- Binarization ---------------------------------------------------------

    /// Apply adaptive thresholding to produce a black-and-white image.
    ///
    /// Uses a local mean approach: for each pixel, the threshold is the mean
    /// intensity within a `block_radius` neighbourhood, minus a constant `c`.
    /// Pixels darker than the local threshold become black; others become white.
    #[instrument(skip(self))]
    pub fn binarize(self, block_radius: u32, c: i32) -> Self {
        info!(block_radius, c, "Applying adaptive binarization");

        let gray = &self.image;
        let (width, height) = gray.dimensions();

        // Compute the integral image for fast local mean calculation.
        let integral = compute_integral_image(gray);

        let output = GrayImage::from_fn(width, height, |x, y| {
            let local_mean = region_mean(&integral, width, height, x, y, block_radius);
            let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
            let pixel_val = gray.get_pixel(x, y).0[0];
            Luma([if pixel_val < threshold { 0u8 } else { 255u8 }])
        });

        debug!("Binarization complete");
        Self { image: output }
    }

    /// Global binarization at the Otsu level.
    ///
    /// Thresholds inverted (above the level becomes 0) and then flips every
    /// bit, so pixels strictly above the level end up white and text ends up
    /// black regardless of the original lighting.
    #[instrument(skip(self))]
    pub fn binarize_otsu(self) -> Self {
        let threshold = otsu_threshold(&self.image);
        info!(threshold, "Applying Otsu binarization");

        let mut output = GrayImage::from_fn(self.image.width(), self.image.height(), |x, y| {
            let val = self.image.get_pixel(x, y).0[0];
            Luma([if val > threshold { 0u8 } else { 255u8 }])
        });
        imageops::invert(&mut output);
        Self { image: output }
    }

    // -- Contrast -------------------------------------------------------------

    /// Clip to the `low`..`high` percentile range and rescale it to 0..=255.
    ///
    /// Percentiles interpolate linearly between order statistics. If both
    /// percentiles land on the same value the image is clipped only.
    #[instrument(skip(self))]
    pub fn stretch_percentiles(self, low: f64, high: f64) -> Self {
        let mut histogram = [0u64; 256];
        for pixel in self.image.pixels() {
            histogram[pixel.0[0] as usize] += 1;
        }
        let (Some(lo), Some(hi)) = (percentile(&histogram, low), percentile(&histogram, high))
        else {
            return self;
        };
        debug!(lo, hi, "Percentile range computed");

        let span = hi - lo;
        let mut output = self.image;
        for pixel in output.pixels_mut() {
            let clipped = (pixel.0[0] as f64).clamp(lo.min(hi), hi.max(lo));
            let value = if span > 0.0 {
                (clipped - lo) / span * 255.0
            } else {
                clipped
            };
            pixel.0[0] = value.round().clamp(0.0, 255.0) as u8;
        }
        Self { image: output }
    }

    // -- Orientation ----------------------------------------------------------

    /// Rotate by `turns` counter-clockwise quarter turns.
    pub fn rotate_quarter_turns(self, turns: u8) -> Self {
        let image = match turns % 4 {
            1 => imageops::rotate270(&self.image),
            2 => imageops::rotate180(&self.image),
            3 => imageops::rotate90(&self.image),
            _ => self.image,
        };
        debug!(turns, width = image.width(), height = image.height(), "Rotation applied");
        Self { image }
    }
}

// -- Statistics helpers -------------------------------------------------------

/// The `p`-th percentile (0..=100) of the pixel values counted in `histogram`,
/// or `None` for an empty histogram.
fn percentile(histogram: &[u64; 256], p: f64) -> Option<f64> {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return None;
    }
    let rank = p.clamp(0.0, 100.0) / 100.0 * (total - 1) as f64;
    let below = rank.floor() as u64;
    let frac = rank - below as f64;

    let lower = order_statistic(histogram, below);
    let upper = order_statistic(histogram, (below + 1).min(total - 1));
    Some(lower + frac * (upper - lower))
}

/// Value of the `k`-th smallest pixel (0-based).
fn order_statistic(histogram: &[u64; 256], k: u64) -> f64 {
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > k {
            return value as f64;
        }
    }
    255.0
}

// -- Integral image helpers ---------------------------------------------------

/// Compute the integral (summed-area table) of a grayscale image.
///
/// `integral[y * (width+1) + x]` contains the sum of all pixel values in the
/// rectangle [0, 0) to (x, y) (exclusive on both axes). The table has
/// dimensions `(width+1) x (height+1)` with a zero-padded border.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Compute the mean pixel value within a square region centred on (cx, cy)
/// with the given radius, using the precomputed integral image.
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    // Clamp the region to image bounds.
    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = (cx as usize + radius as usize + 1).min(img_width as usize);
    let y2 = (cy as usize + radius as usize + 1).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    // Summed-area table lookup: S = I[y2][x2] - I[y1][x2] - I[y2][x1] + I[y1][x1]
    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the threshold value that maximises the between-class variance of
/// the pixels at or below it and the pixels above it.
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let mut sum_total: f64 = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn split(width: u32, height: u32, left: u8, right: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| Luma([if x < width / 2 { left } else { right }]))
    }

    #[test]
    fn otsu_separates_a_bimodal_image() {
        let gray = split(40, 20, 40, 200);
        let threshold = otsu_threshold(&gray);
        assert!((40..200).contains(&threshold), "threshold {threshold}");

        let out = ScanEnhancer::from_gray(gray).binarize_otsu().into_gray();
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(39, 19).0[0], 255);
    }

    #[test]
    fn otsu_keeps_a_white_page_white() {
        let gray = GrayImage::from_pixel(30, 30, Luma([255u8]));
        let out = ScanEnhancer::from_gray(gray).binarize_otsu().into_gray();
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn sharpen_preserves_flat_regions_and_boosts_steps() {
        let flat = ScanEnhancer::from_gray(GrayImage::from_pixel(10, 10, Luma([120u8])))
            .sharpen()
            .into_gray();
        assert!(flat.pixels().all(|p| p.0[0] == 120));

        let step = ScanEnhancer::from_gray(split(10, 10, 100, 150)).sharpen().into_gray();
        assert!(step.get_pixel(4, 5).0[0] < 100);
        assert!(step.get_pixel(5, 5).0[0] > 150);
        assert_eq!(step.get_pixel(0, 0).0[0], 100);
    }

    #[test]
    fn local_mean_marks_dark_spots() {
        let mut gray = GrayImage::from_pixel(50, 50, Luma([220u8]));
        for y in 20..25 {
            for x in 20..25 {
                gray.put_pixel(x, y, Luma([30u8]));
            }
        }
        let out = ScanEnhancer::from_gray(gray).binarize(15, 10).into_gray();
        assert_eq!(out.get_pixel(22, 22).0[0], 0);
        assert_eq!(out.get_pixel(2, 2).0[0], 255);
    }

    #[test]
    fn stretch_is_idempotent_on_a_normalized_image() {
        let gray = split(20, 10, 0, 255);
        let out = ScanEnhancer::from_gray(gray.clone())
            .stretch_percentiles(4.5, 95.0)
            .into_gray();
        assert_eq!(out, gray);
    }

    #[test]
    fn stretch_fills_the_full_range() {
        let gray = GrayImage::from_fn(101, 1, |x, _| Luma([50 + x as u8]));
        let out = ScanEnhancer::from_gray(gray)
            .stretch_percentiles(4.5, 95.0)
            .into_gray();
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(100, 0).0[0], 255);
    }

    #[test]
    fn stretch_of_a_uniform_image_only_clips() {
        let gray = GrayImage::from_pixel(8, 8, Luma([77u8]));
        let out = ScanEnhancer::from_gray(gray.clone())
            .stretch_percentiles(4.5, 95.0)
            .into_gray();
        assert_eq!(out, gray);
    }

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let mut histogram = [0u64; 256];
        histogram[10] = 1;
        histogram[20] = 1;
        assert_eq!(percentile(&histogram, 50.0), Some(15.0));
        assert_eq!(percentile(&histogram, 0.0), Some(10.0));
        assert_eq!(percentile(&histogram, 100.0), Some(20.0));
        assert_eq!(percentile(&[0u64; 256], 50.0), None);
    }

    #[test]
    fn one_quarter_turn_is_counter_clockwise() {
        let mut gray = GrayImage::new(4, 2);
        gray.put_pixel(3, 0, Luma([255u8]));
        let out = ScanEnhancer::from_gray(gray).rotate_quarter_turns(1).into_gray();
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(out.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let gray = split(6, 3, 10, 240);
        let out = ScanEnhancer::from_gray(gray.clone()).rotate_quarter_turns(4).into_gray();
        assert_eq!(out, gray);
    }

    #[test]
    fn normalize_turns_a_blank_page_white_and_upright() {
        let page = DynamicImage::ImageLuma8(GrayImage::from_pixel(60, 40, Luma([250u8])));
        let out = ScanEnhancer::from_dynamic(&page)
            .normalize(&PipelineConfig::default())
            .into_gray();
        assert_eq!(out.dimensions(), (40, 60));
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }
}
