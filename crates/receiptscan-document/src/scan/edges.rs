// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge extraction: grayscale, Gaussian blur, dilation, closing and Canny.

use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{Mask, grayscale_close, grayscale_dilate};
use receiptscan_core::PipelineConfig;
use tracing::{debug, instrument};

/// Turns a (downscaled) photograph into a binary edge map.
///
/// Dilation and closing run before edge detection so that faint or broken
/// receipt borders merge into closed boundaries.
#[derive(Debug, Clone, Copy)]
pub struct EdgeExtractor {
    blur_sigma: f32,
    morph_radius: u8,
    canny_low: f32,
    canny_high: f32,
}

impl EdgeExtractor {
    /// Derive blur sigma and structuring element radius from the kernel sizes.
    ///
    /// Assumes a validated configuration: odd kernels, morphology kernel of
    /// at most 511.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            blur_sigma: sigma_for_kernel(config.blur_kernel),
            morph_radius: (config.morph_kernel / 2).min(u8::MAX as u32) as u8,
            canny_low: config.canny_low,
            canny_high: config.canny_high,
        }
    }

    /// Edge map with the same dimensions as `image`: 255 on edges, 0 elsewhere.
    ///
    /// `canny` smooths its input again with a fixed sigma of 1.4 before
    /// taking gradients, so the effective blur is stronger than
    /// `blur_kernel` alone suggests.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn extract(&self, image: &DynamicImage) -> GrayImage {
        let gray = image.to_luma8();
        let blurred = gaussian_blur_f32(&gray, self.blur_sigma);

        let mask = Mask::square(self.morph_radius);
        let dilated = grayscale_dilate(&blurred, &mask);
        let closed = grayscale_close(&dilated, &mask);

        let edges = canny(&closed, self.canny_low, self.canny_high);
        debug!(
            sigma = self.blur_sigma,
            radius = self.morph_radius,
            edge_pixels = edges.pixels().filter(|p| p.0[0] > 0).count(),
            "Edge map extracted"
        );
        edges
    }
}

/// Gaussian sigma matching a `kernel` x `kernel` blur window
/// (`0.3 * ((k - 1) / 2 - 1) + 0.8`).
fn sigma_for_kernel(kernel: u32) -> f32 {
    let half = (kernel.max(1) as f32 - 1.0) * 0.5;
    (0.3 * (half - 1.0) + 0.8).max(0.1)
}
