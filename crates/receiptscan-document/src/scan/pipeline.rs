// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The receipt scanner: downscale, extract edges, select the boundary,
// rectify and normalize one image.

use std::path::Path;

use image::{DynamicImage, GrayImage};
use receiptscan_core::PipelineConfig;
use receiptscan_core::error::Result;
use tracing::{info, instrument};

use super::contour::{ContourSelection, ContourSelector};
use super::deadline::Deadline;
use super::edges::EdgeExtractor;
use super::enhance::ScanEnhancer;
use super::geometry::QuadCorners;
use super::rectify::rectify;
use crate::raster::{ImageProcessor, downscale_to_height};

/// Working images kept for diagnostics.
#[derive(Debug, Clone)]
pub struct Intermediates {
    pub downscaled: DynamicImage,
    pub edges: GrayImage,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// The rectified, normalized receipt.
    pub image: GrayImage,
    /// `target_height / original_height`.
    pub resize_ratio: f64,
    /// The boundary in downscaled coordinates.
    pub selection: ContourSelection,
    /// The boundary corners in original coordinates.
    pub quad: QuadCorners,
    /// Present when `keep_intermediates` is enabled.
    pub intermediates: Option<Intermediates>,
}

/// Runs the five pipeline stages on one image at a time.
///
/// Holds no per-image state, so one scanner can be shared by many threads.
#[derive(Debug, Clone)]
pub struct ReceiptScanner {
    config: PipelineConfig,
    edges: EdgeExtractor,
    selector: ContourSelector,
}

impl ReceiptScanner {
    /// Validate `config` and build the stages from it.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            edges: EdgeExtractor::from_config(&config),
            selector: ContourSelector::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn scan(&self, image: &DynamicImage) -> Result<ScanResult> {
        self.scan_with_deadline(image, &Deadline::unbounded())
    }

    /// Scan one image, checking `deadline` between stages.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn scan_with_deadline(&self, image: &DynamicImage, deadline: &Deadline) -> Result<ScanResult> {
        let downscaled = downscale_to_height(image, self.config.target_height)?;
        deadline.check("downscale")?;

        let edges = self.edges.extract(&downscaled.image);
        deadline.check("edges")?;

        let selection = self.selector.select_with_deadline(&edges, deadline)?;
        deadline.check("contour_selection")?;

        let rectified = rectify(image, selection.contour(), downscaled.ratio)?;
        deadline.check("rectify")?;

        let output = ScanEnhancer::from_dynamic(&rectified.image)
            .normalize(&self.config)
            .into_gray();
        deadline.check("normalize")?;

        info!(
            contour = ?selection.kind(),
            out_w = output.width(),
            out_h = output.height(),
            elapsed_ms = deadline.elapsed().as_millis() as u64,
            "Receipt scanned"
        );

        let intermediates = self.config.keep_intermediates.then(|| Intermediates {
            downscaled: downscaled.image,
            edges,
        });
        Ok(ScanResult {
            image: output,
            resize_ratio: downscaled.ratio,
            selection,
            quad: rectified.quad,
            intermediates,
        })
    }

    /// Decode `input`, scan it and write the result to `output`.
    #[instrument(skip_all, fields(input = %input.as_ref().display()))]
    pub fn scan_file(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<ScanResult> {
        let processor = ImageProcessor::open(input)?;
        let result = self.scan(processor.as_dynamic())?;
        ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(result.image.clone())).save(output)?;
        Ok(result)
    }
}
