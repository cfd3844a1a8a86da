// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic views: the edge map and the chosen contour drawn over the
// downscaled input.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use receiptscan_core::error::Result;
use tracing::{debug, warn};

use crate::raster::ImageProcessor;
use crate::scan::{Contour, Intermediates};

const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Writes `<stem>.edges.png` and `<stem>.contour.png` for each scanned image.
#[derive(Debug, Clone)]
pub struct DebugWriter {
    dir: PathBuf,
}

impl DebugWriter {
    /// Create the directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write both views. Failures are logged and otherwise ignored; a
    /// diagnostic that cannot be written never skips the image.
    pub fn write(&self, name: &str, intermediates: &Intermediates, contour: &Contour) {
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name);

        let edges_path = self.dir.join(format!("{stem}.edges.png"));
        let edges = DynamicImage::ImageLuma8(intermediates.edges.clone());
        self.save(edges, &edges_path);

        let overlay_path = self.dir.join(format!("{stem}.contour.png"));
        let overlay = draw_contour(&intermediates.downscaled, contour);
        self.save(DynamicImage::ImageRgb8(overlay), &overlay_path);
    }

    fn save(&self, image: DynamicImage, path: &Path) {
        match ImageProcessor::from_dynamic(image).save(path) {
            Ok(()) => debug!(path = %path.display(), "Diagnostic written"),
            Err(err) => warn!(path = %path.display(), error = %err, "Failed to write diagnostic"),
        }
    }
}

/// `image` as RGB with the closed polygon `contour` drawn in red.
pub fn draw_contour(image: &DynamicImage, contour: &Contour) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let points = contour.points();
    for (i, start) in points.iter().enumerate() {
        let end = points[(i + 1) % points.len()];
        draw_line_segment_mut(
            &mut canvas,
            (start.x as f32, start.y as f32),
            (end.x as f32, end.y as f32),
            OVERLAY_COLOR,
        );
    }
    canvas
}
