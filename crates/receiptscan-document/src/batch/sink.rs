// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where batch results go.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};
use receiptscan_core::PathsConfig;
use receiptscan_core::error::Result;
use tracing::{debug, info};

use crate::raster::ImageProcessor;

/// Destination for finished images.
pub trait ImageSink: Send + Sync {
    /// Persist `image` under `name`, returning where it went.
    fn store(&self, name: &str, image: &GrayImage) -> Result<PathBuf>;
}

/// Writes each result into one directory under its input file name.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageSink for DirectorySink {
    fn store(&self, name: &str, image: &GrayImage) -> Result<PathBuf> {
        let path = self.root.join(name);
        ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(image.clone())).save(&path)?;
        debug!(path = %path.display(), "Result written");
        Ok(path)
    }
}

/// Create the input and output directories if they do not exist yet.
pub fn prepare_directories(paths: &PathsConfig) -> Result<()> {
    for dir in [&paths.input_dir, &paths.output_dir] {
        if !dir.is_dir() {
            std::fs::create_dir_all(dir)?;
            info!(path = %dir.display(), "Directory created");
        }
    }
    Ok(())
}
