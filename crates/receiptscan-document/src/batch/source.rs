// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where batch input images come from.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use receiptscan_core::error::Result;
use tracing::{debug, info, instrument};

use crate::raster::ImageProcessor;

/// A collection of named input images.
///
/// Implementations must be shareable across worker threads.
pub trait ImageSource: Send + Sync {
    /// Names of every decodable image, sorted.
    fn list(&self) -> Result<Vec<String>>;

    /// Decode the image called `name`.
    fn load(&self, name: &str) -> Result<DynamicImage>;

    /// Where `name` lives, for reporting.
    fn locate(&self, name: &str) -> PathBuf;
}

/// Images stored as files directly inside one directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageSource for DirectorySource {
    /// Regular files whose content decodes as an image. The extension is
    /// never consulted; subdirectories are not descended into.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                debug!(path = %entry.path().display(), "Skipping non-UTF-8 file name");
                continue;
            };
            match ImageProcessor::probe(entry.path()) {
                Ok(_) => names.push(name),
                Err(err) => debug!(%name, error = %err, "Skipping non-image file"),
            }
        }
        names.sort();
        info!(count = names.len(), "Input images listed");
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<DynamicImage> {
        Ok(ImageProcessor::open(self.locate(name))?.into_dynamic())
    }

    fn locate(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
