// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration, loaded from and saved to YAML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{Result, ScanError};

/// Largest square structuring element the morphology stage accepts.
pub const MAX_MORPH_KERNEL: u32 = 511;

/// Complete scanner settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub paths: PathsConfig,
    pub pipeline: PipelineConfig,
    pub batch: BatchConfig,
}

/// Source and destination directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the receipt photographs.
    pub input_dir: PathBuf,
    /// Directory the rectified, binarized images are written to.
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data").join("origin_img"),
            output_dir: PathBuf::from("data").join("img"),
        }
    }
}

/// What the contour selector returns when no candidate simplifies to four
/// corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackShape {
    /// Corners of the minimum-area bounding rectangle of the largest candidate.
    BoundingBox,
    /// The simplified (non-quadrilateral) polygon of the largest candidate.
    Approximation,
}

/// Binarization strategy for the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Global Otsu threshold.
    Otsu,
    /// Local mean threshold over a square window.
    LocalMean,
}

/// Tunables for the five pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Height the contour search runs at.
    pub target_height: u32,
    /// Gaussian kernel size (odd).
    pub blur_kernel: u32,
    /// Square structuring element size for dilation and closing (odd).
    pub morph_kernel: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// How many of the largest contours are considered.
    pub max_candidates: usize,
    /// Polygon approximation tolerance as a fraction of the perimeter.
    pub approx_epsilon: f64,
    /// Look past the largest contour for a four-corner candidate. Off by
    /// default: only the largest contour is approximated.
    pub search_all_candidates: bool,
    pub fallback: FallbackShape,
    pub threshold: ThresholdMode,
    /// Window radius for [`ThresholdMode::LocalMean`].
    pub local_block_radius: u32,
    /// Offset subtracted from the local mean for [`ThresholdMode::LocalMean`].
    pub local_offset: i32,
    pub sharpen: bool,
    pub low_percentile: f64,
    pub high_percentile: f64,
    /// Counter-clockwise quarter turns applied to the final image.
    pub quarter_turns: u8,
    /// Keep the downscaled image and edge map in the scan result.
    pub keep_intermediates: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_height: 500,
            blur_kernel: 5,
            morph_kernel: 9,
            canny_low: 50.0,
            canny_high: 200.0,
            max_candidates: 10,
            approx_epsilon: 0.01,
            search_all_candidates: false,
            fallback: FallbackShape::BoundingBox,
            threshold: ThresholdMode::Otsu,
            local_block_radius: 15,
            local_offset: 10,
            sharpen: true,
            low_percentile: 4.5,
            high_percentile: 95.0,
            quarter_turns: 1,
            keep_intermediates: false,
        }
    }
}

impl PipelineConfig {
    /// Check every tunable, naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.target_height == 0 {
            return Err(invalid("pipeline.target_height must be greater than 0"));
        }
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(invalid("pipeline.blur_kernel must be a positive odd number"));
        }
        if self.morph_kernel == 0 || self.morph_kernel % 2 == 0 {
            return Err(invalid("pipeline.morph_kernel must be a positive odd number"));
        }
        if self.morph_kernel > MAX_MORPH_KERNEL {
            return Err(invalid(format!(
                "pipeline.morph_kernel must not exceed {MAX_MORPH_KERNEL}"
            )));
        }
        if !(self.canny_low >= 0.0 && self.canny_low <= self.canny_high) {
            return Err(invalid(
                "pipeline.canny_low must be non-negative and not above canny_high",
            ));
        }
        if self.max_candidates == 0 {
            return Err(invalid("pipeline.max_candidates must be at least 1"));
        }
        if !(self.approx_epsilon > 0.0 && self.approx_epsilon < 1.0) {
            return Err(invalid("pipeline.approx_epsilon must lie in (0, 1)"));
        }
        let percent = 0.0..=100.0;
        if !percent.contains(&self.low_percentile)
            || !percent.contains(&self.high_percentile)
            || self.low_percentile >= self.high_percentile
        {
            return Err(invalid(
                "pipeline percentiles must lie in 0..=100 with low_percentile < high_percentile",
            ));
        }
        if self.threshold == ThresholdMode::LocalMean && self.local_block_radius == 0 {
            return Err(invalid("pipeline.local_block_radius must be at least 1"));
        }
        Ok(())
    }
}

/// Batch execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads; 0 means one per logical CPU.
    pub workers: usize,
    /// Per-image processing budget in seconds; `None` disables the guard.
    pub image_timeout_secs: Option<u64>,
    /// Where diagnostic edge maps and contour overlays are written, if anywhere.
    pub debug_dir: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            image_timeout_secs: Some(60),
            debug_dir: None,
        }
    }
}

impl BatchConfig {
    pub fn image_timeout(&self) -> Option<Duration> {
        self.image_timeout_secs.map(Duration::from_secs)
    }
}

impl ScanConfig {
    /// Parse a configuration from YAML text and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: ScanConfig = serde_yaml::from_str(text)
            .map_err(|err| ScanError::Config(format!("failed to parse YAML: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ScanError::Config(format!("failed to read {}: {}", path.display(), err))
        })?;
        let config = Self::from_yaml_str(&text).map_err(|err| match err {
            ScanError::Config(detail) => {
                ScanError::Config(format!("{}: {}", path.display(), detail))
            }
            other => other,
        })?;
        info!(
            input_dir = %config.paths.input_dir.display(),
            output_dir = %config.paths.output_dir.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|err| ScanError::Config(format!("failed to serialize YAML: {err}")))
    }

    /// Write the configuration to `path` as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_yaml_string()?;
        std::fs::write(path, text)?;
        debug!(path = %path.display(), "Configuration written");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        if self.batch.image_timeout_secs == Some(0) {
            return Err(invalid("batch.image_timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(detail: impl Into<String>) -> ScanError {
    ScanError::Config(detail.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_pipeline() {
        let config = ScanConfig::default();
        assert_eq!(config.pipeline.target_height, 500);
        assert_eq!(config.pipeline.blur_kernel, 5);
        assert_eq!(config.pipeline.morph_kernel, 9);
        assert_eq!(config.pipeline.max_candidates, 10);
        assert_eq!(config.pipeline.quarter_turns, 1);
        assert_eq!(config.pipeline.fallback, FallbackShape::BoundingBox);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = "paths:\n  input_dir: photos\npipeline:\n  target_height: 400\n  fallback: approximation\n";
        let config = ScanConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.paths.input_dir, PathBuf::from("photos"));
        assert_eq!(config.paths.output_dir, PathsConfig::default().output_dir);
        assert_eq!(config.pipeline.target_height, 400);
        assert_eq!(config.pipeline.fallback, FallbackShape::Approximation);
        assert_eq!(config.pipeline.canny_high, 200.0);
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = ScanConfig::from_yaml_str("pipeline: [unclosed").unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn even_kernel_is_rejected() {
        let err = ScanConfig::from_yaml_str("pipeline:\n  blur_kernel: 4\n").unwrap_err();
        assert!(err.to_string().contains("blur_kernel"));
    }

    #[test]
    fn inverted_percentiles_are_rejected() {
        let mut config = ScanConfig::default();
        config.pipeline.low_percentile = 95.0;
        config.pipeline.high_percentile = 4.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn null_timeout_disables_the_guard() {
        let config = ScanConfig::from_yaml_str("batch:\n  image_timeout_secs: null\n").unwrap();
        assert_eq!(config.batch.image_timeout(), None);
        assert_eq!(
            BatchConfig::default().image_timeout(),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");

        let mut config = ScanConfig::default();
        config.pipeline.threshold = ThresholdMode::LocalMean;
        config.batch.workers = 3;
        config.save(&path).unwrap();

        let loaded = ScanConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScanConfig::load(dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }
}
