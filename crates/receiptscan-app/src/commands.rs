// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations for the receiptscan binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use receiptscan_core::{OutcomeStatus, ScanConfig};
use receiptscan_document::{BatchRunner, ReceiptScanner};
use tracing::{info, warn};

/// Load `path`, or fall back to the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    match path {
        Some(path) => ScanConfig::load(path).context("configuration rejected; no image was processed"),
        None => {
            info!("No configuration file given; using defaults");
            Ok(ScanConfig::default())
        }
    }
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(
    config: &mut ScanConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    workers: Option<usize>,
) {
    if let Some(input) = input {
        config.paths.input_dir = input;
    }
    if let Some(output) = output {
        config.paths.output_dir = output;
    }
    if let Some(workers) = workers {
        config.batch.workers = workers;
    }
}

/// Scan the configured input directory. Skipped images do not fail the run.
pub fn run_batch(config: &ScanConfig, report_path: Option<&Path>) -> Result<()> {
    let runner = BatchRunner::from_config(config).context("failed to prepare the batch")?;
    let report = runner.run().context("batch aborted")?;

    for outcome in report.skipped_outcomes() {
        if let OutcomeStatus::Skipped { message, .. } = &outcome.status {
            warn!(path = %outcome.input.display(), %message, "Image skipped");
        }
    }
    info!(
        scanned = report.scanned(),
        skipped = report.skipped(),
        output = %config.paths.output_dir.display(),
        "Done"
    );

    if let Some(path) = report_path {
        let json = report.to_json_pretty()?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }
    Ok(())
}

/// Scan one file into `output`.
pub fn scan_single(config: &ScanConfig, input: &Path, output: &Path) -> Result<()> {
    let scanner = ReceiptScanner::new(config.pipeline.clone())?;
    let result = scanner
        .scan_file(input, output)
        .with_context(|| format!("failed to scan {}", input.display()))?;
    info!(
        output = %output.display(),
        width = result.image.width(),
        height = result.image.height(),
        contour = ?result.selection.kind(),
        "Receipt written"
    );
    Ok(())
}

/// Write the default configuration to `path`, refusing to overwrite.
pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    ScanConfig::default()
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Default configuration written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_what_is_given() {
        let mut config = ScanConfig::default();
        apply_overrides(&mut config, Some(PathBuf::from("photos")), None, Some(2));
        assert_eq!(config.paths.input_dir, PathBuf::from("photos"));
        assert_eq!(config.paths.output_dir, ScanConfig::default().paths.output_dir);
        assert_eq!(config.batch.workers, 2);
    }

    #[test]
    fn init_config_round_trips_and_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receiptscan.yml");
        init_config(&path).unwrap();
        assert_eq!(load_config(Some(path.as_path())).unwrap(), ScanConfig::default());
        assert!(init_config(&path).is_err());
    }

    #[test]
    fn empty_batch_writes_a_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ScanConfig::default();
        apply_overrides(
            &mut config,
            Some(dir.path().join("in")),
            Some(dir.path().join("out")),
            Some(1),
        );
        let report = dir.path().join("report.json");
        run_batch(&config, Some(report.as_path())).unwrap();
        let json = std::fs::read_to_string(&report).unwrap();
        assert!(json.contains("\"outcomes\": []"));
    }
}
