// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch runner: scans every image of a source on a bounded worker pool,
// skipping images that fail and aborting only on batch-wide errors.

use std::path::Path;

use chrono::Utc;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use receiptscan_core::error::{ErrorScope, Result, ScanError};
use receiptscan_core::{BatchConfig, BatchReport, ImageOutcome, OutcomeStatus, ScanConfig};
use tracing::{info, instrument, warn};

use super::debug::DebugWriter;
use super::sink::{DirectorySink, ImageSink, prepare_directories};
use super::source::{DirectorySource, ImageSource};
use crate::scan::{Deadline, ReceiptScanner};

/// Runs one independent pipeline per image of `source`, writing into `sink`.
pub struct BatchRunner<S, K> {
    scanner: ReceiptScanner,
    source: S,
    sink: K,
    config: BatchConfig,
    debug: Option<DebugWriter>,
}

impl BatchRunner<DirectorySource, DirectorySink> {
    /// Directory-to-directory runner for a loaded configuration.
    ///
    /// Creates the input and output directories first. A configured debug
    /// directory turns on `keep_intermediates`.
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        config.validate()?;
        prepare_directories(&config.paths)?;

        let mut pipeline = config.pipeline.clone();
        if config.batch.debug_dir.is_some() {
            pipeline.keep_intermediates = true;
        }
        Self::with_custom(
            ReceiptScanner::new(pipeline)?,
            DirectorySource::new(&config.paths.input_dir),
            DirectorySink::new(&config.paths.output_dir),
            config.batch.clone(),
        )
    }
}

impl<S: ImageSource, K: ImageSink> BatchRunner<S, K> {
    pub fn with_custom(scanner: ReceiptScanner, source: S, sink: K, config: BatchConfig) -> Result<Self> {
        let debug = config.debug_dir.as_ref().map(DebugWriter::create).transpose()?;
        Ok(Self {
            scanner,
            source,
            sink,
            config,
            debug,
        })
    }

    pub fn scanner(&self) -> &ReceiptScanner {
        &self.scanner
    }

    /// Scan every listed image.
    ///
    /// Image-scoped failures become skipped outcomes; anything else stops
    /// the run. Outcomes are sorted by name.
    #[instrument(skip(self), fields(workers = self.config.workers))]
    pub fn run(&self) -> Result<BatchReport> {
        let started_at = Utc::now();
        let names = self.source.list()?;
        info!(images = names.len(), "Batch started");

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("receiptscan-worker-{i}"))
            .build()
            .map_err(|err| ScanError::WorkerPool(err.to_string()))?;

        let mut outcomes = pool.install(|| {
            names
                .par_iter()
                .map(|name| self.process(name))
                .collect::<Result<Vec<_>>>()
        })?;
        outcomes.sort_by(|a, b| a.name.cmp(&b.name));

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        info!(
            scanned = report.scanned(),
            skipped = report.skipped(),
            "Batch finished"
        );
        Ok(report)
    }

    fn process(&self, name: &str) -> Result<ImageOutcome> {
        let input = self.source.locate(name);
        let deadline = Deadline::from_limit(self.config.image_timeout());
        match self.scan_one(name, &input, &deadline) {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.scope() == ErrorScope::Image => {
                warn!(path = %input.display(), error = %err, "Skipping image");
                Ok(ImageOutcome::skipped(name, input, &err))
            }
            Err(err) => Err(err),
        }
    }

    fn scan_one(&self, name: &str, input: &Path, deadline: &Deadline) -> Result<ImageOutcome> {
        let image = self.source.load(name)?;
        deadline.check("decode")?;

        let result = self.scanner.scan_with_deadline(&image, deadline)?;
        let output = self.sink.store(name, &result.image)?;

        if let (Some(debug), Some(kept)) = (&self.debug, &result.intermediates) {
            debug.write(name, kept, result.selection.contour());
        }

        Ok(ImageOutcome {
            name: name.to_owned(),
            input: input.to_path_buf(),
            status: OutcomeStatus::Scanned {
                output,
                width: result.image.width(),
                height: result.image.height(),
                contour: result.selection.kind(),
            },
        })
    }
}
