// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the receipt scanner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all scanner operations.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Per-image errors --
    #[error("image decoding failed: {0}")]
    Decode(String),

    #[error("invalid image dimensions: width={width}, height={height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("receipt boundary not found: the edge map contains no contours")]
    BoundaryNotFound,

    #[error("receipt geometry unavailable: {0}")]
    GeometryUnavailable(String),

    #[error("processing exceeded {limit_ms}ms (during {stage})")]
    Timeout { stage: &'static str, limit_ms: u64 },

    #[error("image encoding failed: {0}")]
    Encode(String),

    // -- Batch errors --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;

/// How far an error reaches.
///
/// Per-image failures are deterministic functions of the input, so nothing is
/// ever retried: an image-scoped error skips that image, a batch-scoped error
/// stops the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorScope {
    /// Skip this image, continue with the rest of the batch.
    Image,
    /// Abort the batch.
    Batch,
}

/// Short machine-readable label for an image-scoped failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Decode,
    InvalidDimensions,
    BoundaryNotFound,
    GeometryUnavailable,
    Timeout,
    Encode,
    Io,
    Other,
}

impl ScanError {
    /// Classify this error for batch propagation.
    pub fn scope(&self) -> ErrorScope {
        match self {
            ScanError::Decode(_)
            | ScanError::InvalidDimensions { .. }
            | ScanError::BoundaryNotFound
            | ScanError::GeometryUnavailable(_)
            | ScanError::Timeout { .. }
            | ScanError::Encode(_) => ErrorScope::Image,

            // A single unreadable or unwritable file does not doom the batch.
            ScanError::Io(_) => ErrorScope::Image,

            ScanError::Config(_) | ScanError::WorkerPool(_) | ScanError::Serialization(_) => {
                ErrorScope::Batch
            }
        }
    }

    /// Label used in batch reports.
    pub fn kind(&self) -> FailureKind {
        match self {
            ScanError::Decode(_) => FailureKind::Decode,
            ScanError::InvalidDimensions { .. } => FailureKind::InvalidDimensions,
            ScanError::BoundaryNotFound => FailureKind::BoundaryNotFound,
            ScanError::GeometryUnavailable(_) => FailureKind::GeometryUnavailable,
            ScanError::Timeout { .. } => FailureKind::Timeout,
            ScanError::Encode(_) => FailureKind::Encode,
            ScanError::Io(_) => FailureKind::Io,
            _ => FailureKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_failures_are_image_scoped() {
        assert_eq!(ScanError::BoundaryNotFound.scope(), ErrorScope::Image);
        assert_eq!(
            ScanError::GeometryUnavailable("degenerate".into()).scope(),
            ErrorScope::Image
        );
        let timeout = ScanError::Timeout {
            stage: "contours",
            limit_ms: 100,
        };
        assert_eq!(timeout.scope(), ErrorScope::Image);
        assert_eq!(timeout.kind(), FailureKind::Timeout);
    }

    #[test]
    fn config_errors_abort_the_batch() {
        let err = ScanError::Config("bad yaml".into());
        assert_eq!(err.scope(), ErrorScope::Batch);
        assert_eq!(err.kind(), FailureKind::Other);
    }

    #[test]
    fn io_errors_skip_the_image() {
        let err = ScanError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.scope(), ErrorScope::Image);
        assert_eq!(err.kind(), FailureKind::Io);
    }

    #[test]
    fn messages_name_the_failure() {
        let msg = ScanError::InvalidDimensions {
            width: 0,
            height: 10,
        }
        .to_string();
        assert!(msg.contains("width=0"));
        assert!(ScanError::BoundaryNotFound.to_string().contains("boundary"));
    }
}
