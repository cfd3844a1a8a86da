// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch reporting types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, ScanError};

/// Which branch of the contour selector produced the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourKind {
    /// A candidate simplified to exactly four corners.
    FourPoint,
    /// No candidate had four corners; the fallback shape was used.
    Fallback,
}

/// What happened to one image of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Scanned {
        output: PathBuf,
        width: u32,
        height: u32,
        contour: ContourKind,
    },
    Skipped {
        kind: FailureKind,
        message: String,
    },
}

/// Per-image batch entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOutcome {
    /// File name, shared by input and output.
    pub name: String,
    /// Where the input was read from.
    pub input: PathBuf,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ImageOutcome {
    pub fn skipped(name: impl Into<String>, input: PathBuf, err: &ScanError) -> Self {
        Self {
            name: name.into(),
            input,
            status: OutcomeStatus::Skipped {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }

    pub fn is_scanned(&self) -> bool {
        matches!(self.status, OutcomeStatus::Scanned { .. })
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per listed image, sorted by name.
    pub outcomes: Vec<ImageOutcome>,
}

impl BatchReport {
    pub fn scanned(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_scanned()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.scanned()
    }

    /// Outcomes that were skipped, in name order.
    pub fn skipped_outcomes(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes.iter().filter(|o| !o.is_scanned())
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
