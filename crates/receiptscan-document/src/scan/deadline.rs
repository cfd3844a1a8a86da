// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cooperative per-image time budget.

use std::time::{Duration, Instant};

use receiptscan_core::error::{Result, ScanError};
use tracing::warn;

/// Time budget for one image, checked between pipeline stages.
///
/// Stages cannot be interrupted mid-computation; the check happens at the
/// next stage boundary (or between contour candidates).
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn unbounded() -> Self {
        Self::from_limit(None)
    }

    /// Expire `limit` after now.
    pub fn after(limit: Duration) -> Self {
        Self::from_limit(Some(limit))
    }

    pub fn from_limit(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fail with [`ScanError::Timeout`] if the budget is spent.
    pub fn check(&self, stage: &'static str) -> Result<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let elapsed = self.elapsed();
        if elapsed >= limit {
            let limit_ms = limit.as_millis() as u64;
            warn!(stage, limit_ms, elapsed_ms = elapsed.as_millis() as u64, "Image deadline exceeded");
            return Err(ScanError::Timeout { stage, limit_ms });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_expires() {
        assert!(Deadline::unbounded().check("anything").is_ok());
    }

    #[test]
    fn zero_budget_expires_immediately() {
        let err = Deadline::after(Duration::ZERO).check("edges").unwrap_err();
        assert!(matches!(err, ScanError::Timeout { stage: "edges", limit_ms: 0 }));
    }

    #[test]
    fn generous_budget_passes() {
        assert!(Deadline::after(Duration::from_secs(3600)).check("edges").is_ok());
    }
}
