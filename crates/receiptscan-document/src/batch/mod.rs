// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch processing: image sources and sinks, diagnostics, and the runner
// that drives the scanner over a whole directory.

pub mod debug;
pub mod runner;
pub mod sink;
pub mod source;

pub use debug::{DebugWriter, draw_contour};
pub use runner::BatchRunner;
pub use sink::{DirectorySink, ImageSink, prepare_directories};
pub use source::{DirectorySource, ImageSource};
