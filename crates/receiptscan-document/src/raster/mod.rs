// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster module: decoding, probing, downscaling and encoding.

pub mod processor;

pub use processor::{Downscaled, ImageProcessor, downscale_to_height};
