// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// receiptscan-document: Receipt detection and rectification.
//
// Provides the scanning pipeline (downscale, edge extraction, contour
// selection, perspective rectification, binarization), raster helpers for
// decoding and encoding, and a batch runner that scans whole directories.

pub mod batch;
pub mod raster;
pub mod scan;

// Re-export the primary structs so callers can use `receiptscan_document::ReceiptScanner` etc.
pub use batch::{BatchRunner, DirectorySink, DirectorySource, ImageSink, ImageSource};
pub use raster::ImageProcessor;
pub use scan::{ContourSelection, Deadline, ReceiptScanner, ScanEnhancer, ScanResult};
