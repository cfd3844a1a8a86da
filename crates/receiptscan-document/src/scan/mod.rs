// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: edge extraction, contour selection, perspective
// rectification and binarization.

pub mod contour;
pub mod deadline;
pub mod edges;
pub mod enhance;
pub mod geometry;
pub mod pipeline;
pub mod rectify;

pub use contour::{ContourSelection, ContourSelector};
pub use deadline::Deadline;
pub use edges::EdgeExtractor;
pub use enhance::ScanEnhancer;
pub use geometry::{BoundingBox, Contour, QuadCorners, TransformMatrix};
pub use pipeline::{Intermediates, ReceiptScanner, ScanResult};
pub use rectify::{Rectified, contour_to_quad, rectify};
