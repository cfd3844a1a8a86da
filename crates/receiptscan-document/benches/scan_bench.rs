// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the receipt scanning pipeline: the full scan of
// a synthetic photograph and the edge extraction stage on its own.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use receiptscan_core::PipelineConfig;
use receiptscan_document::ReceiptScanner;
use receiptscan_document::scan::EdgeExtractor;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 1200x900 dark background with a bright receipt from (200, 120) to (900, 820).
fn synthetic_photo() -> DynamicImage {
    let mut img = RgbImage::from_pixel(1200, 900, Rgb([40, 35, 30]));
    for y in 120..820 {
        for x in 200..900 {
            img.put_pixel(x, y, Rgb([235, 235, 228]));
        }
    }
    DynamicImage::ImageRgb8(img)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_full_scan(c: &mut Criterion) {
    let photo = synthetic_photo();
    let scanner = match ReceiptScanner::new(PipelineConfig::default()) {
        Ok(scanner) => scanner,
        Err(err) => panic!("default configuration rejected: {err}"),
    };

    c.bench_function("scan (1200x900)", |b| {
        b.iter(|| {
            let result = scanner.scan(black_box(&photo));
            black_box(result.ok());
        });
    });
}

fn bench_edge_extraction(c: &mut Criterion) {
    let small = synthetic_photo().thumbnail_exact(667, 500);
    let extractor = EdgeExtractor::from_config(&PipelineConfig::default());

    c.bench_function("edge_extraction (667x500)", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&small))));
    });
}

criterion_group!(benches, bench_full_scan, bench_edge_extraction);
criterion_main!(benches);
