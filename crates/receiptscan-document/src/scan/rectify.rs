// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification: map the selected contour back to full
// resolution and warp it onto an axis-aligned rectangle.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, warp_into};
use receiptscan_core::error::{Result, ScanError};
use tracing::{debug, instrument};

use super::geometry::{Contour, QuadCorners, TransformMatrix};

/// A flattened receipt and the geometry that produced it.
#[derive(Debug, Clone)]
pub struct Rectified {
    pub image: DynamicImage,
    /// Corners in full-resolution coordinates.
    pub quad: QuadCorners,
    /// The quad-to-rectangle mapping the image was warped with.
    pub transform: TransformMatrix,
}

/// Corner quadrilateral of `contour` in the coordinates of the original image.
///
/// `contour` lives in the downscaled image; its bounding box corners are
/// divided by `ratio`. Contours with fewer than three points, or whose box
/// has no extent on an axis, are [`ScanError::GeometryUnavailable`].
pub fn contour_to_quad(contour: &Contour, ratio: f64) -> Result<QuadCorners> {
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(ScanError::GeometryUnavailable(format!(
            "resize ratio {ratio} is not a positive number"
        )));
    }
    if contour.len() < 3 {
        return Err(ScanError::GeometryUnavailable(format!(
            "contour has {} point(s)",
            contour.len()
        )));
    }
    let bbox = contour
        .bounding_box()
        .filter(|bbox| !bbox.is_degenerate())
        .ok_or_else(|| {
            ScanError::GeometryUnavailable("contour bounding box has zero width or height".into())
        })?;
    Ok(QuadCorners::from_points(bbox.corners()).unscaled(ratio))
}

/// Warp the region outlined by `contour` out of `original`.
#[instrument(skip(original, contour), fields(points = contour.len()))]
pub fn rectify(original: &DynamicImage, contour: &Contour, ratio: f64) -> Result<Rectified> {
    let quad = contour_to_quad(contour, ratio)?;
    let (width, height) = quad.target_size();
    let transform = TransformMatrix::onto_rectangle(&quad, width, height).ok_or_else(|| {
        ScanError::GeometryUnavailable("projective transform is singular".into())
    })?;

    let source = original.to_rgb8();
    let mut output = RgbImage::new(transform.width(), transform.height());
    warp_into(
        &source,
        transform.projection(),
        Interpolation::Bilinear,
        Rgb([0u8, 0, 0]),
        &mut output,
    );
    debug!(width, height, corners = ?quad.to_array(), "Receipt rectified");

    Ok(Rectified {
        image: DynamicImage::ImageRgb8(output),
        quad,
        transform,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point;

    fn contour(raw: &[(i32, i32)]) -> Contour {
        Contour::new(raw.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    fn white_rectangle() -> DynamicImage {
        let mut img = RgbImage::new(1000, 700);
        for y in 100..600 {
            for x in 100..900 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn axis_aligned_rectangle_round_trips() {
        let outline = contour(&[(100, 100), (899, 100), (899, 599), (100, 599)]);
        let rectified = rectify(&white_rectangle(), &outline, 1.0).unwrap();
        assert_eq!(rectified.image.width(), 800);
        assert_eq!(rectified.image.height(), 500);
        assert_eq!(rectified.image.to_rgb8().get_pixel(400, 250), &Rgb([255, 255, 255]));
    }

    #[test]
    fn narrow_box_at_an_enlarging_ratio_gives_a_single_column() {
        let photo = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, Rgb([255, 255, 255])));
        let outline = contour(&[(10, 10), (13, 10), (13, 40), (10, 40)]);
        let rectified = rectify(&photo, &outline, 5.0).unwrap();

        assert_eq!(rectified.quad.target_size(), (1, 6));
        assert_eq!((rectified.image.width(), rectified.image.height()), (1, 6));
        assert_eq!(
            (rectified.transform.width(), rectified.transform.height()),
            (1, 6)
        );
        assert!(rectified
            .image
            .to_rgb8()
            .pixels()
            .all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn corners_are_scaled_back_to_full_resolution() {
        let outline = contour(&[(50, 50), (449, 50), (449, 299), (50, 299)]);
        let quad = contour_to_quad(&outline, 0.5).unwrap();
        assert_eq!(quad.top_left, (100.0, 100.0));
        assert_eq!(quad.bottom_right, (900.0, 600.0));
        assert_eq!(quad.target_size(), (800, 500));
    }

    #[test]
    fn flat_contour_is_geometry_unavailable() {
        let outline = contour(&[(10, 40), (90, 40), (50, 40)]);
        let err = rectify(&white_rectangle(), &outline, 1.0).unwrap_err();
        assert!(matches!(err, ScanError::GeometryUnavailable(_)));
    }

    #[test]
    fn two_point_contour_is_geometry_unavailable() {
        let outline = contour(&[(10, 10), (90, 80)]);
        assert!(matches!(
            contour_to_quad(&outline, 1.0),
            Err(ScanError::GeometryUnavailable(_))
        ));
    }

    #[test]
    fn non_positive_ratio_is_rejected() {
        let outline = contour(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        assert!(contour_to_quad(&outline, 0.0).is_err());
        assert!(contour_to_quad(&outline, f64::NAN).is_err());
    }
}
