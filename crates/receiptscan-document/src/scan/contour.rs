// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour selection: trace outer borders of the edge map, rank them by
// area and pick the receipt boundary.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length, min_area_rect};
use imageproc::point::Point;
use receiptscan_core::error::{Result, ScanError};
use receiptscan_core::{ContourKind, FallbackShape, PipelineConfig};
use tracing::{debug, info, instrument};

use super::deadline::Deadline;
use super::geometry::{Contour, compress_chain};

/// Outcome of contour selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContourSelection {
    /// A candidate simplified to exactly four corners.
    FourPointMatch(Contour),
    /// No examined candidate had four corners; the fallback shape of the
    /// largest one.
    Fallback(Contour),
}

impl ContourSelection {
    pub fn contour(&self) -> &Contour {
        match self {
            Self::FourPointMatch(contour) | Self::Fallback(contour) => contour,
        }
    }

    pub fn into_contour(self) -> Contour {
        match self {
            Self::FourPointMatch(contour) | Self::Fallback(contour) => contour,
        }
    }

    pub fn kind(&self) -> ContourKind {
        match self {
            Self::FourPointMatch(_) => ContourKind::FourPoint,
            Self::Fallback(_) => ContourKind::Fallback,
        }
    }
}

/// One traced outer border.
struct Candidate {
    /// Every border pixel, in tracing order.
    traced: Vec<Point<i32>>,
    /// The border with straight runs collapsed to their end points.
    chain: Contour,
    area: f64,
}

/// Chooses the receipt boundary from an edge map.
#[derive(Debug, Clone, Copy)]
pub struct ContourSelector {
    max_candidates: usize,
    approx_epsilon: f64,
    search_all: bool,
    fallback: FallbackShape,
}

impl ContourSelector {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_candidates: config.max_candidates,
            approx_epsilon: config.approx_epsilon,
            search_all: config.search_all_candidates,
            fallback: config.fallback,
        }
    }

    /// The largest outer contours, biggest first, at most `max_candidates`.
    pub fn candidates(&self, edges: &GrayImage) -> Vec<Contour> {
        self.ranked(edges).into_iter().map(|c| c.chain).collect()
    }

    pub fn select(&self, edges: &GrayImage) -> Result<ContourSelection> {
        self.select_with_deadline(edges, &Deadline::unbounded())
    }

    /// Approximate the largest contour and take it when it has four
    /// corners; otherwise return its fallback shape.
    ///
    /// With `search_all_candidates` the remaining ranked contours are tried
    /// in order before falling back.
    ///
    /// An edge map without any contour is [`ScanError::BoundaryNotFound`].
    #[instrument(skip_all, fields(width = edges.width(), height = edges.height()))]
    pub fn select_with_deadline(
        &self,
        edges: &GrayImage,
        deadline: &Deadline,
    ) -> Result<ContourSelection> {
        let candidates = self.ranked(edges);
        debug!(candidates = candidates.len(), "Contours ranked");
        let Some(largest) = candidates.first() else {
            return Err(ScanError::BoundaryNotFound);
        };

        let examined = if self.search_all { candidates.len() } else { 1 };
        for (rank, candidate) in candidates.iter().take(examined).enumerate() {
            deadline.check("contour_selection")?;
            let approx = self.approximate(&candidate.traced);
            if approx.len() == 4 {
                debug!(rank, area = candidate.area, "Four-point contour found");
                return Ok(ContourSelection::FourPointMatch(Contour::new(approx)));
            }
        }

        let fallback = match self.fallback {
            FallbackShape::BoundingBox if largest.chain.len() >= 3 => {
                min_area_rect(largest.chain.points()).to_vec()
            }
            FallbackShape::BoundingBox => largest.chain.points().to_vec(),
            FallbackShape::Approximation => self.approximate(&largest.traced),
        };
        info!(
            shape = ?self.fallback,
            points = fallback.len(),
            "No four-point contour; using fallback shape"
        );
        Ok(ContourSelection::Fallback(Contour::new(fallback)))
    }

    fn ranked(&self, edges: &GrayImage) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = find_contours::<i32>(edges)
            .into_iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
            .map(|c| {
                let chain = Contour::new(compress_chain(&c.points));
                let area = chain.area();
                Candidate {
                    traced: c.points,
                    chain,
                    area,
                }
            })
            .collect();
        // Stable: equal areas keep discovery order.
        candidates.sort_by(|a, b| b.area.total_cmp(&a.area));
        candidates.truncate(self.max_candidates);
        candidates
    }

    /// Douglas-Peucker simplification with a tolerance proportional to the
    /// perimeter.
    fn approximate(&self, traced: &[Point<i32>]) -> Vec<Point<i32>> {
        if traced.len() < 3 {
            return traced.to_vec();
        }
        let epsilon = self.approx_epsilon * arc_length(traced, true);
        if epsilon.is_nan() || epsilon <= 0.0 {
            return traced.to_vec();
        }
        approximate_polygon_dp(traced, epsilon, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
    use imageproc::rect::Rect;

    fn selector(fallback: FallbackShape) -> ContourSelector {
        ContourSelector::from_config(&PipelineConfig {
            fallback,
            ..PipelineConfig::default()
        })
    }

    fn outline(width: u32, height: u32, rects: &[(i32, i32, u32, u32)]) -> GrayImage {
        let mut edges = GrayImage::new(width, height);
        for &(x, y, w, h) in rects {
            draw_hollow_rect_mut(&mut edges, Rect::at(x, y).of_size(w, h), Luma([255u8]));
        }
        edges
    }

    #[test]
    fn empty_edge_map_is_boundary_not_found() {
        let edges = GrayImage::new(200, 150);
        let err = selector(FallbackShape::BoundingBox).select(&edges).unwrap_err();
        assert!(matches!(err, ScanError::BoundaryNotFound));
    }

    #[test]
    fn rectangle_outline_is_a_four_point_match() {
        let edges = outline(200, 150, &[(20, 20, 160, 110)]);
        let selection = selector(FallbackShape::BoundingBox).select(&edges).unwrap();
        assert_eq!(selection.kind(), ContourKind::FourPoint);

        let bbox = selection.contour().bounding_box().unwrap();
        assert_eq!((bbox.min_x, bbox.min_y), (20, 20));
        assert_eq!((bbox.max_x, bbox.max_y), (179, 129));
        assert_eq!(selection.contour().len(), 4);
    }

    #[test]
    fn candidates_are_ranked_largest_first_and_capped() {
        let edges = outline(300, 200, &[(10, 10, 40, 30), (100, 20, 150, 150), (60, 60, 20, 20)]);
        let all = selector(FallbackShape::BoundingBox).candidates(&edges);
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|pair| pair[0].area() >= pair[1].area()));
        assert_eq!(all[0].bounding_box().unwrap().min_x, 100);

        let capped = ContourSelector::from_config(&PipelineConfig {
            max_candidates: 1,
            ..PipelineConfig::default()
        })
        .candidates(&edges);
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn nested_outlines_only_count_the_outer_one() {
        let edges = outline(200, 200, &[(10, 10, 180, 180), (50, 50, 60, 60)]);
        let all = selector(FallbackShape::BoundingBox).candidates(&edges);
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn circle_falls_back_to_its_bounding_rectangle() {
        let mut edges = GrayImage::new(200, 200);
        draw_filled_circle_mut(&mut edges, (100, 100), 50, Luma([255u8]));

        let selection = selector(FallbackShape::BoundingBox).select(&edges).unwrap();
        assert_eq!(selection.kind(), ContourKind::Fallback);
        assert_eq!(selection.contour().len(), 4);
    }

    #[test]
    fn circle_can_fall_back_to_its_approximation() {
        let mut edges = GrayImage::new(200, 200);
        draw_filled_circle_mut(&mut edges, (100, 100), 50, Luma([255u8]));

        let selection = selector(FallbackShape::Approximation).select(&edges).unwrap();
        assert!(matches!(selection, ContourSelection::Fallback(_)));
        assert!(selection.contour().len() > 4);
    }

    /// A large circle ranked ahead of a small rectangle outline.
    fn circle_and_small_rectangle() -> GrayImage {
        let mut edges = GrayImage::new(400, 300);
        draw_filled_circle_mut(&mut edges, (140, 150), 120, Luma([255u8]));
        draw_hollow_rect_mut(&mut edges, Rect::at(320, 20).of_size(40, 30), Luma([255u8]));
        edges
    }

    #[test]
    fn largest_contour_decides_the_selection() {
        let edges = circle_and_small_rectangle();

        let boxed = selector(FallbackShape::BoundingBox).select(&edges).unwrap();
        assert_eq!(boxed.kind(), ContourKind::Fallback);
        assert!(boxed.contour().bounding_box().unwrap().max_x < 300);

        let approx = selector(FallbackShape::Approximation).select(&edges).unwrap();
        assert_eq!(approx.kind(), ContourKind::Fallback);
        assert!(approx.contour().len() > 4);
        let bbox = approx.contour().bounding_box().unwrap();
        assert!(bbox.min_x <= 40 && bbox.max_x >= 240, "{bbox:?}");
    }

    #[test]
    fn searching_all_candidates_finds_the_smaller_rectangle() {
        let selector = ContourSelector::from_config(&PipelineConfig {
            search_all_candidates: true,
            ..PipelineConfig::default()
        });
        let selection = selector.select(&circle_and_small_rectangle()).unwrap();
        assert_eq!(selection.kind(), ContourKind::FourPoint);
        let bbox = selection.contour().bounding_box().unwrap();
        assert_eq!((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y), (320, 20, 359, 49));
    }

    #[test]
    fn expired_deadline_stops_selection() {
        let edges = outline(200, 150, &[(20, 20, 160, 110)]);
        let err = selector(FallbackShape::BoundingBox)
            .select_with_deadline(&edges, &Deadline::after(std::time::Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, ScanError::Timeout { stage: "contour_selection", .. }));
    }
}
