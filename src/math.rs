//! Geometry used for stop line distances.

use cgmath::{MetricSpace, Point2};

/// A 2D point
pub type Point2d = Point2<f64>;

/// Finds the smallest distance from `point` to any of `targets`.
pub fn nearest_distance(point: Point2d, targets: &[Point2d]) -> Option<f64> {
    targets
        .iter()
        .map(|target| point.distance(*target))
        .min_by(|a, b| a.total_cmp(b))
}
