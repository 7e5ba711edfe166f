use itertools::{Itertools, MinMaxResult};
use std::f64::consts::TAU;
use serde::{Deserialize, Serialize};

use crate::utils::{BoundingBox, Point};

// Area below this is treated as zero (pixel units squared)
const AREA_EPS: f64 = 1e-9;
// Tolerance for point-on-edge checks
const SIDE_EPS: f64 = 1e-6;
// Tolerance on the total turning angle of a simple boundary (radians)
const WINDING_EPS: f64 = 1e-6;

/// Ordered vertices of a region. The boundary is closed implicitly:
/// the last vertex connects back to the first one, it is not repeated.
///
/// Anything with fewer than 3 distinct vertices or zero area is a valid
/// value but not a usable region, see [`Polygon::is_usable`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Polygon { points }
    }
    pub fn points(&self) -> &[Point] {
        &self.points
    }
    pub fn len(&self) -> usize {
        self.points.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
    /// Shoelace area with sign: positive when the vertices go
    /// from +x towards +y (top-left, top-right, bottom-right... in image coordinates)
    pub fn signed_area(&self) -> f64 {
        shoelace(&to_f64(&self.points))
    }
    pub fn area(&self) -> f32 {
        self.signed_area().abs() as f32
    }
    /// Number of pairwise different vertices
    pub fn distinct_len(&self) -> usize {
        self.points
            .iter()
            .sorted_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)))
            .dedup()
            .count()
    }
    /// At least 3 distinct vertices and a non-zero area
    pub fn is_usable(&self) -> bool {
        self.distinct_len() >= 3 && self.signed_area().abs() > AREA_EPS
    }
    /// All turns along the boundary go the same way and the boundary winds
    /// around exactly once, so star shapes are rejected.
    /// Collinear and repeated vertices are ignored.
    pub fn is_convex(&self) -> bool {
        let mut pts = to_f64(&self.points);
        pts.dedup();
        while pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }
        let n = pts.len();
        if n < 3 {
            return false;
        }
        let mut sign = 0.0;
        let mut total_turn = 0.0;
        for i in 0..n {
            let (a, b, c) = (pts[i], pts[(i + 1) % n], pts[(i + 2) % n]);
            let turn = cross(a, b, c);
            let dot = (b.0 - a.0) * (c.0 - b.0) + (b.1 - a.1) * (c.1 - b.1);
            total_turn += turn.atan2(dot);
            if turn.abs() <= AREA_EPS {
                continue;
            }
            if sign == 0.0 {
                sign = turn.signum();
            } else if turn.signum() != sign {
                return false;
            }
        }
        sign != 0.0 && (total_turn.abs() - TAU).abs() < WINDING_EPS
    }
}

/// Corners of the box: top-left, top-right, bottom-right, bottom-left
pub fn to_polygon(bbox: &BoundingBox) -> Polygon {
    let half_w = bbox.w / 2.0;
    let half_h = bbox.h / 2.0;
    Polygon::new(vec![
        Point::new(bbox.x - half_w, bbox.y - half_h),
        Point::new(bbox.x + half_w, bbox.y - half_h),
        Point::new(bbox.x + half_w, bbox.y + half_h),
        Point::new(bbox.x - half_w, bbox.y + half_h),
    ])
}

/// Intersection over union of two convex polygons, in [0, 1].
///
/// Unusable or non-convex inputs and empty intersections give 0.0.
/// The intersection is computed with Sutherland–Hodgman clipping,
/// so rotated or hull-shaped regions are handled as well as boxes.
pub fn polygon_iou(a: &Polygon, b: &Polygon) -> f32 {
    if !a.is_usable() || !b.is_usable() || !a.is_convex() || !b.is_convex() {
        return 0.0;
    }
    let subject = counter_clockwise(&a.points);
    let clipper = counter_clockwise(&b.points);
    let area_a = shoelace(&subject);
    let area_b = shoelace(&clipper);

    let intersection = clip(&subject, &clipper);
    if intersection.len() < 3 {
        return 0.0;
    }
    let inter_area = shoelace(&intersection).abs();
    if inter_area <= AREA_EPS {
        return 0.0;
    }
    let union = area_a + area_b - inter_area;
    if union <= AREA_EPS {
        return 0.0;
    }
    (inter_area / union).clamp(0.0, 1.0) as f32
}

/// Convex hull of an unordered point set (Andrew's monotone chain).
///
/// Collinear points are dropped. When every point lies on one line the
/// result has fewer than 3 vertices; callers decide what to do with that.
pub fn convex_hull(points: &[Point]) -> Polygon {
    let sorted: Vec<Point> = points
        .iter()
        .copied()
        .sorted_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)))
        .dedup()
        .collect();
    if sorted.len() < 3 {
        return Polygon::new(sorted);
    }
    let as_f64 = |p: &Point| (p.x as f64, p.y as f64);

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for p in sorted.iter() {
        while lower.len() >= 2
            && cross(as_f64(&lower[lower.len() - 2]), as_f64(&lower[lower.len() - 1]), as_f64(p)) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while upper.len() >= 2
            && cross(as_f64(&upper[upper.len() - 2]), as_f64(&upper[upper.len() - 1]), as_f64(p)) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }
    // Last point of each chain is the first point of the other one
    lower.pop();
    upper.pop();
    lower.extend(upper);
    Polygon::new(lower)
}

/// Axis-aligned bounding box (center form) of the polygon's vertices.
/// None for a polygon without vertices.
pub fn bounding_rect(polygon: &Polygon) -> Option<BoundingBox> {
    let (min_x, max_x) = min_max(polygon.points.iter().map(|p| p.x))?;
    let (min_y, max_y) = min_max(polygon.points.iter().map(|p| p.y))?;
    Some(BoundingBox::new(
        (min_x + max_x) / 2.0,
        (min_y + max_y) / 2.0,
        max_x - min_x,
        max_y - min_y,
    ))
}

/// Whether the point lies inside or on the boundary of a convex polygon
pub fn contains_point(polygon: &Polygon, point: &Point) -> bool {
    if !polygon.is_usable() {
        return false;
    }
    let pts = counter_clockwise(&polygon.points);
    let p = (point.x as f64, point.y as f64);
    let n = pts.len();
    (0..n).all(|i| cross(pts[i], pts[(i + 1) % n], p) >= -SIDE_EPS * edge_len(pts[i], pts[(i + 1) % n]).max(1.0))
}

fn min_max(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    match values.minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(min, max) => Some((min, max)),
    }
}

fn to_f64(points: &[Point]) -> Vec<(f64, f64)> {
    points.iter().map(|p| (p.x as f64, p.y as f64)).collect()
}

fn counter_clockwise(points: &[Point]) -> Vec<(f64, f64)> {
    let mut pts = to_f64(points);
    if shoelace(&pts) < 0.0 {
        pts.reverse();
    }
    pts
}

fn shoelace(pts: &[(f64, f64)]) -> f64 {
    let n = pts.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let (x1, y1) = pts[i];
        let (x2, y2) = pts[(i + 1) % n];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

// Z component of (b - a) x (p - a). Positive when p is on the inner side of
// edge a->b of a positively oriented polygon
fn cross(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn edge_len(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

fn segment_line_intersection(p1: (f64, f64), p2: (f64, f64), a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    let d1 = cross(a, b, p1);
    let d2 = cross(a, b, p2);
    let denom = d1 - d2;
    if denom.abs() <= f64::EPSILON {
        return p2;
    }
    let t = d1 / denom;
    (p1.0 + t * (p2.0 - p1.0), p1.1 + t * (p2.1 - p1.1))
}

// Sutherland–Hodgman: clips `subject` by every edge of the convex, positively oriented `clipper`
fn clip(subject: &[(f64, f64)], clipper: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut output = subject.to_vec();
    let n = clipper.len();
    for i in 0..n {
        if output.is_empty() {
            break;
        }
        let a = clipper[i];
        let b = clipper[(i + 1) % n];
        let input = std::mem::take(&mut output);
        let mut prev = input[input.len() - 1];
        for &current in input.iter() {
            let current_inside = cross(a, b, current) >= 0.0;
            let prev_inside = cross(a, b, prev) >= 0.0;
            if current_inside {
                if !prev_inside {
                    output.push(segment_line_intersection(prev, current, a, b));
                }
                output.push(current);
            } else if prev_inside {
                output.push(segment_line_intersection(prev, current, a, b));
            }
            prev = current;
        }
    }
    output
}
