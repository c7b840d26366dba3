use crate::geom::EPS;
use crate::geom::point::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundBox {
    pub min: Point,
    pub max: Point,
}

impl BoundBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Smallest box holding all points `pts`.
    ///
    /// An empty slice gives an inverted box which overlaps nothing.
    pub fn from_points(pts: &[Point]) -> Self {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in pts {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Self { min, max }
    }

    pub fn centre(&self) -> Point {
        Point::new_between_2_points(self.min, self.max, 0.5)
    }

    /// Length of the box diagonal.
    pub fn span(&self) -> f64 {
        (self.max - self.min).length()
    }

    /// Returns a copy scaled by `factor` about the box centre.
    pub fn scaled(&self, factor: f64) -> Self {
        let c = self.centre();
        let half = (self.max - c) * factor;
        Self {
            min: c + (-half),
            max: c + half,
        }
    }

    /// Checks whether two boxes overlap (touching counts) with tolerance `tol`.
    pub fn overlaps(&self, other: &Self, tol: f64) -> bool {
        are_bboxes_overlapping(self.min, self.max, other.min, other.max, tol)
    }

    /// Checks whether a point is inside the box grown by `tol`.
    pub fn contains(&self, pt: Point, tol: f64) -> bool {
        pt.x >= self.min.x - tol
            && pt.x <= self.max.x + tol
            && pt.y >= self.min.y - tol
            && pt.y <= self.max.y + tol
            && pt.z >= self.min.z - tol
            && pt.z <= self.max.z + tol
    }
}

/// Checks whether two bounding boxes overlap.
///
/// Takes min and max corners of each bbox.
/// Returns true if boxes overlap (including touching within `tol`).
pub fn are_bboxes_overlapping(min1: Point, max1: Point, min2: Point, max2: Point, tol: f64) -> bool {
    let tol = tol.max(EPS);
    // Boxes don't overlap if separated along any axis
    if max1.x < min2.x - tol || min1.x > max2.x + tol {
        return false;
    }
    if max1.y < min2.y - tol || min1.y > max2.y + tol {
        return false;
    }
    if max1.z < min2.z - tol || min1.z > max2.z + tol {
        return false;
    }
    true
}
