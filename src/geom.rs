pub mod bboxes;
pub mod containment;
pub mod convex;
pub mod face;
pub mod point;
pub mod segment;
pub mod tetrahedron;
pub mod vector;

/// Geometric precision
pub const EPS: f64 = 1e-13;
