//! 2D geometry primitives used by the shadow-casting path.

pub mod aabb;
pub mod polygon;
pub mod segment;

pub use aabb::{aabb_from_points, aabb_intersects_circle, Aabb2};
pub use polygon::{polygon_contains_point, scanline_crossings};
pub use segment::{intersect_segments, intersect_segments_param, SegmentHit};

/// 2D cross product (z component of the 3D cross product)
#[inline]
pub fn cross(a: glam::Vec2, b: glam::Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}
