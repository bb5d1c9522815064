use glam::Vec2;

use super::cross;

/// Parametric result of a segment/segment intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub point: Vec2,
    /// Position along the first segment (0 at `a1`, 1 at `a2`)
    pub t: f32,
    /// Position along the second segment (0 at `b1`, 1 at `b2`)
    pub u: f32,
}

/// Intersect segment `a1 -> a2` with segment `b1 -> b2`
/// Pure function - returns the crossing point with both parameters
///
/// Parallel and collinear segments (zero determinant) never intersect, even
/// when collinear segments overlap.
pub fn intersect_segments_param(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<SegmentHit> {
    let b = a2 - a1;
    let d = b2 - b1;
    let denom = cross(b, d);
    if denom == 0.0 {
        return None;
    }

    let c = b1 - a1;
    let t = cross(c, d) / denom;
    let u = cross(c, b) / denom;

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(SegmentHit {
            point: a1 + b * t,
            t,
            u,
        })
    } else {
        None
    }
}

/// Intersect segment `a1 -> a2` with segment `b1 -> b2`
/// Pure function - returns only the crossing point
pub fn intersect_segments(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    intersect_segments_param(a1, a2, b1, b2).map(|hit| hit.point)
}
