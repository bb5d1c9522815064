use glam::Vec2;

/// Axis-aligned bounding box in 2D
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb2 {
    pub min: Vec2,
    pub max: Vec2,
}

/// Build the bounding box of a point set
/// Pure function - returns None for an empty set
pub fn aabb_from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Aabb2> {
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let mut aabb = Aabb2 { min: first, max: first };
    for p in iter {
        aabb.min = aabb.min.min(p);
        aabb.max = aabb.max.max(p);
    }
    Some(aabb)
}

/// Test if AABB overlaps a circle
/// Pure function - clamps the center into the box and compares distances
pub fn aabb_intersects_circle(aabb: &Aabb2, center: Vec2, radius: f32) -> bool {
    let closest = center.clamp(aabb.min, aabb.max);
    closest.distance_squared(center) <= radius * radius
}
