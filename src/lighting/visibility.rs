use std::f32::consts::TAU;

use glam::Vec2;

use crate::constants::lighting::{ANGLE_DEDUP_EPSILON, CORNER_PROBE_EPSILON, DEFAULT_VISIBILITY_SAMPLES};
use crate::geometry::{intersect_segments_param, polygon_contains_point};
use crate::lighting::Occluder;

/// Boundary of the region a light can see, sorted by angle around the light
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityPolygon {
    origin: Vec2,
    points: Vec<Vec2>,
}

impl VisibilityPolygon {
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Even-odd containment test against the boundary
    pub fn contains(&self, point: Vec2) -> bool {
        polygon_contains_point(&self.points, point)
    }
}

/// Normalize an angle into `[0, 2π)`
/// Pure function - folds any finite angle into one turn
pub fn normalize_angle(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Sorted set of angles where values within `epsilon` (circularly) are equal
struct AngleSet {
    epsilon: f32,
    angles: Vec<f32>,
}

impl AngleSet {
    fn new(epsilon: f32) -> Self {
        Self {
            epsilon,
            angles: Vec::new(),
        }
    }

    /// Insert an angle in `[0, 2π)`; false when an equal angle is present
    fn insert(&mut self, angle: f32) -> bool {
        let idx = self.angles.partition_point(|&a| a < angle);
        let near = |other: f32| {
            let d = (other - angle).abs();
            d.min(TAU - d) < self.epsilon
        };

        let neighbors = [
            idx.checked_sub(1).map(|i| self.angles[i]),
            self.angles.get(idx).copied(),
            self.angles.first().copied(),
            self.angles.last().copied(),
        ];
        if neighbors.into_iter().flatten().any(near) {
            return false;
        }

        self.angles.insert(idx, angle);
        true
    }
}

/// Builds per-light visibility polygons by casting rays at occluder corners
/// and at evenly spaced angles
#[derive(Debug, Clone)]
pub struct VisibilityPolygonBuilder {
    sample_count: usize,
    corner_probe_epsilon: f32,
    vertex_rays_hit_all_occluders: bool,
}

impl Default for VisibilityPolygonBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBILITY_SAMPLES)
    }
}

impl VisibilityPolygonBuilder {
    pub fn new(sample_count: usize) -> Self {
        Self {
            sample_count,
            corner_probe_epsilon: CORNER_PROBE_EPSILON,
            vertex_rays_hit_all_occluders: false,
        }
    }

    pub fn with_corner_probe_epsilon(mut self, epsilon: f32) -> Self {
        self.corner_probe_epsilon = epsilon;
        self
    }

    /// Test corner rays against every occluder instead of only the occluder
    /// owning the corner
    pub fn with_vertex_rays_hitting_all_occluders(mut self, enabled: bool) -> Self {
        self.vertex_rays_hit_all_occluders = enabled;
        self
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Build the lit region around `light` bounded by `max_radius`
    ///
    /// Occluders with fewer than two vertices are skipped. With no occluders
    /// the result is `sample_count` points on the radius circle.
    pub fn build<'a>(
        &self,
        light: Vec2,
        max_radius: f32,
        occluders: impl IntoIterator<Item = &'a Occluder>,
    ) -> VisibilityPolygon {
        let valid: Vec<&Occluder> = occluders
            .into_iter()
            .filter(|occ| {
                if !occ.is_valid() {
                    log::warn!(
                        "[VisibilityPolygonBuilder::build] Skipping occluder with {} vertices",
                        occ.vertices.len()
                    );
                }
                occ.is_valid()
            })
            .collect();

        let mut angles = AngleSet::new(ANGLE_DEDUP_EPSILON);
        let mut rays: Vec<(f32, Vec2)> = Vec::with_capacity(self.sample_count + valid.len() * 12);

        // Corner rays, with a probe on each side to see past the silhouette
        for &occ in &valid {
            for vertex in occ.world_vertices() {
                let delta = vertex - light;
                let base = delta.y.atan2(delta.x);
                for offset in [-self.corner_probe_epsilon, 0.0, self.corner_probe_epsilon] {
                    let angle = normalize_angle(base + offset);
                    if !angles.insert(angle) {
                        continue;
                    }
                    let end = if self.vertex_rays_hit_all_occluders {
                        cast_ray(light, angle, max_radius, valid.iter().copied())
                    } else {
                        cast_ray(light, angle, max_radius, std::iter::once(occ))
                    };
                    rays.push((angle, end));
                }
            }
        }

        // Even coverage for unoccluded directions
        let corner_rays = rays.len();
        for i in 0..self.sample_count {
            let angle = normalize_angle(TAU * i as f32 / self.sample_count as f32);
            if !angles.insert(angle) {
                continue;
            }
            rays.push((angle, cast_ray(light, angle, max_radius, valid.iter().copied())));
        }

        rays.sort_by(|a, b| a.0.total_cmp(&b.0));
        log::trace!(
            "[VisibilityPolygonBuilder::build] {} occluders, {} corner rays, {} total",
            valid.len(),
            corner_rays,
            rays.len()
        );

        VisibilityPolygon {
            origin: light,
            points: rays.into_iter().map(|(_, p)| p).collect(),
        }
    }
}

/// Closest hit along a ray from `origin`, or the point at `max_radius`
/// Pure function - tests every edge of every given occluder
pub fn cast_ray<'a>(
    origin: Vec2,
    angle: f32,
    max_radius: f32,
    occluders: impl IntoIterator<Item = &'a Occluder>,
) -> Vec2 {
    let end = origin + Vec2::new(angle.cos(), angle.sin()) * max_radius;
    let mut closest_t = f32::INFINITY;
    let mut closest = end;

    for occ in occluders {
        for (a, b) in occ.world_edges() {
            if let Some(hit) = intersect_segments_param(origin, end, a, b) {
                if hit.t < closest_t {
                    closest_t = hit.t;
                    closest = hit.point;
                }
            }
        }
    }
    closest
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;

    #[test]
    fn test_no_occluders_samples_the_circle() {
        let light = vec2(50.0, -20.0);
        let none: Vec<Occluder> = Vec::new();
        let poly = VisibilityPolygonBuilder::new(256).build(light, 40.0, &none);

        assert_eq!(poly.len(), 256);
        for p in poly.points() {
            assert!((p.distance(light) - 40.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_points_are_sorted_by_angle() {
        let occ = Occluder::rectangle(vec2(20.0, 5.0), vec2(4.0, 4.0));
        let poly = VisibilityPolygonBuilder::new(64).build(Vec2::ZERO, 50.0, [&occ]);

        let angles: Vec<f32> = poly
            .points()
            .iter()
            .map(|p| normalize_angle(p.y.atan2(p.x)))
            .collect();
        for pair in angles.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-4, "{:?}", pair);
        }
    }

    #[test]
    fn test_boundary_never_enters_convex_occluder() {
        let center = vec2(25.0, 10.0);
        let half = vec2(5.0, 8.0);
        let occ = Occluder::rectangle(center, half);
        let poly = VisibilityPolygonBuilder::default().build(Vec2::ZERO, 100.0, [&occ]);

        // Strict interior: shrink the box slightly so boundary hits don't count
        let inner_min = center - half + Vec2::splat(1e-3);
        let inner_max = center + half - Vec2::splat(1e-3);
        for p in poly.points() {
            let inside = p.x > inner_min.x && p.x < inner_max.x && p.y > inner_min.y && p.y < inner_max.y;
            assert!(!inside, "boundary point {:?} inside occluder", p);
        }

        // The occluder's near face is on the boundary, the far side is shadowed
        assert!(poly.contains(vec2(15.0, 10.0)));
        assert!(!poly.contains(vec2(40.0, 10.0 * 40.0 / 25.0)));
        assert!(poly.len() > 256);
    }

    #[test]
    fn test_segment_occluder_casts_shadow() {
        let wall = Occluder::segment(vec2(10.0, -10.0), vec2(10.0, 10.0));
        let poly = VisibilityPolygonBuilder::default().build(Vec2::ZERO, 50.0, [&wall]);

        assert!(poly.contains(vec2(5.0, 0.0)));
        assert!(!poly.contains(vec2(30.0, 0.0)));
        assert!(poly.contains(vec2(-30.0, 0.0)));
    }

    #[test]
    fn test_degenerate_occluder_is_skipped() {
        let broken = Occluder::polygon(vec![vec2(5.0, 5.0)]);
        let poly = VisibilityPolygonBuilder::new(32).build(Vec2::ZERO, 10.0, [&broken]);
        assert_eq!(poly.len(), 32);
    }

    #[test]
    fn test_angle_set_is_circular() {
        let mut set = AngleSet::new(1e-4);
        assert!(set.insert(0.0));
        assert!(!set.insert(TAU - 1e-5));
        assert!(set.insert(1.0));
        assert!(!set.insert(1.0 + 1e-5));
        assert!(set.insert(1.0 + 1e-3));
    }

    #[test]
    fn test_cast_ray_picks_closest_edge() {
        let near = Occluder::segment(vec2(5.0, -1.0), vec2(5.0, 1.0));
        let far = Occluder::segment(vec2(8.0, -1.0), vec2(8.0, 1.0));
        let hit = cast_ray(Vec2::ZERO, 0.0, 20.0, [&far, &near]);
        assert!((hit - vec2(5.0, 0.0)).length() < 1e-5);

        let miss = cast_ray(Vec2::ZERO, std::f32::consts::PI, 20.0, [&far, &near]);
        assert!((miss - vec2(-20.0, 0.0)).length() < 1e-4);
    }
}
