pub mod falloff;
pub mod lightmap;
pub mod provider;
pub mod visibility;

pub use falloff::{falloff_alpha, kernel_diameter, FalloffKernel, KernelCache, KernelCacheStats};
pub use lightmap::{DrawOutcome, LightmapCompositor, LightmapState, LightmapStats};
pub use provider::{LightProvider, OccluderProvider};
pub use visibility::{VisibilityPolygon, VisibilityPolygonBuilder};

use glam::Vec2;

use crate::geometry::{aabb_from_points, Aabb2};
use crate::surface::Color;

/// A soft radial point light, supplied fresh every frame
///
/// Position and radius are in lightmap pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    pub position: Vec2,
    pub radius: f32,
    pub color: Color,
    pub intensity: f32,
}

impl LightSource {
    pub fn new(position: Vec2, radius: f32, color: Color, intensity: f32) -> Self {
        Self {
            position,
            radius,
            color,
            intensity,
        }
    }

    /// Whether the light contributes anything to the lightmap
    pub fn is_active(&self) -> bool {
        self.position.is_finite()
            && self.radius.is_finite()
            && self.intensity.is_finite()
            && self.radius > 0.0
            && self.intensity > 0.0
    }

    /// Color scaled by intensity, in linear `[0, intensity]` units
    pub fn tint(&self) -> [f32; 3] {
        let [r, g, b, _] = self.color.0;
        [
            r as f32 / 255.0 * self.intensity,
            g as f32 / 255.0 * self.intensity,
            b as f32 / 255.0 * self.intensity,
        ]
    }

    pub fn bounds(&self) -> Aabb2 {
        Aabb2 {
            min: self.position - Vec2::splat(self.radius),
            max: self.position + Vec2::splat(self.radius),
        }
    }
}

/// A shape that blocks light
///
/// `vertices` are local to `position`. Two vertices form an open segment,
/// three or more a closed polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Occluder {
    pub vertices: Vec<Vec2>,
    pub position: Vec2,
}

impl Occluder {
    pub fn polygon(vertices: Vec<Vec2>) -> Self {
        Self {
            vertices,
            position: Vec2::ZERO,
        }
    }

    pub fn segment(a: Vec2, b: Vec2) -> Self {
        Self::polygon(vec![a, b])
    }

    /// Axis-aligned box around `center`
    pub fn rectangle(center: Vec2, half_extents: Vec2) -> Self {
        let h = half_extents;
        Self {
            vertices: vec![
                Vec2::new(-h.x, -h.y),
                Vec2::new(h.x, -h.y),
                Vec2::new(h.x, h.y),
                Vec2::new(-h.x, h.y),
            ],
            position: center,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Occluders need at least two vertices
    pub fn is_valid(&self) -> bool {
        self.vertices.len() >= 2
    }

    pub fn world_vertices(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.vertices.iter().map(move |&v| v + self.position)
    }

    /// Consecutive vertex pairs plus the closing edge; empty when invalid
    pub fn world_edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = if self.is_valid() { self.vertices.len() } else { 0 };
        (0..n).map(move |i| {
            (
                self.vertices[i] + self.position,
                self.vertices[(i + 1) % n] + self.position,
            )
        })
    }

    pub fn bounds(&self) -> Option<Aabb2> {
        aabb_from_points(self.world_vertices())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;
    use image::Rgba;

    #[test]
    fn test_light_activity() {
        let white = Rgba([255, 255, 255, 255]);
        assert!(LightSource::new(Vec2::ZERO, 10.0, white, 1.0).is_active());
        assert!(!LightSource::new(Vec2::ZERO, 0.0, white, 1.0).is_active());
        assert!(!LightSource::new(Vec2::ZERO, 10.0, white, 0.0).is_active());
        assert!(!LightSource::new(Vec2::ZERO, -5.0, white, 1.0).is_active());
        assert!(!LightSource::new(vec2(f32::NAN, 0.0), 10.0, white, 1.0).is_active());
    }

    #[test]
    fn test_tint_scales_by_intensity() {
        let light = LightSource::new(Vec2::ZERO, 10.0, Rgba([255, 0, 51, 255]), 2.0);
        assert_eq!(light.tint(), [2.0, 0.0, 0.4]);
    }

    #[test]
    fn test_occluder_edges_wrap_around() {
        let occ = Occluder::rectangle(vec2(10.0, 10.0), vec2(1.0, 2.0));
        let edges: Vec<_> = occ.world_edges().collect();
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[3], (vec2(9.0, 12.0), vec2(9.0, 8.0)));

        let bounds = occ.bounds().unwrap();
        assert_eq!(bounds.min, vec2(9.0, 8.0));
        assert_eq!(bounds.max, vec2(11.0, 12.0));
    }

    #[test]
    fn test_invalid_occluder_has_no_edges() {
        let occ = Occluder::polygon(vec![vec2(1.0, 1.0)]);
        assert!(!occ.is_valid());
        assert_eq!(occ.world_edges().count(), 0);
    }
}
