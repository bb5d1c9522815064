//! CPU render targets
//!
//! Surfaces are RGBA8 pixel buffers backed by `image::RgbaImage`. Rows are
//! processed in parallel with rayon; every operation is synchronous.

pub mod blend;
pub mod mask;

pub use blend::{blend_pixel, mul_div255, BlendMode, Filter};
pub use mask::PolygonMask;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::constants::surface::{BYTES_PER_PIXEL, MAX_SURFACE_DIMENSION};
use crate::error::{allocation_error, LightingResult};

/// RGBA8 color
pub type Color = Rgba<u8>;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of an allocated surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    fn next() -> Self {
        SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Destination rectangle in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// A square radial coverage image stretched over a circle, tinted and
/// blended into a surface as part of a batch
#[derive(Debug, Clone, Copy)]
pub struct CoverageQuad<'a> {
    /// Top-left corner of the destination footprint
    pub origin: (i32, i32),
    pub width: u32,
    pub height: u32,
    /// Circle the coverage is stretched over, in destination pixels.
    /// Pixels whose centers lie at or beyond `radius` receive nothing.
    pub center: Vec2,
    pub radius: f32,
    /// Row-major coverage in `[0, 1]`, `side * side` entries
    pub coverage: &'a [f32],
    pub side: u32,
    /// Linear RGB multiplier applied to the coverage (may exceed 1)
    pub tint: [f32; 3],
    /// Pixels the mask does not cover receive nothing
    pub mask: Option<&'a PolygonMask>,
}

impl CoverageQuad<'_> {
    /// Source color for destination pixel `(x, y)`, sampled nearest
    #[inline]
    fn source_pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        if self.side == 0 || self.radius <= 0.0 {
            return None;
        }
        let offset = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - self.center;
        if offset.length_squared() >= self.radius * self.radius {
            return None;
        }

        let half = self.side as f32 * 0.5;
        let k = offset * (half / self.radius) + Vec2::splat(half);
        let last = self.side - 1;
        let kx = (k.x.max(0.0) as u32).min(last) as usize;
        let ky = (k.y.max(0.0) as u32).min(last) as usize;
        let c = self.coverage.get(ky * self.side as usize + kx).copied()?;

        let channel = |t: f32| (c * t * 255.0).round().clamp(0.0, 255.0) as u8;
        Some([
            channel(self.tint[0]),
            channel(self.tint[1]),
            channel(self.tint[2]),
            channel(1.0),
        ])
    }
}

/// Off-screen RGBA8 render target
pub struct Surface {
    id: SurfaceId,
    image: RgbaImage,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl Surface {
    /// Allocate a surface cleared to transparent black
    ///
    /// Fails with `AllocationFailed` for zero-sized or oversized surfaces and
    /// when the pixel buffer cannot be reserved.
    pub fn new(width: u32, height: u32) -> LightingResult<Self> {
        if width == 0 || height == 0 {
            return Err(allocation_error(width, height, "zero-sized surface"));
        }
        if width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION {
            return Err(allocation_error(
                width,
                height,
                format!("exceeds maximum dimension {}", MAX_SURFACE_DIMENSION),
            ));
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| allocation_error(width, height, "size overflow"))?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| allocation_error(width, height, e))?;
        data.resize(len, 0);

        let image = RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| allocation_error(width, height, "buffer size mismatch"))?;

        let id = SurfaceId::next();
        log::debug!("[Surface::new] Allocated {:?} ({}x{})", id, width, height);

        Ok(Self { id, image })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Read a pixel; None outside the surface
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(*self.image.get_pixel(x, y))
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width() && y < self.height() {
            self.image.put_pixel(x, y, color);
        }
    }

    /// Read-only view of the pixels
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Overwrite every pixel
    pub fn clear(&mut self, color: Color) {
        self.fill(color, BlendMode::Opaque);
    }

    /// Blend a full-surface quad of one color
    pub fn fill(&mut self, color: Color, blend: BlendMode) {
        let src = color.0;
        self.rows_mut().for_each(|(_, row)| {
            for px in row.chunks_exact_mut(BYTES_PER_PIXEL) {
                blend_pixel(blend, px, src);
            }
        });
    }

    /// Blend a rectangle of one color, clipped to the surface
    pub fn fill_rect(&mut self, rect: Rect, color: Color, blend: BlendMode) {
        let (x0, x1) = clip_span(rect.x, rect.width, self.width());
        let (y0, y1) = clip_span(rect.y, rect.height, self.height());
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let src = color.0;
        self.rows_mut()
            .filter(|(y, _)| *y >= y0 && *y < y1)
            .for_each(|(_, row)| {
                for px in row[x0 * BYTES_PER_PIXEL..x1 * BYTES_PER_PIXEL].chunks_exact_mut(BYTES_PER_PIXEL) {
                    blend_pixel(blend, px, src);
                }
            });
    }

    /// Draw `src` stretched over `dest`, clipped to this surface
    ///
    /// Destination pixel centers map back onto source pixel centers, so two
    /// blits with the same `dest` sample identical source coordinates.
    pub fn blit_scaled(&mut self, src: &Surface, dest: Rect, filter: Filter, blend: BlendMode) {
        let (x0, x1) = clip_span(dest.x, dest.width, self.width());
        let (y0, y1) = clip_span(dest.y, dest.height, self.height());
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let scale_x = src.width() as f32 / dest.width as f32;
        let scale_y = src.height() as f32 / dest.height as f32;
        let source = &src.image;

        self.rows_mut()
            .filter(|(y, _)| *y >= y0 && *y < y1)
            .for_each(|(y, row)| {
                let sy = (y as f32 - dest.y as f32 + 0.5) * scale_y - 0.5;
                for x in x0..x1 {
                    let sx = (x as f32 - dest.x as f32 + 0.5) * scale_x - 0.5;
                    let sample = match filter {
                        Filter::Nearest => sample_nearest(source, sx, sy),
                        Filter::Linear => sample_bilinear(source, sx, sy),
                    };
                    blend_pixel(blend, &mut row[x * BYTES_PER_PIXEL..(x + 1) * BYTES_PER_PIXEL], sample);
                }
            });
    }

    /// Blend a batch of coverage quads with a single blend mode
    ///
    /// Quads are applied in slice order for every pixel.
    pub fn submit_batch(&mut self, quads: &[CoverageQuad<'_>], blend: BlendMode) {
        if quads.is_empty() {
            return;
        }
        let width = self.width() as i32;

        self.rows_mut().for_each(|(y, row)| {
            let y = y as i32;
            for quad in quads {
                let ly = y - quad.origin.1;
                if ly < 0 || ly >= quad.height as i32 {
                    continue;
                }
                let x_start = quad.origin.0.max(0);
                let x_end = (quad.origin.0 + quad.width as i32).min(width);
                for x in x_start..x_end {
                    if let Some(mask) = quad.mask {
                        if !mask.covers(x, y) {
                            continue;
                        }
                    }
                    if let Some(src) = quad.source_pixel(x, y) {
                        let offset = x as usize * BYTES_PER_PIXEL;
                        blend_pixel(blend, &mut row[offset..offset + BYTES_PER_PIXEL], src);
                    }
                }
            }
        });
    }

    /// Write the surface to a PNG file
    pub fn save_png(&self, path: impl AsRef<Path>) -> LightingResult<()> {
        self.image.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
        log::info!("[Surface::save_png] Saved {:?} to {}", self.id, path.as_ref().display());
        Ok(())
    }

    fn rows_mut(&mut self) -> impl IndexedParallelIterator<Item = (usize, &mut [u8])> {
        let row_bytes = self.width() as usize * BYTES_PER_PIXEL;
        let pixels: &mut [u8] = &mut self.image;
        pixels.par_chunks_mut(row_bytes).enumerate()
    }
}

/// Clip `[start, start + len)` to `[0, limit)`
fn clip_span(start: i32, len: u32, limit: u32) -> (usize, usize) {
    let begin = (start as i64).clamp(0, limit as i64);
    let end = (start as i64 + len as i64).clamp(0, limit as i64);
    (begin as usize, end as usize)
}

fn sample_nearest(image: &RgbaImage, sx: f32, sy: f32) -> [u8; 4] {
    let x = (sx.round() as i64).clamp(0, image.width() as i64 - 1) as u32;
    let y = (sy.round() as i64).clamp(0, image.height() as i64 - 1) as u32;
    image.get_pixel(x, y).0
}

fn sample_bilinear(image: &RgbaImage, sx: f32, sy: f32) -> [u8; 4] {
    let max_x = image.width() as i64 - 1;
    let max_y = image.height() as i64 - 1;
    let fx = sx.floor();
    let fy = sy.floor();
    let tx = sx - fx;
    let ty = sy - fy;

    let x0 = (fx as i64).clamp(0, max_x) as u32;
    let x1 = (fx as i64 + 1).clamp(0, max_x) as u32;
    let y0 = (fy as i64).clamp(0, max_y) as u32;
    let y1 = (fy as i64 + 1).clamp(0, max_y) as u32;

    let p00 = image.get_pixel(x0, y0).0;
    let p10 = image.get_pixel(x1, y0).0;
    let p01 = image.get_pixel(x0, y1).0;
    let p11 = image.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f32 + (p10[c] as f32 - p00[c] as f32) * tx;
        let bottom = p01[c] as f32 + (p11[c] as f32 - p01[c] as f32) * tx;
        out[c] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_limits() {
        assert!(Surface::new(0, 10).is_err());
        assert!(Surface::new(10, MAX_SURFACE_DIMENSION + 1).is_err());

        let surface = Surface::new(4, 3).unwrap();
        assert_eq!(surface.size(), (4, 3));
        assert_eq!(surface.pixel(3, 2), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(surface.pixel(4, 0), None);
    }

    #[test]
    fn test_surface_ids_are_unique() {
        let a = Surface::new(1, 1).unwrap();
        let b = Surface::new(1, 1).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_clear_and_fill_rect() {
        let mut surface = Surface::new(8, 8).unwrap();
        surface.clear(Rgba([10, 20, 30, 255]));
        surface.fill_rect(Rect::new(-2, 6, 4, 10), Rgba([255, 0, 0, 255]), BlendMode::Opaque);

        assert_eq!(surface.pixel(0, 7), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(surface.pixel(1, 6), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(surface.pixel(2, 6), Some(Rgba([10, 20, 30, 255])));
        assert_eq!(surface.pixel(0, 5), Some(Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn test_fill_rect_alpha_blends_over_scene() {
        let mut surface = Surface::new(4, 4).unwrap();
        surface.clear(Rgba([100, 100, 100, 255]));
        surface.fill_rect(Rect::new(0, 0, 2, 4), Rgba([200, 0, 0, 128]), BlendMode::Alpha);

        assert_eq!(surface.pixel(1, 3), Some(Rgba([150, 50, 50, 255])));
        assert_eq!(surface.pixel(2, 3), Some(Rgba([100, 100, 100, 255])));
    }

    #[test]
    fn test_blit_identity_scale_copies_pixels() {
        let mut src = Surface::new(4, 4).unwrap();
        src.put_pixel(1, 2, Rgba([200, 100, 50, 255]));

        for filter in [Filter::Nearest, Filter::Linear] {
            let mut dst = Surface::new(4, 4).unwrap();
            dst.blit_scaled(&src, Rect::new(0, 0, 4, 4), filter, BlendMode::Opaque);
            assert_eq!(dst.as_image(), src.as_image());
        }
    }

    #[test]
    fn test_blit_upscale_nearest() {
        let mut src = Surface::new(2, 1).unwrap();
        src.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        src.put_pixel(1, 0, Rgba([0, 0, 255, 255]));

        let mut dst = Surface::new(6, 2).unwrap();
        dst.blit_scaled(&src, Rect::new(1, 0, 4, 2), Filter::Nearest, BlendMode::Opaque);

        assert_eq!(dst.pixel(0, 0), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(dst.pixel(1, 1), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(dst.pixel(4, 0), Some(Rgba([0, 0, 255, 255])));
        assert_eq!(dst.pixel(5, 0), Some(Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn test_batch_respects_mask_and_bounds() {
        let coverage = vec![1.0f32; 9];
        let square = [
            glam::vec2(-1.0, -1.0),
            glam::vec2(1.0, -1.0),
            glam::vec2(1.0, 1.0),
            glam::vec2(-1.0, 1.0),
        ];
        let mask = PolygonMask::rasterize(&square, (-3, -3), 6, 6);
        let quad = CoverageQuad {
            origin: (-3, -3),
            width: 6,
            height: 6,
            center: Vec2::ZERO,
            radius: 2.5,
            coverage: &coverage,
            side: 3,
            tint: [1.0, 0.5, 0.0],
            mask: Some(&mask),
        };

        let mut surface = Surface::new(3, 3).unwrap();
        surface.clear(Rgba([0, 0, 0, 255]));
        surface.submit_batch(&[quad], BlendMode::Additive);

        assert_eq!(surface.pixel(0, 0), Some(Rgba([255, 128, 0, 255])));
        // Inside the radius but outside the mask
        assert_eq!(surface.pixel(1, 0), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(surface.pixel(0, 1), Some(Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_batch_stops_at_quad_radius() {
        let coverage = vec![1.0f32; 9];
        let quad = CoverageQuad {
            origin: (0, 0),
            width: 4,
            height: 4,
            center: glam::vec2(2.0, 2.0),
            radius: 1.5,
            coverage: &coverage,
            side: 3,
            tint: [1.0, 1.0, 1.0],
            mask: None,
        };

        let mut surface = Surface::new(4, 4).unwrap();
        surface.clear(Rgba([0, 0, 0, 255]));
        surface.submit_batch(&[quad], BlendMode::Additive);

        let white = Some(Rgba([255, 255, 255, 255]));
        let black = Some(Rgba([0, 0, 0, 255]));
        assert_eq!(surface.pixel(1, 1), white);
        assert_eq!(surface.pixel(2, 1), white);
        // Pixel centers 2.12 and 1.58 from the center
        assert_eq!(surface.pixel(0, 0), black);
        assert_eq!(surface.pixel(2, 0), black);
    }

    #[test]
    fn test_batch_stretches_coverage_over_radius() {
        // Left column 0, right column 1
        let coverage = vec![0.0f32, 1.0, 0.0, 1.0];
        let quad = CoverageQuad {
            origin: (0, 0),
            width: 8,
            height: 8,
            center: glam::vec2(4.0, 4.0),
            radius: 4.0,
            coverage: &coverage,
            side: 2,
            tint: [1.0, 1.0, 1.0],
            mask: None,
        };

        let mut surface = Surface::new(8, 8).unwrap();
        surface.clear(Rgba([0, 0, 0, 255]));
        surface.submit_batch(&[quad], BlendMode::Additive);

        assert_eq!(surface.pixel(1, 4), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(surface.pixel(3, 4), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(surface.pixel(4, 4), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(surface.pixel(6, 4), Some(Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surface.png");
        let mut surface = Surface::new(2, 2).unwrap();
        surface.clear(Rgba([1, 2, 3, 255]));
        surface.save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.get_pixel(1, 1), &Rgba([1, 2, 3, 255]));
    }
}
