use std::sync::Arc;

use glam::Vec2;
use image::Rgba;

use crate::config::LightingConfig;
use crate::constants::lighting::DEFAULT_KERNEL_CACHE_CAPACITY;
use crate::constants::surface::{CLEAR_COLOR, MAX_SURFACE_DIMENSION};
use crate::error::{allocation_error, resource_unavailable, LightingError, LightingResult};
use crate::geometry::aabb_intersects_circle;
use crate::lighting::{
    kernel_diameter, FalloffKernel, KernelCache, KernelCacheStats, LightSource, Occluder,
    VisibilityPolygonBuilder,
};
use crate::surface::{BlendMode, Color, CoverageQuad, PolygonMask, Surface};

/// Lifecycle of the lightmap surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightmapState {
    /// Surface allocated, drawn once per frame
    Active,
    /// A resize failed to allocate; draws are skipped until the next resize succeeds
    Lost,
    /// Terminal
    Disposed,
}

/// Per-frame lightmap statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightmapStats {
    pub lights_drawn: usize,
    /// Lights with no radius or intensity
    pub lights_skipped: usize,
    /// Lights entirely outside the lightmap
    pub lights_culled: usize,
    /// Occluders with fewer than two vertices
    pub occluders_skipped: usize,
    pub polygons_built: usize,
}

/// Result of a lightmap draw
#[derive(Debug)]
pub enum DrawOutcome {
    Drawn(LightmapStats),
    /// Nothing was drawn this frame; the error says why
    Skipped(LightingError),
}

impl DrawOutcome {
    pub fn is_drawn(&self) -> bool {
        matches!(self, DrawOutcome::Drawn(_))
    }

    pub fn stats(&self) -> Option<&LightmapStats> {
        match self {
            DrawOutcome::Drawn(stats) => Some(stats),
            DrawOutcome::Skipped(_) => None,
        }
    }
}

/// A light ready for batched submission
struct PreparedLight {
    kernel: Arc<FalloffKernel>,
    origin: (i32, i32),
    size: (u32, u32),
    center: Vec2,
    radius: f32,
    tint: [f32; 3],
    mask: Option<PolygonMask>,
}

/// Owns the off-screen lightmap and redraws it every frame
///
/// The lightmap is cleared to the ambient color, then every active light adds
/// its falloff kernel, clipped to its visibility polygon when occluders are
/// in range.
pub struct LightmapCompositor {
    surface: Option<Surface>,
    width: u32,
    height: u32,
    state: LightmapState,
    kernels: KernelCache,
    visibility: VisibilityPolygonBuilder,
}

impl LightmapCompositor {
    /// Allocate a lightmap of the given size with default settings
    pub fn new(width: u32, height: u32) -> LightingResult<Self> {
        Self::with_parts(
            width,
            height,
            KernelCache::new(DEFAULT_KERNEL_CACHE_CAPACITY),
            VisibilityPolygonBuilder::default(),
        )
    }

    /// Allocate a lightmap at the configured internal resolution
    pub fn from_config(config: &LightingConfig) -> LightingResult<Self> {
        let visibility = VisibilityPolygonBuilder::new(config.visibility_samples)
            .with_corner_probe_epsilon(config.corner_probe_epsilon)
            .with_vertex_rays_hitting_all_occluders(config.cast_vertex_rays_against_all_occluders);
        Self::with_parts(
            config.internal_width,
            config.internal_height,
            KernelCache::new(config.kernel_cache_capacity),
            visibility,
        )
    }

    fn with_parts(
        width: u32,
        height: u32,
        kernels: KernelCache,
        visibility: VisibilityPolygonBuilder,
    ) -> LightingResult<Self> {
        let surface = Surface::new(width, height).map_err(|e| {
            log::error!("[LightmapCompositor::new] Failed to allocate lightmap: {}", e);
            e
        })?;
        log::info!(
            "[LightmapCompositor::new] Created {}x{} lightmap {:?}",
            width,
            height,
            surface.id()
        );

        Ok(Self {
            surface: Some(surface),
            width,
            height,
            state: LightmapState::Active,
            kernels,
            visibility,
        })
    }

    pub fn state(&self) -> LightmapState {
        self.state
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Read-only handle to the lightmap, if one is allocated
    pub fn lightmap(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn kernel_cache_stats(&self) -> KernelCacheStats {
        self.kernels.stats()
    }

    /// Redraw the lightmap for one frame
    ///
    /// Unavailable inputs or a missing surface skip the frame (logged, `Ok`).
    /// Failing to allocate a falloff kernel is returned as `Err`.
    pub fn draw(
        &mut self,
        ambient: Color,
        lights: Option<&[LightSource]>,
        occluders: Option<&[Occluder]>,
    ) -> LightingResult<DrawOutcome> {
        let (lights, occluders) = match (self.state, lights, occluders) {
            (LightmapState::Disposed, _, _) => {
                return Ok(skip(resource_unavailable("lightmap", "compositor disposed")))
            }
            (LightmapState::Lost, _, _) => {
                return Ok(skip(resource_unavailable("lightmap", "surface lost, awaiting resize")))
            }
            (_, None, _) => return Ok(skip(resource_unavailable("lights", "light list unavailable"))),
            (_, _, None) => {
                return Ok(skip(resource_unavailable("occluders", "occluder list unavailable")))
            }
            (LightmapState::Active, Some(lights), Some(occluders)) => (lights, occluders),
        };

        let mut stats = LightmapStats::default();

        let valid_occluders: Vec<&Occluder> = occluders
            .iter()
            .enumerate()
            .filter(|(index, occ)| {
                if !occ.is_valid() {
                    log::warn!(
                        "[LightmapCompositor::draw] {}",
                        LightingError::InvalidGeometry {
                            index: *index,
                            vertex_count: occ.vertices.len(),
                        }
                    );
                    stats.occluders_skipped += 1;
                }
                occ.is_valid()
            })
            .map(|(_, occ)| occ)
            .collect();

        let prepared = self.prepare_lights(lights, &valid_occluders, &mut stats)?;

        let Some(surface) = self.surface.as_mut() else {
            return Ok(skip(resource_unavailable("lightmap", "surface not allocated")));
        };

        surface.clear(Rgba(CLEAR_COLOR));
        surface.fill(ambient, BlendMode::Opaque);

        let quads: Vec<CoverageQuad<'_>> = prepared
            .iter()
            .map(|light| CoverageQuad {
                origin: light.origin,
                width: light.size.0,
                height: light.size.1,
                center: light.center,
                radius: light.radius,
                coverage: light.kernel.coverage(),
                side: light.kernel.diameter(),
                tint: light.tint,
                mask: light.mask.as_ref(),
            })
            .collect();
        surface.submit_batch(&quads, BlendMode::Additive);

        log::debug!(
            "[LightmapCompositor::draw] {} lights drawn, {} skipped, {} culled, {} shadow polygons",
            stats.lights_drawn,
            stats.lights_skipped,
            stats.lights_culled,
            stats.polygons_built
        );
        Ok(DrawOutcome::Drawn(stats))
    }

    fn prepare_lights(
        &mut self,
        lights: &[LightSource],
        occluders: &[&Occluder],
        stats: &mut LightmapStats,
    ) -> LightingResult<Vec<PreparedLight>> {
        let mut prepared = Vec::with_capacity(lights.len());

        for light in lights {
            if !light.is_active() {
                stats.lights_skipped += 1;
                continue;
            }

            let diameter = kernel_diameter(light.radius);
            if diameter > MAX_SURFACE_DIMENSION {
                let err = allocation_error(
                    diameter,
                    diameter,
                    format!(
                        "light radius {} needs a falloff kernel beyond maximum dimension {}",
                        light.radius, MAX_SURFACE_DIMENSION
                    ),
                );
                log::error!("[LightmapCompositor::draw] Failed to allocate falloff kernel: {}", err);
                return Err(err);
            }

            // Footprint covers every pixel whose center can fall inside the light's circle
            let bounds = light.bounds();
            let x0 = bounds.min.x.floor() as i64;
            let y0 = bounds.min.y.floor() as i64;
            let x1 = bounds.max.x.ceil() as i64;
            let y1 = bounds.max.y.ceil() as i64;
            if x1 <= 0 || y1 <= 0 || x0 >= self.width as i64 || y0 >= self.height as i64 {
                stats.lights_culled += 1;
                continue;
            }
            let origin = (x0 as i32, y0 as i32);
            let size = ((x1 - x0) as u32, (y1 - y0) as u32);

            let kernel = self.kernels.get(diameter).map_err(|e| {
                log::error!("[LightmapCompositor::draw] Failed to allocate falloff kernel: {}", e);
                e
            })?;

            let in_range: Vec<&Occluder> = occluders
                .iter()
                .copied()
                .filter(|occ| {
                    occ.bounds()
                        .map(|b| aabb_intersects_circle(&b, light.position, light.radius))
                        .unwrap_or(false)
                })
                .collect();

            let mask = if in_range.is_empty() {
                None
            } else {
                let polygon = self.visibility.build(light.position, light.radius, in_range);
                stats.polygons_built += 1;
                Some(PolygonMask::rasterize(polygon.points(), origin, size.0, size.1))
            };

            prepared.push(PreparedLight {
                kernel,
                origin,
                size,
                center: light.position,
                radius: light.radius,
                tint: light.tint(),
                mask,
            });
            stats.lights_drawn += 1;
        }

        Ok(prepared)
    }

    /// Recreate the lightmap at a new internal resolution
    ///
    /// The old surface is released before the new one is allocated. On
    /// failure the compositor is left `Lost` and the error is returned.
    pub fn resize(&mut self, width: u32, height: u32) -> LightingResult<()> {
        if self.state == LightmapState::Disposed {
            return Err(resource_unavailable("lightmap", "compositor disposed"));
        }
        if self.state == LightmapState::Active && (width, height) == (self.width, self.height) {
            return Ok(());
        }

        if let Some(old) = self.surface.take() {
            log::info!(
                "[LightmapCompositor::resize] Disposing {}x{} lightmap {:?}",
                old.width(),
                old.height(),
                old.id()
            );
        }

        match Surface::new(width, height) {
            Ok(surface) => {
                log::info!(
                    "[LightmapCompositor::resize] Allocated {}x{} lightmap {:?}",
                    width,
                    height,
                    surface.id()
                );
                self.surface = Some(surface);
                self.width = width;
                self.height = height;
                self.state = LightmapState::Active;
                Ok(())
            }
            Err(e) => {
                log::error!("[LightmapCompositor::resize] {}", e);
                self.state = LightmapState::Lost;
                Err(e)
            }
        }
    }

    /// Release the lightmap and every cached kernel
    pub fn dispose(&mut self) {
        if self.state == LightmapState::Disposed {
            return;
        }
        if let Some(surface) = self.surface.take() {
            log::info!("[LightmapCompositor::dispose] Disposing lightmap {:?}", surface.id());
        }
        self.kernels.clear();
        self.state = LightmapState::Disposed;
    }
}

fn skip(reason: LightingError) -> DrawOutcome {
    log::warn!("[LightmapCompositor::draw] Skipping lightmap for this frame: {}", reason);
    DrawOutcome::Skipped(reason)
}
