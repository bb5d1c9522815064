use std::sync::Arc;

use image::{GrayImage, ImageBuffer, Luma};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::constants::surface::MAX_SURFACE_DIMENSION;
use crate::error::{allocation_error, LightingResult};

/// Falloff at `distance` from a light of the given radius
/// Pure function - `(1 - clamp(d / r, 0, 1))^2`
#[inline]
pub fn falloff_alpha(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    let t = (distance / radius).clamp(0.0, 1.0);
    (1.0 - t) * (1.0 - t)
}

/// Kernel size for a light radius: `2 * ceil(radius)`
/// Pure function - non-positive radii map to 0
pub fn kernel_diameter(radius: f32) -> u32 {
    if radius <= 0.0 || !radius.is_finite() {
        return 0;
    }
    (radius.ceil() as u32).saturating_mul(2)
}

/// Square image of alpha falloff around its center
pub struct FalloffKernel {
    diameter: u32,
    alpha: ImageBuffer<Luma<f32>, Vec<f32>>,
}

impl std::fmt::Debug for FalloffKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FalloffKernel")
            .field("diameter", &self.diameter)
            .finish()
    }
}

impl FalloffKernel {
    /// Generate the kernel for a diameter
    ///
    /// Each pixel stores the falloff at the distance from its center to the
    /// image center, with radius `diameter / 2`.
    pub fn generate(diameter: u32) -> LightingResult<Self> {
        if diameter == 0 {
            return Err(allocation_error(0, 0, "zero-sized falloff kernel"));
        }
        if diameter > MAX_SURFACE_DIMENSION {
            return Err(allocation_error(
                diameter,
                diameter,
                format!("falloff kernel exceeds maximum dimension {}", MAX_SURFACE_DIMENSION),
            ));
        }

        let side = diameter as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(side * side)
            .map_err(|e| allocation_error(diameter, diameter, e))?;
        data.resize(side * side, 0.0f32);

        let radius = diameter as f32 * 0.5;
        data.par_chunks_mut(side).enumerate().for_each(|(y, row)| {
            let dy = y as f32 + 0.5 - radius;
            for (x, alpha) in row.iter_mut().enumerate() {
                let dx = x as f32 + 0.5 - radius;
                *alpha = falloff_alpha((dx * dx + dy * dy).sqrt(), radius);
            }
        });

        let alpha = ImageBuffer::from_raw(diameter, diameter, data)
            .ok_or_else(|| allocation_error(diameter, diameter, "buffer size mismatch"))?;

        log::debug!("[FalloffKernel::generate] Generated {}x{} kernel", diameter, diameter);
        Ok(Self { diameter, alpha })
    }

    pub fn diameter(&self) -> u32 {
        self.diameter
    }

    pub fn radius(&self) -> f32 {
        self.diameter as f32 * 0.5
    }

    /// Alpha of a kernel pixel; 0 outside the kernel
    pub fn alpha_at(&self, x: u32, y: u32) -> f32 {
        if x >= self.diameter || y >= self.diameter {
            return 0.0;
        }
        self.alpha.get_pixel(x, y).0[0]
    }

    /// Row-major alpha values
    pub fn coverage(&self) -> &[f32] {
        self.alpha.as_raw()
    }

    /// 8-bit grayscale copy for inspection
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.diameter, self.diameter, |x, y| {
            Luma([(self.alpha_at(x, y) * 255.0).round() as u8])
        })
    }
}

/// Statistics about kernel cache performance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entry_count: usize,
    pub capacity: usize,
}

/// LRU cache of falloff kernels keyed by diameter
///
/// Kernels are shared through `Arc`; an evicted kernel is freed once the last
/// frame batch holding it is dropped.
pub struct KernelCache {
    capacity: usize,
    entries: FxHashMap<u32, Arc<FalloffKernel>>,
    access_order: Vec<u32>,
    stats: KernelCacheStats,
}

impl KernelCache {
    /// A capacity of 0 is treated as 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: FxHashMap::default(),
            access_order: Vec::with_capacity(capacity),
            stats: KernelCacheStats {
                capacity,
                ..Default::default()
            },
        }
    }

    /// Get the kernel for a diameter, generating it on a miss
    pub fn get(&mut self, diameter: u32) -> LightingResult<Arc<FalloffKernel>> {
        if let Some(kernel) = self.entries.get(&diameter) {
            let kernel = Arc::clone(kernel);
            self.touch(diameter);
            self.stats.hits += 1;
            return Ok(kernel);
        }

        self.stats.misses += 1;
        let kernel = Arc::new(FalloffKernel::generate(diameter)?);

        while self.entries.len() >= self.capacity && !self.access_order.is_empty() {
            let evicted = self.access_order.remove(0);
            if self.entries.remove(&evicted).is_some() {
                self.stats.evictions += 1;
                log::debug!("[KernelCache::get] Evicted {}px kernel", evicted);
            }
        }

        self.entries.insert(diameter, Arc::clone(&kernel));
        self.access_order.push(diameter);
        self.stats.entry_count = self.entries.len();
        Ok(kernel)
    }

    /// Get the kernel sized for a light radius
    pub fn get_for_radius(&mut self, radius: f32) -> LightingResult<Arc<FalloffKernel>> {
        self.get(kernel_diameter(radius))
    }

    pub fn contains(&self, diameter: u32) -> bool {
        self.entries.contains_key(&diameter)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> KernelCacheStats {
        self.stats.clone()
    }

    /// Drop every cached kernel
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_order.clear();
        self.stats.entry_count = 0;
    }

    fn touch(&mut self, diameter: u32) {
        self.access_order.retain(|&d| d != diameter);
        self.access_order.push(diameter);
    }
}
