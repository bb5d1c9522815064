// Lighting constants - single source of truth for every tunable default.

/// Surface limits
pub mod surface {
    /// Largest width or height accepted for any surface or kernel
    pub const MAX_SURFACE_DIMENSION: u32 = 16384;
    pub const BYTES_PER_PIXEL: usize = 4;
    /// Color of the letterbox bars and of a freshly cleared render target
    pub const CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];
}

/// Light and shadow constants
pub mod lighting {
    pub const DEFAULT_AMBIENT: [u8; 4] = [32, 32, 48, 255];
    pub const DEFAULT_KERNEL_CACHE_CAPACITY: usize = 32;

    /// Evenly spaced rays cast per light for circular coverage
    pub const DEFAULT_VISIBILITY_SAMPLES: usize = 256;
    pub const MIN_VISIBILITY_SAMPLES: usize = 3;

    /// Angular offset probed on each side of an occluder corner (radians)
    pub const CORNER_PROBE_EPSILON: f32 = 1e-4;
    /// Two ray angles closer than this are the same ray (radians).
    /// Must stay below CORNER_PROBE_EPSILON.
    pub const ANGLE_DEDUP_EPSILON: f32 = 1e-6;
}

/// Render resolution defaults
pub mod display {
    pub const DEFAULT_INTERNAL_WIDTH: u32 = 1280;
    pub const DEFAULT_INTERNAL_HEIGHT: u32 = 720;
}
