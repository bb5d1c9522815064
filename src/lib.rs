//! Real-time 2D lighting: an ambient-plus-point-light lightmap with optional
//! polygon shadows, composited multiplicatively over a rendered scene.
//!
//! Per frame: render the scene into [`LightingContext::begin_frame`], then
//! hand lights and occluders to [`LightingContext::end_frame`] to get the
//! composited display surface.

pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod lighting;
pub mod renderer;
pub mod surface;

pub use config::LightingConfig;
pub use error::{LightingError, LightingResult};
pub use lighting::{
    DrawOutcome, LightProvider, LightSource, LightmapCompositor, LightmapState, LightmapStats,
    Occluder, OccluderProvider, VisibilityPolygon, VisibilityPolygonBuilder,
};
pub use renderer::{Compositor, LightingContext, Letterbox};
pub use surface::{BlendMode, Color, Filter, Surface, SurfaceId};
