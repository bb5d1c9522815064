mod compositor;
mod context;

pub use compositor::{Compositor, Letterbox};
pub use context::LightingContext;
