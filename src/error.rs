//! Lighting error handling
//!
//! One error type for the whole crate. Recoverable conditions (an unavailable
//! render target, a malformed occluder) are logged and skipped by the callers
//! that hit them; allocation failures always reach the caller.

/// Result type for lighting operations
pub type LightingResult<T> = Result<T, LightingError>;

#[derive(Debug, thiserror::Error)]
pub enum LightingError {
    #[error("Resource unavailable: {resource}: {reason}")]
    ResourceUnavailable { resource: String, reason: String },

    #[error("Invalid occluder geometry at index {index}: {vertex_count} vertices (need at least 2)")]
    InvalidGeometry { index: usize, vertex_count: usize },

    #[error("Surface allocation failed ({width}x{height}): {reason}")]
    AllocationFailed {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl LightingError {
    /// Whether the frame loop can continue after this error.
    ///
    /// Recoverable errors degrade a single frame; the next frame retries.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LightingError::ResourceUnavailable { .. } | LightingError::InvalidGeometry { .. }
        )
    }
}

/// Create a resource unavailable error
pub fn resource_unavailable(resource: &str, reason: impl std::fmt::Display) -> LightingError {
    LightingError::ResourceUnavailable {
        resource: resource.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a surface allocation error
pub fn allocation_error(width: u32, height: u32, reason: impl std::fmt::Display) -> LightingError {
    LightingError::AllocationFailed {
        width,
        height,
        reason: reason.to_string(),
    }
}

/// Create a configuration error
pub fn config_error(field: &str, reason: impl std::fmt::Display) -> LightingError {
    LightingError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
