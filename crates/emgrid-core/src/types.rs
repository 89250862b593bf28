//! Core types and fixed constants for the field-strength engine
//!
//! This module defines the physical constants the engine treats as part of
//! its contract (they are not exposed through configuration) and the error
//! type shared by the request boundary and the point-query surface.

/// Mean Earth radius in kilometres (IUGG mean radius).
pub const MEAN_EARTH_RADIUS_KM: f64 = 6371.0088;

/// Effective-earth-radius factor approximating standard atmospheric refraction.
pub const EFFECTIVE_EARTH_K: f64 = 4.0 / 3.0;

/// Effective Earth radius in kilometres (k * R_E).
pub const EFFECTIVE_EARTH_RADIUS_KM: f64 = EFFECTIVE_EARTH_K * MEAN_EARTH_RADIUS_KM;

/// Free-space wave impedance in ohms.
pub const FREE_SPACE_IMPEDANCE_OHMS: f64 = 377.0;

/// Speed of light in m/s.
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Number of dominant contributors retained per grid cell.
pub const TOP_K: usize = 3;

/// Maximum number of sources accepted in a single request.
pub const MAX_SOURCES: usize = 50;

/// Maximum region extent per axis in kilometres.
pub const MAX_REGION_EXTENT_KM: f64 = 200.0;

/// Default no-data threshold in dBµV/m.
pub const DEFAULT_THRESHOLD_DBUV_PER_M: f64 = 40.0;

/// Default influence buffer for source culling in kilometres.
pub const DEFAULT_INFLUENCE_BUFFER_KM: f64 = 200.0;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the compute engine and its query surface
///
/// Numeric degeneracies (zero range, zero power) are guarded internally with
/// epsilon floors and never reach this enum.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("invalid request at `{field}`: {reason}")]
    InvalidRequest { field: String, reason: String },

    #[error("unsupported option `{option}` = {value:?}; this engine is fixed to {supported:?}")]
    UnsupportedOption {
        option: String,
        value: String,
        supported: String,
    },

    #[error("point query does not match the computed slice: {0}")]
    QueryMismatch(String),
}

impl EngineError {
    /// Shorthand for a validation failure with a field path.
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidRequest {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a policy-locked option that was asked to change.
    pub fn unsupported(option: &str, value: &str, supported: &str) -> Self {
        EngineError::UnsupportedOption {
            option: option.to_string(),
            value: value.to_string(),
            supported: supported.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_radius() {
        assert!((EFFECTIVE_EARTH_RADIUS_KM - 8494.678_4).abs() < 0.01);
    }

    #[test]
    fn test_error_display_carries_field_path() {
        let err = EngineError::invalid("bands[0].f_min_mhz", "must be positive");
        let msg = err.to_string();
        assert!(msg.contains("bands[0].f_min_mhz"), "message was: {}", msg);
    }
}
