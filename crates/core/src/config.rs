//! Engine configuration
//!
//! All tunables live in one serde document. Partial JSON is accepted; every
//! missing field takes its default.
//!
//! # Example
//!
//! ```
//! use flowviz_core::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "tracer": { "max_steps": 500 } }"#).unwrap();
//! assert_eq!(config.tracer.max_steps, 500);
//! assert_eq!(config.tube.radius_factor, 10.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::grid::LocatorConfig;

/// Streamline integration parameters.
///
/// Step sizes are expressed in cell lengths (the bounding-box diagonal of the
/// cell the integrator is currently in).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// First step attempted from each seed, in cell lengths
    pub initial_step: f64,
    /// Smallest step the controller may take, in cell lengths
    pub min_step: f64,
    /// Largest step the controller may take, in cell lengths
    pub max_step: f64,
    /// Hard cap on accepted steps per streamline
    pub max_steps: usize,
    /// Local error tolerance of the embedded RK pair
    pub max_error: f64,
    /// Integration stops once the speed drops below this
    pub terminal_speed: f64,
}

impl Default for TracerConfig {
    /// Defaults:
    /// - Steps: 0.5 initial, 0.1 minimum, 1.0 maximum cell lengths
    /// - 2000 steps per line
    /// - Terminal speed 1e-12
    fn default() -> Self {
        Self {
            initial_step: 0.5,
            min_step: 0.1,
            max_step: 1.0,
            max_steps: 2000,
            max_error: 1e-6,
            terminal_speed: 1e-12,
        }
    }
}

/// Tube sweep parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TubeConfig {
    /// Ratio of the largest tube radius (fastest point) to the smallest
    pub radius_factor: f64,
}

impl Default for TubeConfig {
    fn default() -> Self {
        Self {
            radius_factor: 10.0,
        }
    }
}

/// Color lookup table parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupTableConfig {
    /// Hue at the bottom and top of the range (0.667 = blue, 0.0 = red)
    pub hue_range: [f64; 2],
    /// Number of table entries
    pub num_colors: usize,
    /// Color for NaN values (RGBA, 0..1)
    pub nan_color: [f64; 4],
}

impl Default for LookupTableConfig {
    fn default() -> Self {
        Self {
            hue_range: [0.667, 0.0],
            num_colors: 256,
            nan_color: [0.5, 0.0, 0.0, 1.0],
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Streamline integration
    pub tracer: TracerConfig,
    /// Streamline tubes
    pub tube: TubeConfig,
    /// Color mapping
    pub lookup_table: LookupTableConfig,
    /// Point location
    pub locator: LocatorConfig,
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration document.
    pub fn from_json(text: &str) -> EngineResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| EngineError::decode("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the filters cannot work with.
    pub fn validate(&self) -> EngineResult<()> {
        let t = &self.tracer;
        if !(t.min_step > 0.0 && t.min_step <= t.initial_step && t.initial_step <= t.max_step) {
            return Err(EngineError::invalid_argument(
                "tracer",
                format!(
                    "steps must satisfy 0 < min ({}) <= initial ({}) <= max ({})",
                    t.min_step, t.initial_step, t.max_step
                ),
            ));
        }
        if t.max_error <= 0.0 {
            return Err(EngineError::invalid_argument("tracer.max_error", "must be positive"));
        }
        if self.tube.radius_factor < 1.0 {
            return Err(EngineError::invalid_argument(
                "tube.radius_factor",
                "must be at least 1",
            ));
        }
        if self.lookup_table.num_colors == 0 {
            return Err(EngineError::invalid_argument(
                "lookup_table.num_colors",
                "must be positive",
            ));
        }
        if self.locator.tolerance < 0.0 {
            return Err(EngineError::invalid_argument(
                "locator.tolerance",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracer.initial_step, 0.5);
        assert_eq!(config.lookup_table.num_colors, 256);
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json(r#"{"lookup_table": {"num_colors": 16}}"#).unwrap();
        assert_eq!(config.lookup_table.num_colors, 16);
        assert_eq!(config.lookup_table.hue_range, [0.667, 0.0]);
        assert_eq!(config.tracer.max_steps, 2000);
    }

    #[test]
    fn test_invalid_steps_rejected() {
        let err = EngineConfig::from_json(r#"{"tracer": {"min_step": 2.0}}"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument { name: "tracer", .. }));
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        assert!(matches!(
            EngineConfig::from_json("{ nope"),
            Err(EngineError::Decode { what: "config", .. })
        ));
    }
}
