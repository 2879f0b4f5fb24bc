//! Rewrite configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZshiftError};
use crate::policy::AlternationProfile;

/// Parameters for one rewrite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Nominal slicer layer height (mm). Used as layer-index divisor and for the Z shift.
    pub nominal_layer_height: f64,
    /// Accepted for compatibility; has no effect on the rewrite.
    pub extrusion_multiplier: f64,
    /// Rewrite input that already carries this tool's annotations.
    pub allow_reprocess: bool,
    /// Height/width presets.
    pub profile: AlternationProfile,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            nominal_layer_height: 0.2,
            extrusion_multiplier: 1.0,
            allow_reprocess: false,
            profile: AlternationProfile::default(),
        }
    }
}

impl RewriteConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !self.nominal_layer_height.is_finite()
            || self.nominal_layer_height <= 0.0
            || self.nominal_layer_height > 1.0
        {
            return Err(ZshiftError::InvalidSettings(
                "nominal_layer_height must be between 0 and 1mm".into(),
            ));
        }
        if !self.extrusion_multiplier.is_finite() || self.extrusion_multiplier <= 0.0 {
            return Err(ZshiftError::InvalidSettings(
                "extrusion_multiplier must be positive".into(),
            ));
        }
        self.profile.validate()
    }
}
