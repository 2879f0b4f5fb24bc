//! Layer setting policy: alternating height/width presets by layer parity.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZshiftError};

/// Thinner layer (mm).
pub const MIN_LAYER_HEIGHT: f64 = 0.15;
/// Thicker layer (mm).
pub const MAX_LAYER_HEIGHT: f64 = 0.30;
/// Narrower extrusion (mm).
pub const MIN_LINE_WIDTH: f64 = 0.40;
/// Wider extrusion (mm).
pub const MAX_LINE_WIDTH: f64 = 0.50;

/// Height and width chosen for one perimeter block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSettings {
    /// Layer height (mm).
    pub layer_height: f64,
    /// Line width (mm).
    pub line_width: f64,
}

/// The two presets the policy alternates between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternationProfile {
    /// Layer height used on odd layers (mm).
    pub min_layer_height: f64,
    /// Layer height used on even layers (mm).
    pub max_layer_height: f64,
    /// Line width used on even layers (mm).
    pub min_line_width: f64,
    /// Line width used on odd layers (mm).
    pub max_line_width: f64,
}

impl Default for AlternationProfile {
    fn default() -> Self {
        Self {
            min_layer_height: MIN_LAYER_HEIGHT,
            max_layer_height: MAX_LAYER_HEIGHT,
            min_line_width: MIN_LINE_WIDTH,
            max_line_width: MAX_LINE_WIDTH,
        }
    }
}

impl AlternationProfile {
    /// Validate the presets.
    pub fn validate(&self) -> Result<()> {
        let values = [
            self.min_layer_height,
            self.max_layer_height,
            self.min_line_width,
            self.max_line_width,
        ];
        if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ZshiftError::InvalidSettings(
                "profile heights and widths must be positive".into(),
            ));
        }
        if self.min_layer_height > self.max_layer_height {
            return Err(ZshiftError::InvalidSettings(
                "min_layer_height exceeds max_layer_height".into(),
            ));
        }
        if self.min_line_width > self.max_line_width {
            return Err(ZshiftError::InvalidSettings(
                "min_line_width exceeds max_line_width".into(),
            ));
        }
        Ok(())
    }
}

/// Maps a layer index to its [`LayerSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerPolicy {
    profile: AlternationProfile,
}

impl LayerPolicy {
    /// Create a policy over the given presets.
    pub fn new(profile: AlternationProfile) -> Self {
        Self { profile }
    }

    /// The presets in use.
    pub fn profile(&self) -> &AlternationProfile {
        &self.profile
    }

    /// Settings for `layer_index`.
    ///
    /// Even layers get the thick, narrow preset; odd layers the thin, wide one.
    /// `total_layers` is accepted for interface symmetry and does not affect the result.
    pub fn settings(&self, layer_index: u32, _total_layers: usize) -> LayerSettings {
        if layer_index % 2 == 0 {
            LayerSettings {
                layer_height: self.profile.max_layer_height,
                line_width: self.profile.min_line_width,
            }
        } else {
            LayerSettings {
                layer_height: self.profile.min_layer_height,
                line_width: self.profile.max_line_width,
            }
        }
    }
}

/// Settings for `layer_index` under the default presets.
pub fn layer_settings(layer_index: u32) -> LayerSettings {
    LayerPolicy::default().settings(layer_index, 0)
}
