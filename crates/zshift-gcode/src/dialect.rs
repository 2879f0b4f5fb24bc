//! Slicer comment dialects.

use serde::{Deserialize, Serialize};

/// Prefix shared by every feature-type comment.
pub const TYPE_PREFIX: &str = ";TYPE:";

/// Perimeter classification carried by a `;TYPE:` comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerimeterType {
    /// Outward-facing wall.
    External,
    /// Inward-facing wall(s).
    Internal,
    /// Any other feature (infill, support, skirt...).
    None,
}

/// Slicer comment dialect (vendor spelling of the feature markers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlicerDialect {
    /// PrusaSlicer / SuperSlicer.
    #[default]
    PrusaSlicer,
    /// Bambu Studio and OrcaSlicer.
    BambuStudio,
}

impl SlicerDialect {
    /// Every dialect the classifier recognizes.
    pub const ALL: [SlicerDialect; 2] = [SlicerDialect::PrusaSlicer, SlicerDialect::BambuStudio];

    /// Marker for the external perimeter.
    pub fn external_marker(&self) -> &'static str {
        match self {
            SlicerDialect::PrusaSlicer => ";TYPE:External perimeter",
            SlicerDialect::BambuStudio => ";TYPE:Outer wall",
        }
    }

    /// Marker for internal perimeters.
    pub fn internal_marker(&self) -> &'static str {
        match self {
            SlicerDialect::PrusaSlicer => ";TYPE:Perimeter",
            SlicerDialect::BambuStudio => ";TYPE:Inner wall",
        }
    }

    /// Human readable name.
    pub fn name(&self) -> &'static str {
        match self {
            SlicerDialect::PrusaSlicer => "PrusaSlicer",
            SlicerDialect::BambuStudio => "Bambu Studio / OrcaSlicer",
        }
    }

    /// Does `line` carry one of this dialect's perimeter markers?
    pub fn matches(&self, line: &str) -> bool {
        line.contains(self.external_marker()) || line.contains(self.internal_marker())
    }

    /// Report the dialect whose perimeter markers appear first in `lines`.
    pub fn detect<S: AsRef<str>>(lines: &[S]) -> Option<SlicerDialect> {
        lines.iter().find_map(|line| {
            let line = line.as_ref();
            Self::ALL.into_iter().find(|dialect| dialect.matches(line))
        })
    }
}

/// Classify a comment line by its feature marker.
///
/// External markers are checked before internal ones across all dialects.
/// Returns `None` when the line carries no `;TYPE:` marker at all.
pub fn perimeter_type(line: &str) -> Option<PerimeterType> {
    if SlicerDialect::ALL
        .iter()
        .any(|d| line.contains(d.external_marker()))
    {
        Some(PerimeterType::External)
    } else if SlicerDialect::ALL
        .iter()
        .any(|d| line.contains(d.internal_marker()))
    {
        Some(PerimeterType::Internal)
    } else if line.contains(TYPE_PREFIX) {
        Some(PerimeterType::None)
    } else {
        None
    }
}
