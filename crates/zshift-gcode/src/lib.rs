#![warn(missing_docs)]

//! Z-shift and extrusion rewriting for slicer-generated G-code.
//!
//! This crate post-processes G-code from PrusaSlicer, Bambu Studio and
//! OrcaSlicer. Internal perimeter moves are given alternating Z heights and
//! rescaled extrusion, following a layer-parity height/width policy.
//! It works on in-memory text only; reading and writing files is left to the
//! caller.
//!
//! # Example
//!
//! ```
//! use zshift_gcode::{process_text, RewriteConfig, TracingSink};
//!
//! let gcode = "G1 Z0.2\n;TYPE:Perimeter\nG1 X10 Y10 E0.5\n";
//! let out = process_text(gcode, &RewriteConfig::default(), &mut TracingSink)?;
//!
//! assert!(out.text.contains("G1 Z0.215 ; Shifted Z for block #1"));
//! # Ok::<(), zshift_gcode::ZshiftError>(())
//! ```

pub mod config;
pub mod dialect;
pub mod error;
pub mod events;
pub mod guard;
pub mod line;
pub mod policy;
pub mod rewrite;

pub use config::RewriteConfig;
pub use dialect::{PerimeterType, SlicerDialect};
pub use error::{Result, ZshiftError};
pub use events::{AuditTrail, NullSink, RewriteEvent, RewriteSink, TracingSink};
pub use guard::{already_processed, process_text};
pub use policy::{layer_settings, AlternationProfile, LayerPolicy, LayerSettings};
pub use rewrite::{
    count_layers, rewrite, rewrite_text, split_lines, RewriteOutput, RewriteReport, Rewriter,
    ScanState, Step,
};
