//! Observability hooks for the rewriter.
//!
//! The rewriter reports what it does through a [`RewriteSink`]. It never
//! installs a logging backend itself; callers pick a sink.

use serde::{Deserialize, Serialize};

use crate::dialect::PerimeterType;
use crate::policy::LayerSettings;

/// Receives one call per rewrite event. All methods default to no-ops.
pub trait RewriteSink {
    /// A layer-change line was parsed.
    fn layer_detected(&mut self, _layer: u32, _z: f64) {}

    /// A feature-type marker changed the perimeter context.
    fn perimeter_detected(&mut self, _layer: u32, _kind: PerimeterType) {}

    /// A perimeter block was opened.
    fn block_opened(&mut self, _layer: u32, _block: u32) {}

    /// Settings were chosen for a block.
    fn settings_chosen(&mut self, _layer: u32, _block: u32, _settings: LayerSettings) {}

    /// A Z line was inserted before a block. `shifted` is false for reset lines.
    fn z_inserted(&mut self, _layer: u32, _block: u32, _z: f64, _shifted: bool) {}

    /// An extrusion value was rescaled.
    fn e_adjusted(&mut self, _layer: u32, _block: u32, _from: f64, _to: f64) {}
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RewriteSink for NullSink {}

/// Sink that forwards events to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RewriteSink for TracingSink {
    fn layer_detected(&mut self, layer: u32, z: f64) {
        tracing::info!(layer, "Layer {layer} detected at Z={z:.3}");
    }

    fn perimeter_detected(&mut self, layer: u32, kind: PerimeterType) {
        match kind {
            PerimeterType::External => {
                tracing::info!(layer, "External perimeter detected at layer {layer}")
            }
            PerimeterType::Internal => {
                tracing::info!(layer, "Internal perimeter block started at layer {layer}")
            }
            PerimeterType::None => {
                tracing::debug!(layer, "Non-perimeter feature at layer {layer}")
            }
        }
    }

    fn block_opened(&mut self, layer: u32, block: u32) {
        tracing::info!(layer, block, "Perimeter block #{block} detected at layer {layer}");
    }

    fn settings_chosen(&mut self, layer: u32, block: u32, settings: LayerSettings) {
        tracing::info!(
            layer,
            block,
            layer_height = settings.layer_height,
            line_width = settings.line_width,
            "Using layer settings"
        );
    }

    fn z_inserted(&mut self, layer: u32, block: u32, z: f64, shifted: bool) {
        let what = if shifted { "shifted" } else { "non-shifted" };
        tracing::info!(layer, block, "Inserting G1 Z{z:.3} for {what} perimeter block #{block}");
    }

    fn e_adjusted(&mut self, layer: u32, block: u32, from: f64, to: f64) {
        tracing::info!(layer, block, "Adjusting E value from {from:.5} to {to:.5}");
    }
}

/// One recorded rewrite event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RewriteEvent {
    /// See [`RewriteSink::layer_detected`].
    LayerDetected {
        /// Layer index.
        layer: u32,
        /// Parsed Z (mm).
        z: f64,
    },
    /// See [`RewriteSink::perimeter_detected`].
    PerimeterDetected {
        /// Layer index.
        layer: u32,
        /// New perimeter context.
        kind: PerimeterType,
    },
    /// See [`RewriteSink::block_opened`].
    BlockOpened {
        /// Layer index.
        layer: u32,
        /// Block number within the layer (1-based).
        block: u32,
    },
    /// See [`RewriteSink::settings_chosen`].
    SettingsChosen {
        /// Layer index.
        layer: u32,
        /// Block number.
        block: u32,
        /// Chosen settings.
        settings: LayerSettings,
    },
    /// See [`RewriteSink::z_inserted`].
    ZInserted {
        /// Layer index.
        layer: u32,
        /// Block number.
        block: u32,
        /// Inserted Z (mm).
        z: f64,
        /// Whether the Z was shifted.
        shifted: bool,
    },
    /// See [`RewriteSink::e_adjusted`].
    EAdjusted {
        /// Layer index.
        layer: u32,
        /// Block number.
        block: u32,
        /// Original E.
        from: f64,
        /// Rescaled E.
        to: f64,
    },
}

/// Sink that records every event in order.
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    events: Vec<RewriteEvent>,
}

impl AuditTrail {
    /// Create an empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events.
    pub fn events(&self) -> &[RewriteEvent] {
        &self.events
    }

    /// Consume the trail.
    pub fn into_events(self) -> Vec<RewriteEvent> {
        self.events
    }
}

impl RewriteSink for AuditTrail {
    fn layer_detected(&mut self, layer: u32, z: f64) {
        self.events.push(RewriteEvent::LayerDetected { layer, z });
    }

    fn perimeter_detected(&mut self, layer: u32, kind: PerimeterType) {
        self.events.push(RewriteEvent::PerimeterDetected { layer, kind });
    }

    fn block_opened(&mut self, layer: u32, block: u32) {
        self.events.push(RewriteEvent::BlockOpened { layer, block });
    }

    fn settings_chosen(&mut self, layer: u32, block: u32, settings: LayerSettings) {
        self.events.push(RewriteEvent::SettingsChosen {
            layer,
            block,
            settings,
        });
    }

    fn z_inserted(&mut self, layer: u32, block: u32, z: f64, shifted: bool) {
        self.events.push(RewriteEvent::ZInserted {
            layer,
            block,
            z,
            shifted,
        });
    }

    fn e_adjusted(&mut self, layer: u32, block: u32, from: f64, to: f64) {
        self.events.push(RewriteEvent::EAdjusted {
            layer,
            block,
            from,
            to,
        });
    }
}

/// Fan out to two sinks, first `A` then `B`.
impl<A: RewriteSink, B: RewriteSink> RewriteSink for (A, B) {
    fn layer_detected(&mut self, layer: u32, z: f64) {
        self.0.layer_detected(layer, z);
        self.1.layer_detected(layer, z);
    }

    fn perimeter_detected(&mut self, layer: u32, kind: PerimeterType) {
        self.0.perimeter_detected(layer, kind);
        self.1.perimeter_detected(layer, kind);
    }

    fn block_opened(&mut self, layer: u32, block: u32) {
        self.0.block_opened(layer, block);
        self.1.block_opened(layer, block);
    }

    fn settings_chosen(&mut self, layer: u32, block: u32, settings: LayerSettings) {
        self.0.settings_chosen(layer, block, settings);
        self.1.settings_chosen(layer, block, settings);
    }

    fn z_inserted(&mut self, layer: u32, block: u32, z: f64, shifted: bool) {
        self.0.z_inserted(layer, block, z, shifted);
        self.1.z_inserted(layer, block, z, shifted);
    }

    fn e_adjusted(&mut self, layer: u32, block: u32, from: f64, to: f64) {
        self.0.e_adjusted(layer, block, from, to);
        self.1.e_adjusted(layer, block, from, to);
    }
}
