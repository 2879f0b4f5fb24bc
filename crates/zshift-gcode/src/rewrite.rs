//! Perimeter-block rewriter.
//!
//! A single left-to-right pass over the input lines. [`ScanState`] is threaded
//! through [`Rewriter::step`], which maps `(state, line)` to the next state and
//! the line(s) to emit. Internal-perimeter extrusion moves open a block each;
//! odd blocks get a Z line raised by a layer-dependent shift, even blocks a Z
//! line back at the layer height, and the move's E value is rescaled to the
//! block's line width.
//!
//! A block is opened and closed on the same motion line, so every qualifying
//! move is its own block.

use serde::{Deserialize, Serialize};

use crate::config::RewriteConfig;
use crate::dialect::{self, PerimeterType};
use crate::events::{NullSink, RewriteSink};
use crate::line;
use crate::policy::LayerPolicy;

/// Line width the slicer is assumed to have extruded for (mm).
pub const ASSUMED_LINE_WIDTH: f64 = 0.4;

/// Fraction of the nominal layer height used as the base Z shift.
pub const Z_SHIFT_FACTOR: f64 = 0.5;

/// Absorbs binary rounding in `z / layer_height` (2.4 / 0.2 is 11.999...).
const LAYER_INDEX_TOLERANCE: f64 = 1e-9;

/// Scan state threaded through the pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanState {
    /// Layer index derived from the last layer change.
    pub current_layer: u32,
    /// Z of the last layer change (mm).
    pub current_z: f64,
    /// Perimeter context set by the last type marker.
    pub perimeter_type: PerimeterType,
    /// Blocks opened since the last layer change.
    pub block_count: u32,
    /// Inside an open block. Only ever true while the context is internal.
    pub in_block: bool,
}

impl Default for ScanState {
    fn default() -> Self {
        Self {
            current_layer: 0,
            current_z: 0.0,
            perimeter_type: PerimeterType::None,
            block_count: 0,
            in_block: false,
        }
    }
}

/// Result of feeding one line to [`Rewriter::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// State after the line.
    pub state: ScanState,
    /// Output lines, without terminators. One line, or two when a Z line was inserted.
    pub lines: Vec<String>,
    /// A block was opened on this line.
    pub opened_block: bool,
    /// The line's E value was rescaled.
    pub rescaled: bool,
}

impl Step {
    fn passthrough(state: ScanState, line: &str) -> Self {
        Self {
            state,
            lines: vec![line.to_string()],
            opened_block: false,
            rescaled: false,
        }
    }
}

/// Summary of one rewrite run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteReport {
    /// Layer-change lines in the input.
    pub total_layers: usize,
    /// Blocks opened (equals Z lines inserted).
    pub blocks: usize,
    /// Motion lines whose E value was rescaled.
    pub rescaled_extrusions: usize,
    /// Input line count.
    pub input_lines: usize,
    /// Output line count.
    pub output_lines: usize,
}

/// Rewritten file body plus its report.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutput {
    /// Rewritten text.
    pub text: String,
    /// Run summary.
    pub report: RewriteReport,
}

/// Count layer-change lines.
pub fn count_layers<S: AsRef<str>>(lines: &[S]) -> usize {
    lines
        .iter()
        .filter(|line| line::is_layer_change(line.as_ref()))
        .count()
}

/// Rewrites internal perimeter moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rewriter {
    nominal_layer_height: f64,
    policy: LayerPolicy,
    total_layers: usize,
}

impl Rewriter {
    /// Create a rewriter from a configuration.
    pub fn new(config: &RewriteConfig) -> Self {
        Self {
            nominal_layer_height: config.nominal_layer_height,
            policy: LayerPolicy::new(config.profile),
            total_layers: 0,
        }
    }

    /// Set the layer count passed to the policy by [`Rewriter::step`].
    pub fn with_total_layers(mut self, total_layers: usize) -> Self {
        self.total_layers = total_layers;
        self
    }

    /// Layer index for a Z height.
    pub fn layer_index(&self, z: f64) -> u32 {
        ((z / self.nominal_layer_height) + LAYER_INDEX_TOLERANCE)
            .floor()
            .max(0.0) as u32
    }

    /// Apply one line to `state`.
    pub fn step(&self, state: ScanState, text: &str, sink: &mut dyn RewriteSink) -> Step {
        if line::is_layer_change(text) {
            // Malformed Z: pass through, state untouched.
            let Some(z) = line::parse_z(text) else {
                return Step::passthrough(state, text);
            };
            let next = ScanState {
                current_z: z,
                current_layer: self.layer_index(z),
                block_count: 0,
                in_block: false,
                ..state
            };
            sink.layer_detected(next.current_layer, z);
            return Step::passthrough(next, text);
        }

        let mut next = state;
        if let Some(kind) = dialect::perimeter_type(text) {
            next.perimeter_type = kind;
            next.in_block = false;
            sink.perimeter_detected(next.current_layer, kind);
        }

        if next.perimeter_type == PerimeterType::Internal
            && line::is_extruding_move(text)
            && !next.in_block
        {
            return self.open_block(next, text, sink);
        }

        Step::passthrough(next, text)
    }

    fn open_block(&self, mut state: ScanState, text: &str, sink: &mut dyn RewriteSink) -> Step {
        state.block_count += 1;
        state.in_block = true;
        let layer = state.current_layer;
        let block = state.block_count;
        sink.block_opened(layer, block);

        let settings = self.policy.settings(layer, self.total_layers);
        sink.settings_chosen(layer, block, settings);

        // Length times length, kept as the established behavior.
        let z_shift = self.nominal_layer_height * Z_SHIFT_FACTOR;
        let z_line = if block % 2 == 1 {
            let adjusted_z = state.current_z + z_shift * settings.layer_height;
            sink.z_inserted(layer, block, adjusted_z, true);
            format!("G1 Z{adjusted_z:.3} ; Shifted Z for block #{block}")
        } else {
            sink.z_inserted(layer, block, state.current_z, false);
            format!("G1 Z{:.3} ; Reset Z for block #{block}", state.current_z)
        };

        let (motion, rescaled) = match line::parse_e(text) {
            Some(old_e) => {
                let new_e = old_e * (settings.line_width / ASSUMED_LINE_WIDTH);
                sink.e_adjusted(layer, block, old_e, new_e);
                let replaced = line::replace_e(text, new_e);
                (
                    format!(
                        "{} ; Adjusted E for layer settings, block #{block}",
                        replaced.trim()
                    ),
                    true,
                )
            }
            None => (text.to_string(), false),
        };

        state.in_block = false;
        Step {
            state,
            lines: vec![z_line, motion],
            opened_block: true,
            rescaled,
        }
    }

    /// Rewrite a line sequence and report what was done.
    pub fn rewrite_with_report<S: AsRef<str>>(
        &self,
        lines: &[S],
        sink: &mut dyn RewriteSink,
    ) -> (Vec<String>, RewriteReport) {
        let run = self.with_total_layers(count_layers(lines));
        let mut report = RewriteReport {
            total_layers: run.total_layers,
            input_lines: lines.len(),
            ..Default::default()
        };

        let mut out = Vec::with_capacity(lines.len() + lines.len() / 8);
        lines.iter().fold(ScanState::default(), |state, text| {
            let step = run.step(state, text.as_ref(), &mut *sink);
            report.blocks += usize::from(step.opened_block);
            report.rescaled_extrusions += usize::from(step.rescaled);
            out.extend(step.lines);
            step.state
        });

        report.output_lines = out.len();
        (out, report)
    }

    /// Rewrite a line sequence.
    pub fn rewrite<S: AsRef<str>>(&self, lines: &[S], sink: &mut dyn RewriteSink) -> Vec<String> {
        self.rewrite_with_report(lines, sink).0
    }
}

/// Rewrite `lines` with the default presets and no event sink.
pub fn rewrite<S: AsRef<str>>(lines: &[S], nominal_layer_height: f64) -> Vec<String> {
    let config = RewriteConfig {
        nominal_layer_height,
        ..Default::default()
    };
    Rewriter::new(&config).rewrite(lines, &mut NullSink)
}

/// Split a file body into lines without terminators.
///
/// `\r\n` endings are accepted; the output always uses `\n`.
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}

/// Rewrite a whole file body.
///
/// A trailing newline on the input is kept on the output.
pub fn rewrite_text(
    text: &str,
    config: &RewriteConfig,
    sink: &mut dyn RewriteSink,
) -> RewriteOutput {
    let lines = split_lines(text);
    let (out, report) = Rewriter::new(config).rewrite_with_report(&lines, sink);

    let mut text_out = out.join("\n");
    if text.ends_with('\n') {
        text_out.push('\n');
    }
    RewriteOutput {
        text: text_out,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AuditTrail, RewriteEvent};
    use approx::assert_relative_eq;

    fn rewriter() -> Rewriter {
        Rewriter::new(&RewriteConfig::default())
    }

    fn feed(lines: &[&str]) -> (ScanState, Vec<String>) {
        let rw = rewriter();
        let mut out = Vec::new();
        let state = lines.iter().fold(ScanState::default(), |state, l| {
            let step = rw.step(state, l, &mut NullSink);
            out.extend(step.lines);
            step.state
        });
        (state, out)
    }

    #[test]
    fn test_layer_change_state() {
        let (state, out) = feed(&["G1 Z2.400"]);
        assert_eq!(state.current_layer, 12);
        assert_relative_eq!(state.current_z, 2.4);
        assert_eq!(state.block_count, 0);
        assert!(!state.in_block);
        assert_eq!(out, vec!["G1 Z2.400"]);
    }

    #[test]
    fn test_malformed_layer_change_keeps_state() {
        let (state, out) = feed(&["G1 Z0.6", ";TYPE:Perimeter", "G1 X1 Y1 E1", "G1 Z."]);
        assert_eq!(state.current_layer, 3);
        assert_eq!(state.block_count, 1);
        assert_eq!(out.last().unwrap(), "G1 Z.");
    }

    #[test]
    fn test_layer_index_floor() {
        let rw = rewriter();
        assert_eq!(rw.layer_index(0.2), 1);
        assert_eq!(rw.layer_index(0.3), 1);
        assert_eq!(rw.layer_index(0.6), 3);
        assert_eq!(rw.layer_index(0.0), 0);
        assert_eq!(rw.layer_index(-0.4), 0);
    }

    #[test]
    fn test_first_block_shifted() {
        let (state, out) = feed(&["G1 Z2.400", ";TYPE:Inner wall", "G1 X10 Y10 E0.5"]);
        // layer 12 (even): height 0.30, width 0.40; 2.4 + 0.1 * 0.3
        assert_eq!(
            out,
            vec![
                "G1 Z2.400",
                ";TYPE:Inner wall",
                "G1 Z2.430 ; Shifted Z for block #1",
                "G1 X10 Y10 E0.50000 ; Adjusted E for layer settings, block #1",
            ]
        );
        assert_eq!(state.block_count, 1);
        assert!(!state.in_block);
    }

    #[test]
    fn test_second_block_reset() {
        let (_, out) = feed(&[
            "G1 Z0.2",
            ";TYPE:Perimeter",
            "G1 X1 Y1 E1",
            "G1 X2 Y1 E2",
        ]);
        // layer 1 (odd): height 0.15 -> 0.2 + 0.1 * 0.15
        assert_eq!(out[2], "G1 Z0.215 ; Shifted Z for block #1");
        assert_eq!(out[4], "G1 Z0.200 ; Reset Z for block #2");
        assert_eq!(
            out[5],
            "G1 X2 Y1 E2.50000 ; Adjusted E for layer settings, block #2"
        );
    }

    #[test]
    fn test_e_rescale_five_decimals() {
        let (_, out) = feed(&["G1 Z0.2", ";TYPE:Perimeter", "G1 X5 Y5 E1.23456"]);
        assert_eq!(
            out[3],
            "G1 X5 Y5 E1.54320 ; Adjusted E for layer settings, block #1"
        );
    }

    #[test]
    fn test_malformed_e_still_counts_block() {
        let (state, out) = feed(&["G1 Z0.2", ";TYPE:Perimeter", "G1 X10 Y10 E"]);
        assert_eq!(state.block_count, 1);
        assert_eq!(out[2], "G1 Z0.215 ; Shifted Z for block #1");
        assert_eq!(out[3], "G1 X10 Y10 E");
    }

    #[test]
    fn test_block_count_resets_per_layer() {
        let (state, out) = feed(&[
            "G1 Z0.2",
            ";TYPE:Perimeter",
            "G1 X1 Y1 E1",
            "G1 X2 Y2 E1",
            "G1 Z0.4",
            "G1 X3 Y3 E1",
        ]);
        assert_eq!(state.current_layer, 2);
        assert_eq!(state.block_count, 1);
        // context survives the layer change; new layer starts at block #1
        assert_eq!(out[7], "G1 Z0.430 ; Shifted Z for block #1");
    }

    #[test]
    fn test_external_and_other_types_untouched() {
        let input = [
            "G1 Z0.2",
            ";TYPE:External perimeter",
            "G1 X1 Y1 E1",
            ";TYPE:Outer wall",
            "G1 X1 Y1 E1",
            ";TYPE:Solid infill",
            "G1 X1 Y1 E1",
        ];
        let (state, out) = feed(&input);
        assert_eq!(out, input);
        assert_eq!(state.perimeter_type, PerimeterType::None);
        assert_eq!(state.block_count, 0);
    }

    #[test]
    fn test_travel_and_retract_untouched() {
        let input = [
            "G1 Z0.2",
            ";TYPE:Perimeter",
            "G1 X1 Y1 F9000",
            "G1 E-0.8 F2100",
            "M204 S1000",
        ];
        let (_, out) = feed(&input);
        assert_eq!(out, input);
    }

    #[test]
    fn test_no_layer_changes_is_identity() {
        let plain = ["G28", "G1 X1 Y1 F3000", "M104 S0"];
        let (out, report) = rewriter().rewrite_with_report(&plain, &mut NullSink);
        assert_eq!(report.total_layers, 0);
        assert_eq!(out, plain);
    }

    #[test]
    fn test_report_counts() {
        let input = [
            "G1 Z0.2",
            ";TYPE:Perimeter",
            "G1 X1 Y1 E1",
            "G1 X2 Y2 E",
            "G1 Z0.4",
        ];
        let (out, report) = rewriter().rewrite_with_report(&input, &mut NullSink);
        assert_eq!(
            report,
            RewriteReport {
                total_layers: 2,
                blocks: 2,
                rescaled_extrusions: 1,
                input_lines: 5,
                output_lines: 7,
            }
        );
        assert_eq!(out.len(), 7);
    }

    #[test]
    fn test_events_in_order() {
        let mut trail = AuditTrail::new();
        rewriter().rewrite(&["G1 Z0.2", ";TYPE:Perimeter", "G1 X1 Y1 E1"], &mut trail);
        let events = trail.into_events();
        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], RewriteEvent::LayerDetected { layer: 1, .. }));
        assert!(matches!(
            events[1],
            RewriteEvent::PerimeterDetected {
                layer: 1,
                kind: PerimeterType::Internal
            }
        ));
        assert!(matches!(events[2], RewriteEvent::BlockOpened { layer: 1, block: 1 }));
        assert!(matches!(events[3], RewriteEvent::SettingsChosen { block: 1, .. }));
        assert!(matches!(
            events[4],
            RewriteEvent::ZInserted {
                block: 1,
                shifted: true,
                ..
            }
        ));
        match events[5] {
            RewriteEvent::EAdjusted { from, to, .. } => {
                assert_relative_eq!(from, 1.0);
                assert_relative_eq!(to, 1.25);
            }
            ref other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_rewrite_text_newlines() {
        let config = RewriteConfig::default();
        let out = rewrite_text("G28\r\nG1 Z0.2\r\n", &config, &mut NullSink);
        assert_eq!(out.text, "G28\nG1 Z0.2\n");

        let out = rewrite_text("G28", &config, &mut NullSink);
        assert_eq!(out.text, "G28");

        let out = rewrite_text("", &config, &mut NullSink);
        assert_eq!(out.text, "");
        assert_eq!(out.report.input_lines, 0);
    }

    #[test]
    fn test_free_rewrite_uses_layer_height() {
        let out = rewrite(&["G1 Z0.6", ";TYPE:Perimeter", "G1 X1 Y1 E1"], 0.3);
        // layer 2 (even): 0.6 + 0.15 * 0.30
        assert_eq!(out[2], "G1 Z0.645 ; Shifted Z for block #1");
    }
}
