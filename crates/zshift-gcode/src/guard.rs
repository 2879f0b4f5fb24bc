//! Re-run detection.
//!
//! Rewriting is not idempotent: a second pass treats the inserted Z lines as
//! layer changes and rescales E again. Output of a previous pass is recognized
//! by the comments the rewriter appends.

use crate::config::RewriteConfig;
use crate::error::{Result, ZshiftError};
use crate::events::RewriteSink;
use crate::rewrite::{rewrite_text, split_lines, RewriteOutput};

const ANNOTATIONS: [&str; 3] = [
    "; Shifted Z for block #",
    "; Reset Z for block #",
    "; Adjusted E for layer settings, block #",
];

/// 1-based number of the first line carrying a rewriter annotation.
pub fn already_processed<S: AsRef<str>>(lines: &[S]) -> Option<usize> {
    lines
        .iter()
        .position(|line| {
            let line = line.as_ref();
            ANNOTATIONS.iter().any(|a| line.contains(a))
        })
        .map(|idx| idx + 1)
}

/// Validate `config`, refuse already-processed input, then rewrite `text`.
///
/// Set [`RewriteConfig::allow_reprocess`] to rewrite annotated input anyway.
pub fn process_text(
    text: &str,
    config: &RewriteConfig,
    sink: &mut dyn RewriteSink,
) -> Result<RewriteOutput> {
    config.validate()?;

    if !config.allow_reprocess {
        if let Some(line) = already_processed(&split_lines(text)) {
            return Err(ZshiftError::AlreadyProcessed { line });
        }
    }

    Ok(rewrite_text(text, config, sink))
}
