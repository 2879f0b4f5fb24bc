//! Textual classification of single G-code lines.
//!
//! Nothing here parses G-code in general. Lines are matched by prefix and by
//! the presence of axis letters; numeric tokens are pulled out with small
//! regexes and everything else is left as the slicer wrote it.

use std::sync::LazyLock;

use regex::Regex;

/// Prefix of a Z-only linear move, which the slicers emit on layer change.
pub const LAYER_CHANGE_PREFIX: &str = "G1 Z";

static Z_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Z([-\d.]+)").expect("static Z token regex"));
static E_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"E([-\d.]+)").expect("static E token regex"));

/// The part of a line before its `;` comment.
pub fn code_part(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Is this a layer-change line (`G1 Z...`)?
pub fn is_layer_change(line: &str) -> bool {
    line.starts_with(LAYER_CHANGE_PREFIX)
}

/// Parse the first `Z` token of the line. `None` when absent or malformed.
pub fn parse_z(line: &str) -> Option<f64> {
    parse_token(&Z_TOKEN, line)
}

/// Parse the first `E` token of the line. `None` when absent or malformed.
pub fn parse_e(line: &str) -> Option<f64> {
    parse_token(&E_TOKEN, line)
}

fn parse_token(re: &Regex, line: &str) -> Option<f64> {
    re.captures(code_part(line))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Is this a `G1` move carrying X, Y and E words?
///
/// Only the code part is inspected, so letters inside a trailing comment do
/// not count. `G10`/`G11` (firmware retract) are not `G1`.
pub fn is_extruding_move(line: &str) -> bool {
    let code = code_part(line);
    let Some(rest) = code.strip_prefix("G1") else {
        return false;
    };
    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    rest.contains('X') && rest.contains('Y') && rest.contains('E')
}

/// Replace the first `E` token with `new_e` formatted to 5 decimals.
///
/// The line is returned unchanged if it has no `E` token in its code part.
pub fn replace_e(line: &str, new_e: f64) -> String {
    match E_TOKEN.find(code_part(line)) {
        Some(m) => format!(
            "{}E{:.5}{}",
            &line[..m.start()],
            new_e,
            &line[m.end()..]
        ),
        None => line.to_string(),
    }
}
