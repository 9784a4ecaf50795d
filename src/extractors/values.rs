// src/extractors/values.rs
//
// Raw-cell to number normalization. Filings render the same figure a dozen
// ways: "$45,000", "(1,234.50)", "12%", "—". The rules here are applied in a
// fixed order and a cell that survives none of them is missing, never zero.

use crate::filings::Cell;

/// Placeholder tokens that stand in for "no value" in filing tables.
const MISSING_TOKENS: &[&str] = &["-", "—", "–", "N/A", "n/a", "NA"];

/// Normalizes one raw cell into a numeric value, or `None` when the cell is
/// blank, a placeholder, or unparsable. Never panics.
///
/// Idempotent on numeric output: a cell that is already a number comes back
/// unchanged.
pub fn normalize_cell(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => Some(*n),
        Cell::Bool(_) | Cell::Date(_) => None,
        Cell::Text(s) => normalize_str(s),
    }
}

/// String form of the normalizer, for already-textual values.
pub fn normalize_str(raw: &str) -> Option<f64> {
    let mut value = raw.trim();

    if value.is_empty() || MISSING_TOKENS.contains(&value) {
        return None;
    }

    // Parentheses mean a negative figure; strip them before anything else.
    let mut negative = false;
    if value.starts_with('(') && value.ends_with(')') {
        negative = true;
        value = &value[1..value.len() - 1];
    }

    // Strip currency symbols, thousands separators, and interior whitespace.
    let mut cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | ',') && !c.is_whitespace())
        .collect();

    // Trailing percent scales the parsed number down.
    let mut percent = false;
    if cleaned.ends_with('%') {
        percent = true;
        cleaned.pop();
    }

    if cleaned.is_empty() {
        return None;
    }

    let parsed: f64 = cleaned.parse().ok()?;
    let parsed = if percent { parsed / 100.0 } else { parsed };
    Some(if negative { -parsed } else { parsed })
}
