// src/extractors/boundaries.rs
//
// Locates the real tabular region inside a sheet grid. Exported filing sheets
// carry title rows above the table and footnote clutter below it; both scans
// fall back to the whole grid rather than failing on ambiguous layouts.

use crate::filings::Cell;

/// Minimum ratio of non-missing cells for a row to start the table.
pub const START_FILL_RATIO: f64 = 0.3;

/// Returns `(start_row, end_row)` such that `grid[start..end]` is the
/// tabular region. Scans top-down for the first row whose fill ratio exceeds
/// `START_FILL_RATIO`, and bottom-up for the last row with at least two
/// non-missing cells. An all-missing grid yields `(0, len)` — never an error.
pub fn detect(grid: &[Vec<Cell>]) -> (usize, usize) {
    let mut start_row = 0;
    for (idx, row) in grid.iter().enumerate() {
        if row.is_empty() {
            continue;
        }
        let filled = row.iter().filter(|c| !c.is_missing()).count();
        if filled as f64 / row.len() as f64 > START_FILL_RATIO {
            start_row = idx;
            break;
        }
    }

    let mut end_row = grid.len();
    for idx in (0..grid.len()).rev() {
        let filled = grid[idx].iter().filter(|c| !c.is_missing()).count();
        if filled > 1 {
            end_row = idx + 1;
            break;
        }
    }

    if end_row <= start_row {
        // Ambiguous layout; hand the caller the whole grid.
        return (0, grid.len());
    }
    (start_row, end_row)
}

/// Finds the header row: the first row whose concatenated lowercased cell
/// text contains any of the supplied keywords. Defaults to row 0 when no row
/// matches. Column headers come from this row; data resumes just below it.
pub fn detect_header_row(grid: &[Vec<Cell>], keywords: &[&str]) -> usize {
    for (idx, row) in grid.iter().enumerate() {
        let text = row_text(row);
        if keywords.iter().any(|kw| text.contains(kw)) {
            return idx;
        }
    }
    0
}

/// Statement-sheet header scan: the first row that either carries a
/// reporting-period keyword or mentions at least two distinct fiscal years
/// (comparative columns). Defaults to row 0.
pub fn detect_statement_header_row(
    grid: &[Vec<Cell>],
    keywords: &[&str],
    years: &[&str],
) -> usize {
    for (idx, row) in grid.iter().enumerate() {
        let text = row_text(row);
        if keywords.iter().any(|kw| text.contains(kw)) {
            return idx;
        }
        if years.iter().filter(|y| text.contains(*y)).count() >= 2 {
            return idx;
        }
    }
    0
}

/// Concatenated lowercased text of a row's non-missing cells.
pub fn row_text(row: &[Cell]) -> String {
    row.iter()
        .filter(|c| !c.is_missing())
        .map(|c| c.text().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
