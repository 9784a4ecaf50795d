// src/extractors/statement.rs
//
// Composes boundary detection, value normalization, and line-item mapping
// into one structured table per classified sheet. A sheet that yields zero
// usable rows is an expected outcome of messy exports, not an error: the
// caller logs it and moves on.

use crate::extractors::{boundaries, line_items, values};
use crate::extractors::classify::StatementType;
use crate::filings::{Cell, FilingMetadata, Sheet};
use once_cell::sync::Lazy;
use regex::Regex;

/// Header cells naming a reporting period rather than a line item.
const HEADER_KEYWORDS: &[&str] = &["march", "year ended", "fiscal"];

/// Fiscal years recognized in comparative column headers.
const HEADER_YEARS: &[&str] = &["2020", "2021", "2022", "2023", "2024", "2025"];

static COLUMN_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(20\d{2})").expect("Failed to compile COLUMN_YEAR_RE"));

/// One extracted statement row: filing metadata, classification, and the
/// normalized value of every period column in source order.
#[derive(Debug, Clone)]
pub struct StructuredRecord {
    pub metadata: FilingMetadata,
    pub statement_type: StatementType,
    pub sheet_name: String,
    /// Canonical name when a mapping rule hit, otherwise the raw label.
    pub line_item: String,
    /// Period columns in source order: (column label, normalized value).
    pub values: Vec<(String, Option<f64>)>,
}

impl StructuredRecord {
    /// First non-missing value under the given column label.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values
            .iter()
            .filter(|(label, _)| label == column)
            .find_map(|(_, v)| *v)
    }
}

/// Tunable extraction thresholds.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Keep rows/columns whose non-missing ratio is at least this.
    pub fill_threshold: f64,
    /// Sheets smaller than this are skipped outright.
    pub min_rows: usize,
    pub min_cols: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            fill_threshold: 0.3,
            min_rows: 3,
            min_cols: 2,
        }
    }
}

pub struct StatementExtractor {
    config: ExtractorConfig,
}

impl StatementExtractor {
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        StatementExtractor { config }
    }

    /// Extracts a classified sheet into structured records. Source row order
    /// is preserved; rows are never duplicated; an unusable sheet yields an
    /// empty vector.
    pub fn extract(
        &self,
        sheet: &Sheet,
        statement_type: StatementType,
        metadata: &FilingMetadata,
    ) -> Vec<StructuredRecord> {
        if sheet.n_rows() < self.config.min_rows || sheet.n_cols() < self.config.min_cols {
            tracing::debug!(
                "Sheet '{}' too small ({}x{}), skipping",
                sheet.name,
                sheet.n_rows(),
                sheet.n_cols()
            );
            return Vec::new();
        }

        let (start_row, end_row) = boundaries::detect(&sheet.grid);
        let grid = drop_sparse_rows_and_cols(&sheet.grid[start_row..end_row], self.config.fill_threshold);
        if grid.len() < 2 {
            return Vec::new();
        }

        let header_row =
            boundaries::detect_statement_header_row(&grid, HEADER_KEYWORDS, HEADER_YEARS);
        let headers = &grid[header_row];
        let data = &grid[header_row + 1..];
        if data.is_empty() {
            return Vec::new();
        }

        let column_labels = derive_column_labels(headers);

        let mut records = Vec::new();
        for row in data {
            let raw_label = match row.first() {
                Some(cell) if !cell.is_missing() => cell.text().trim().to_string(),
                _ => continue,
            };
            // Pure-punctuation labels are ruling lines, not line items.
            if !raw_label.chars().any(|c| c.is_alphanumeric()) {
                continue;
            }

            let row_values: Vec<(String, Option<f64>)> = column_labels
                .iter()
                .enumerate()
                .skip(1)
                .map(|(idx, label)| (label.clone(), row.get(idx).and_then(values::normalize_cell)))
                .collect();

            records.push(StructuredRecord {
                metadata: metadata.clone(),
                statement_type,
                sheet_name: sheet.name.clone(),
                line_item: line_items::normalize(&raw_label),
                values: row_values,
            });
        }

        tracing::debug!(
            "Sheet '{}' ({}) -> {} structured rows",
            sheet.name,
            statement_type,
            records.len()
        );
        records
    }
}

impl Default for StatementExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops rows and then columns whose non-missing ratio falls under the
/// threshold. Mirrors the permissive boundary scan: a grid can only shrink,
/// never error.
fn drop_sparse_rows_and_cols(grid: &[Vec<Cell>], threshold: f64) -> Vec<Vec<Cell>> {
    let rows: Vec<&Vec<Cell>> = grid
        .iter()
        .filter(|row| {
            if row.is_empty() {
                return false;
            }
            let filled = row.iter().filter(|c| !c.is_missing()).count();
            filled as f64 / row.len() as f64 >= threshold
        })
        .collect();

    if rows.is_empty() {
        return Vec::new();
    }

    let n_cols = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let keep_col: Vec<bool> = (0..n_cols)
        .map(|i| {
            let filled = rows
                .iter()
                .filter(|r| r.get(i).map(|c| !c.is_missing()).unwrap_or(false))
                .count();
            filled as f64 / rows.len() as f64 >= threshold
        })
        .collect();

    rows.into_iter()
        .map(|row| {
            (0..n_cols)
                .filter(|i| keep_col[*i])
                .map(|i| row.get(i).cloned().unwrap_or(Cell::Empty))
                .collect()
        })
        .collect()
}

/// Derives a label per column. The first column is the line-item field; the
/// rest prefer an explicit fiscal year (`fy_2023`) found in the header text,
/// then a cleaned header label, then a positional `col_<n>` placeholder.
fn derive_column_labels(headers: &[Cell]) -> Vec<String> {
    headers
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            if i == 0 {
                return "line_item".to_string();
            }
            let text = cell.text().trim().to_string();
            if let Some(caps) = COLUMN_YEAR_RE.captures(&text) {
                return format!("fy_{}", &caps[1]);
            }
            if cell.is_missing() || text.eq_ignore_ascii_case("nan") {
                return format!("col_{}", i);
            }
            let cleaned = clean_column_label(&text);
            if cleaned.is_empty() {
                format!("col_{}", i)
            } else {
                cleaned
            }
        })
        .collect()
}

fn clean_column_label(label: &str) -> String {
    let kept: String = label
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
        .chars()
        .take(30)
        .collect()
}
