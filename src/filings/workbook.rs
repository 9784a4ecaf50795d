// src/filings/workbook.rs
//
// Thin I/O wrapper around calamine. No inference happens here: a workbook is
// opened, its sheets are read into raw cell grids, and the file handle is
// released when the `Workbook` drops.

use crate::utils::error::AccessError;
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use std::io::BufReader;
use std::path::{Path, PathBuf};

const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

/// One raw cell value, exactly as found in the source sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Dates are carried as their rendered text; nothing downstream does
    /// date arithmetic on cell values.
    Date(String),
}

impl Cell {
    /// Blank cells and whitespace-only text both count as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for keyword scans and header labels.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                // Avoid trailing ".0" for whole numbers
                if *n == n.trunc() && n.abs() < i64::MAX as f64 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Bool(b) => b.to_string(),
            Cell::Date(s) => s.clone(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Date(excel_serial_to_date_string(dt.as_f64())),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Date(s.clone()),
            Data::Error(e) => Cell::Text(format!("#ERR:{:?}", e)),
        }
    }
}

/// A named 2-D grid of raw cell values. Immutable once read.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub grid: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn n_rows(&self) -> usize {
        self.grid.len()
    }

    pub fn n_cols(&self) -> usize {
        self.grid.iter().map(|r| r.len()).max().unwrap_or(0)
    }
}

/// An open spreadsheet file. Holds the underlying file handle for its whole
/// lifetime; dropping the `Workbook` releases it on every path.
pub struct Workbook {
    path: PathBuf,
    names: Vec<String>,
    inner: Sheets<BufReader<std::fs::File>>,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("path", &self.path)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl Workbook {
    /// Opens a workbook, failing if the file cannot be parsed as a
    /// spreadsheet (corrupt, unsupported format, password-protected).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AccessError> {
        let path = path.as_ref().to_path_buf();

        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(AccessError::UnsupportedFormat(path));
        }

        let inner = open_workbook_auto(&path).map_err(|e| AccessError::Open {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let names = inner.sheet_names().to_vec();

        tracing::debug!("Opened workbook {} ({} sheets)", path.display(), names.len());
        Ok(Workbook { path, names, inner })
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> &[String] {
        &self.names
    }

    /// Reads one sheet into a rectangular grid of raw cells.
    pub fn read_sheet(&mut self, name: &str) -> Result<Sheet, AccessError> {
        if !self.names.iter().any(|n| n == name) {
            return Err(AccessError::SheetNotFound(name.to_string()));
        }

        let range = self
            .inner
            .worksheet_range(name)
            .map_err(|e| AccessError::SheetRead {
                sheet: name.to_string(),
                message: e.to_string(),
            })?;

        tracing::trace!(
            "Read sheet '{}' from {}: {:?} cells",
            name,
            self.path.display(),
            range.get_size()
        );

        Ok(Sheet {
            name: name.to_string(),
            grid: range_to_grid(&range),
        })
    }
}

fn range_to_grid(range: &Range<Data>) -> Vec<Vec<Cell>> {
    range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect()
}

/// Converts an Excel serial date to `YYYY-MM-DD`. Serial 1 is 1900-01-01;
/// serials past 59 must drop a day for the phantom 1900-02-29.
fn excel_serial_to_date_string(serial: f64) -> String {
    let mut days = serial.trunc() as i64;
    if days > 59 {
        days -= 1;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 31).expect("valid epoch");
    match epoch.checked_add_signed(Duration::days(days)) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => format!("{}", serial),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_calamine_data() {
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
        assert_eq!(
            Cell::from(&Data::String("Total assets".to_string())),
            Cell::Text("Total assets".to_string())
        );
        assert_eq!(Cell::from(&Data::Int(42)), Cell::Number(42.0));
        assert_eq!(Cell::from(&Data::Float(1.5)), Cell::Number(1.5));
    }

    #[test]
    fn test_cell_missing() {
        assert!(Cell::Empty.is_missing());
        assert!(Cell::Text("   ".to_string()).is_missing());
        assert!(!Cell::Text("x".to_string()).is_missing());
        assert!(!Cell::Number(0.0).is_missing());
    }

    #[test]
    fn test_cell_text_drops_trailing_zero() {
        assert_eq!(Cell::Number(2023.0).text(), "2023");
        assert_eq!(Cell::Number(3.25).text(), "3.25");
    }

    #[test]
    fn test_excel_serial_conversion() {
        // 2023-06-15 is serial 45092
        assert_eq!(excel_serial_to_date_string(45092.0), "2023-06-15");
        // Serial 1 is 1900-01-01
        assert_eq!(excel_serial_to_date_string(1.0), "1900-01-01");
    }

    #[test]
    fn test_open_rejects_unknown_extension() {
        let err = Workbook::open("somefile.txt").unwrap_err();
        assert!(matches!(err, AccessError::UnsupportedFormat(_)));
    }
}
