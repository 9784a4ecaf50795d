// src/storage/mod.rs
use crate::consolidate::MasterTable;
use crate::extractors::{StatementType, StructuredRecord};
use crate::utils::error::StorageError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata fields every statement CSV starts with, in output order.
const METADATA_HEADERS: &[&str] = &[
    "source_file",
    "company",
    "form_type",
    "filing_date",
    "year",
    "statement_type",
    "sheet_name",
    "line_item",
];

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// Writes one statement type's structured records as a CSV table.
    /// Period columns are the union across records: fiscal-year columns
    /// sorted first, then the rest in order of first appearance.
    pub fn save_statement_table(
        &self,
        statement_type: StatementType,
        records: &[StructuredRecord],
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(format!("{}.csv", statement_type));
        let period_columns = period_column_union(records);

        let mut writer = csv::Writer::from_path(&file_path)?;

        let mut header: Vec<String> = METADATA_HEADERS.iter().map(|h| h.to_string()).collect();
        header.extend(period_columns.iter().cloned());
        writer.write_record(&header)?;

        for record in records {
            let meta = &record.metadata;
            let mut row = vec![
                meta.source_file.clone(),
                meta.company.clone().unwrap_or_default(),
                meta.form_type.clone().unwrap_or_default(),
                meta.filing_date_string(),
                meta.year.map(|y| y.to_string()).unwrap_or_default(),
                record.statement_type.to_string(),
                record.sheet_name.clone(),
                record.line_item.clone(),
            ];
            for column in &period_columns {
                row.push(record.value(column).map(format_number).unwrap_or_default());
            }
            writer.write_record(&row)?;
        }
        writer.flush().map_err(StorageError::IoError)?;

        tracing::info!(
            "Saved {} rows of {} to {}",
            records.len(),
            statement_type,
            file_path.display()
        );
        Ok(file_path)
    }

    /// Writes a consolidated master table (one row per fiscal year).
    /// Missing values are written as empty fields, never zero.
    pub fn save_master_table(
        &self,
        filename: &str,
        table: &MasterTable,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(filename);

        let mut writer = csv::Writer::from_path(&file_path)?;

        let mut header = vec!["year".to_string()];
        header.extend(table.columns.iter().cloned());
        writer.write_record(&header)?;

        for row in &table.rows {
            let mut fields = vec![row.year.to_string()];
            for value in row.values() {
                fields.push(value.map(format_number).unwrap_or_default());
            }
            writer.write_record(&fields)?;
        }
        writer.flush().map_err(StorageError::IoError)?;

        tracing::info!(
            "Saved master table ({} years) to {}",
            table.rows.len(),
            file_path.display()
        );
        Ok(file_path)
    }

    /// Writes the machine-readable run summary as pretty JSON.
    pub fn save_run_summary<T: Serialize>(&self, summary: &T) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("run_summary.json");

        let summary_str = serde_json::to_string_pretty(summary)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, summary_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved run summary to {}", file_path.display());
        Ok(file_path)
    }
}

/// Union of period column labels across records. `fy_*` columns sort first
/// (ascending year), everything else keeps first-appearance order after them.
fn period_column_union(records: &[StructuredRecord]) -> Vec<String> {
    let mut fiscal: Vec<String> = Vec::new();
    let mut other: Vec<String> = Vec::new();
    for record in records {
        for (label, _) in &record.values {
            if label.starts_with("fy_") {
                if !fiscal.contains(label) {
                    fiscal.push(label.clone());
                }
            } else if !other.contains(label) {
                other.push(label.clone());
            }
        }
    }
    fiscal.sort();
    fiscal.extend(other);
    fiscal
}

fn format_number(value: f64) -> String {
    format!("{}", value)
}
