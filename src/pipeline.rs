// src/pipeline.rs
//
// Batch driver: walks the input tree year directory by year directory,
// processes each workbook fully before the next, and never lets one bad file
// abort the run. Per-file and per-sheet failures are logged with enough
// context for manual follow-up and counted into the final summary.

use crate::consolidate::MasterConsolidator;
use crate::extractors::{classify, StatementExtractor, StatementType, StructuredRecord};
use crate::filings::{FilingMetadata, Sheet, Workbook};
use crate::storage::StorageManager;
use crate::utils::AppError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Master-table outputs and the statement type feeding each.
const MASTER_TABLES: &[(StatementType, &str)] = &[
    (StatementType::IncomeStatement, "master_income_statement.csv"),
    (StatementType::BalanceSheet, "master_balance_sheet.csv"),
    (StatementType::CashFlow, "master_cashflow.csv"),
];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Form types to process; empty means all recognized forms.
    pub forms: Vec<String>,
    pub extractor: crate::extractors::ExtractorConfig,
}

/// Final accounting of one batch run, also written as `run_summary.json`.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub completed_at: String,
    pub files_attempted: usize,
    pub files_succeeded: usize,
    pub files_failed: usize,
    pub rows_by_statement: BTreeMap<String, usize>,
    pub tables_written: Vec<String>,
}

type RecordsByType = HashMap<StatementType, Vec<StructuredRecord>>;

/// Runs the whole batch: extraction, consolidation, CSV output, summary.
/// Only a missing input root is fatal; everything else degrades to counts.
pub fn run(config: &PipelineConfig) -> Result<RunSummary, AppError> {
    if !config.input_dir.is_dir() {
        return Err(AppError::Config(format!(
            "Input directory not found: {}",
            config.input_dir.display()
        )));
    }

    let storage = StorageManager::new(&config.output_dir)?;
    let extractor = StatementExtractor::with_config(config.extractor.clone());

    let files = collect_spreadsheet_files(&config.input_dir)?;
    tracing::info!(
        "Found {} spreadsheet file(s) under {}",
        files.len(),
        config.input_dir.display()
    );

    let mut by_type: RecordsByType = HashMap::new();
    let mut attempted = 0usize;
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for path in &files {
        let metadata = FilingMetadata::from_path(path);
        if !config.forms.is_empty() && !metadata.matches_form(&config.forms) {
            tracing::debug!(
                "Skipping {} (form {:?} not requested)",
                metadata.source_file,
                metadata.form_type
            );
            continue;
        }

        attempted += 1;
        tracing::info!("Processing: {}", metadata.source_file);

        match process_workbook(path, &metadata, &extractor) {
            Ok(records) => {
                succeeded += 1;
                for record in records {
                    by_type
                        .entry(record.statement_type)
                        .or_default()
                        .push(record);
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Failed to process {}: {}", path.display(), e);
            }
        }
    }

    let (rows_by_statement, tables_written) = write_outputs(&storage, &by_type)?;

    let summary = RunSummary {
        completed_at: chrono::Utc::now().to_rfc3339(),
        files_attempted: attempted,
        files_succeeded: succeeded,
        files_failed: failed,
        rows_by_statement,
        tables_written,
    };
    storage.save_run_summary(&summary)?;

    tracing::info!(
        "Batch finished. Files: {} attempted, {} succeeded, {} failed; {} table(s) written",
        summary.files_attempted,
        summary.files_succeeded,
        summary.files_failed,
        summary.tables_written.len()
    );
    Ok(summary)
}

/// Spreadsheet files from the input root and its year subdirectories, both
/// in sorted order so runs are reproducible.
fn collect_spreadsheet_files(input_dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut year_dirs = Vec::new();
    let mut files = Vec::new();

    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            year_dirs.push(path);
        } else if is_spreadsheet(&path) {
            files.push(path);
        }
    }
    year_dirs.sort();
    files.sort();

    for dir in year_dirs {
        let mut dir_files: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_spreadsheet(p))
            .collect();
        dir_files.sort();
        files.extend(dir_files);
    }

    Ok(files)
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            let ext = e.to_string_lossy().to_lowercase();
            ext == "xlsx" || ext == "xlsm" || ext == "xls"
        })
        .unwrap_or(false)
}

/// Opens one workbook and extracts every classifiable sheet. Sheet-level
/// problems are logged and skipped; only a file that cannot be opened at all
/// errors out to the caller's failure count.
fn process_workbook(
    path: &Path,
    metadata: &FilingMetadata,
    extractor: &StatementExtractor,
) -> Result<Vec<StructuredRecord>, AppError> {
    let mut workbook = Workbook::open(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    let mut records = Vec::new();
    for name in sheet_names {
        if classify::is_skippable_sheet_name(&name) {
            tracing::debug!("Skipping sheet '{}' by name", name);
            continue;
        }

        let sheet = match workbook.read_sheet(&name) {
            Ok(sheet) => sheet,
            Err(e) => {
                tracing::warn!("Could not read sheet '{}' in {}: {}", name, path.display(), e);
                continue;
            }
        };

        records.extend(extract_sheet(&sheet, metadata, extractor));
    }

    if records.is_empty() {
        tracing::warn!("No usable statement rows in {}", path.display());
    }
    Ok(records)
}

/// Classifies one sheet by content and extracts it when it lands in a
/// reportable category. A sheet yielding nothing is expected, not an error.
fn extract_sheet(
    sheet: &Sheet,
    metadata: &FilingMetadata,
    extractor: &StatementExtractor,
) -> Vec<StructuredRecord> {
    let statement_type = classify::classify_by_content(&sheet.grid);
    if !StatementType::REPORTABLE.contains(&statement_type) {
        tracing::debug!("Sheet '{}' classified as {}, skipping", sheet.name, statement_type);
        return Vec::new();
    }

    let records = extractor.extract(sheet, statement_type, metadata);
    if records.is_empty() {
        tracing::warn!(
            "Sheet '{}' classified as {} but produced no usable rows",
            sheet.name,
            statement_type
        );
    }
    records
}

/// Writes every non-empty statement table and the three master tables.
fn write_outputs(
    storage: &StorageManager,
    by_type: &RecordsByType,
) -> Result<(BTreeMap<String, usize>, Vec<String>), AppError> {
    let mut rows_by_statement = BTreeMap::new();
    let mut tables_written = Vec::new();

    for statement_type in StatementType::REPORTABLE {
        let Some(records) = by_type.get(&statement_type) else {
            continue;
        };
        if records.is_empty() {
            continue;
        }
        storage.save_statement_table(statement_type, records)?;
        rows_by_statement.insert(statement_type.to_string(), records.len());
        tables_written.push(format!("{}.csv", statement_type));
    }

    for (statement_type, filename) in MASTER_TABLES {
        let Some(records) = by_type.get(statement_type) else {
            continue;
        };
        if records.is_empty() {
            continue;
        }
        let consolidator = match statement_type {
            StatementType::IncomeStatement => MasterConsolidator::for_income_statement(),
            StatementType::BalanceSheet => MasterConsolidator::for_balance_sheet(),
            _ => MasterConsolidator::for_cash_flow(),
        };
        let table = consolidator.consolidate(records);
        storage.save_master_table(filename, &table)?;
        tables_written.push((*filename).to_string());
    }

    Ok((rows_by_statement, tables_written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filings::Cell;
    use std::path::PathBuf;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    fn meta(year: i32) -> FilingMetadata {
        FilingMetadata::from_path(&PathBuf::from(format!(
            "Acme Corp(10-K) {}-06-15 Annual report.xlsx",
            year
        )))
    }

    fn income_sheet(fy: i32, revenue: f64, cogs: f64, net_income: f64) -> Sheet {
        Sheet {
            name: "Consolidated Statements of Operations".to_string(),
            grid: vec![
                vec![text(""), text(&format!("Year ended March 31, {}", fy))],
                vec![text("Net revenues"), num(revenue)],
                vec![text("Cost of revenues"), num(cogs)],
                vec![text("Net income"), num(net_income)],
                vec![text("Loss from operations"), Cell::Empty],
            ],
        }
    }

    fn quarterly_sheet() -> Sheet {
        Sheet {
            name: "Quarterly Results".to_string(),
            grid: vec![
                vec![
                    text(""),
                    text("June 30,"),
                    text("September 30,"),
                    text("December 31,"),
                    text("March 31,"),
                ],
                vec![text("Net revenues"), num(8000.0), num(8200.0), num(8300.0), num(8900.0)],
                vec![text("Gross profit"), num(4000.0), num(4100.0), num(4200.0), num(4400.0)],
                vec![text("Net income"), num(500.0), num(520.0), num(530.0), num(560.0)],
            ],
        }
    }

    #[test]
    fn test_round_trip_two_year_workbooks() {
        let extractor = StatementExtractor::new();
        let mut records = Vec::new();

        records.extend(extract_sheet(
            &income_sheet(2023, 33400.0, 13100.0, 5000.0),
            &meta(2023),
            &extractor,
        ));
        records.extend(extract_sheet(
            &income_sheet(2022, 29700.0, 12000.0, 4200.0),
            &meta(2022),
            &extractor,
        ));

        let table = MasterConsolidator::for_income_statement().consolidate(&records);

        assert_eq!(table.get(2023, "revenue"), Some(33400.0));
        assert_eq!(table.get(2023, "cost_of_revenue"), Some(13100.0));
        assert_eq!(table.get(2023, "net_income"), Some(5000.0));
        assert_eq!(table.get(2023, "net_income_final"), Some(5000.0));
        assert_eq!(table.get(2022, "revenue"), Some(29700.0));
        assert_eq!(table.get(2022, "net_income"), Some(4200.0));

        // A year with no filing stays missing, not zero
        assert_eq!(table.get(2021, "revenue"), None);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_quarterly_sheet_excluded_from_annual_master() {
        let extractor = StatementExtractor::new();
        let records = extract_sheet(&quarterly_sheet(), &meta(2024), &extractor);

        // The sheet classifies and extracts fine...
        assert!(!records.is_empty());
        assert_eq!(records[0].statement_type, StatementType::IncomeStatement);

        // ...but every row carries 4 populated quarter-end columns, so the
        // annual master takes nothing from it.
        let table = MasterConsolidator::for_income_statement().consolidate(&records);
        assert_eq!(table.get(2024, "revenue"), None);
        assert_eq!(table.get(2024, "net_income"), None);
    }

    #[test]
    fn test_unclassifiable_sheet_extracts_nothing() {
        let extractor = StatementExtractor::new();
        let sheet = Sheet {
            name: "Cover".to_string(),
            grid: vec![
                vec![text("Document type"), text("10-K")],
                vec![text("Registrant"), text("Acme Corp")],
                vec![text("Trading symbol"), text("ACME")],
            ],
        };

        assert!(extract_sheet(&sheet, &meta(2023), &extractor).is_empty());
    }

    #[test]
    fn test_missing_input_dir_is_fatal() {
        let out = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            input_dir: PathBuf::from("/nonexistent/filing/root"),
            output_dir: out.path().to_path_buf(),
            forms: vec!["10-K".to_string()],
            extractor: Default::default(),
        };

        assert!(matches!(run(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_empty_input_dir_yields_empty_summary() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            input_dir: input.path().to_path_buf(),
            output_dir: output.path().to_path_buf(),
            forms: vec!["10-K".to_string()],
            extractor: Default::default(),
        };

        let summary = run(&config).unwrap();
        assert_eq!(summary.files_attempted, 0);
        assert_eq!(summary.files_succeeded, 0);
        assert_eq!(summary.files_failed, 0);
        assert!(summary.tables_written.is_empty());
        assert!(output.path().join("run_summary.json").is_file());
    }
}
