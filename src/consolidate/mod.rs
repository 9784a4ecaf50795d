// src/consolidate/mod.rs
//
// Merges many years of structured statement records into one master table:
// one row per fiscal year, one column per canonical item. The interesting
// part is candidate resolution — the same concept shows up in several sheets
// of several filings (comparative columns, restated figures, MD&A tables),
// and exactly one value has to win per (year, item).

use crate::extractors::StructuredRecord;
use std::collections::BTreeSet;

/// Column labels that mark a source row as a quarterly breakdown. A row with
/// two or more of these populated is mis-scoped for an annual table.
const QUARTER_COLUMNS: &[&str] = &["june_30", "september_30", "december_31", "march_31"];

/// Values at or below this magnitude are treated as noise when aggregating.
const NOISE_FLOOR: f64 = 0.01;

/// Values above this magnitude look like real dollar-thousands figures;
/// smaller survivors are usually stray percentages or share counts.
const MAGNITUDE_PREFERENCE: f64 = 100.0;

/// One canonical master-table column and the line-item substrings that feed it.
pub struct ItemMapping {
    pub field: &'static str,
    pub patterns: &'static [&'static str],
}

pub const INCOME_STATEMENT_ITEMS: &[ItemMapping] = &[
    ItemMapping { field: "revenue", patterns: &["net revenue", "total revenue", "revenue"] },
    ItemMapping { field: "cost_of_revenue", patterns: &["cost of goods sold", "cost of revenue", "cogs"] },
    ItemMapping { field: "gross_profit", patterns: &["gross profit"] },
    ItemMapping { field: "research_development", patterns: &["research", "r&d", "research and development"] },
    ItemMapping { field: "selling_general_admin", patterns: &["selling, general", "sg&a", "sga"] },
    ItemMapping { field: "operating_expenses", patterns: &["total operating expense", "operating expense"] },
    ItemMapping { field: "operating_income", patterns: &["operating income", "operating profit"] },
    ItemMapping { field: "operating_loss", patterns: &["operating loss"] },
    ItemMapping { field: "interest_expense", patterns: &["interest expense"] },
    ItemMapping { field: "other_income", patterns: &["other income", "interest and other income"] },
    ItemMapping { field: "income_before_tax", patterns: &["income before tax", "pretax income"] },
    ItemMapping { field: "tax_expense", patterns: &["income tax", "tax expense", "provision for income"] },
    ItemMapping { field: "net_income", patterns: &["net income"] },
    ItemMapping { field: "net_loss", patterns: &["net loss"] },
    ItemMapping { field: "eps_basic", patterns: &["basic", "per share, basic"] },
    ItemMapping { field: "eps_diluted", patterns: &["diluted", "per share, diluted"] },
];

pub const BALANCE_SHEET_ITEMS: &[ItemMapping] = &[
    ItemMapping { field: "cash_and_equivalents", patterns: &["cash and cash equivalents", "cash"] },
    ItemMapping { field: "short_term_investments", patterns: &["short-term investment", "short term investment"] },
    ItemMapping { field: "accounts_receivable", patterns: &["accounts receivable", "receivable"] },
    ItemMapping { field: "inventories", patterns: &["inventories", "inventory"] },
    ItemMapping { field: "current_assets", patterns: &["total current assets", "current assets"] },
    ItemMapping { field: "property_equipment", patterns: &["property and equipment", "property, plant"] },
    ItemMapping { field: "total_assets", patterns: &["total assets"] },
    ItemMapping { field: "accounts_payable", patterns: &["accounts payable", "payable"] },
    ItemMapping { field: "accrued_expenses", patterns: &["accrued expense"] },
    ItemMapping { field: "short_term_debt", patterns: &["short-term debt", "current portion"] },
    ItemMapping { field: "current_liabilities", patterns: &["total current liabilities", "current liabilities"] },
    ItemMapping { field: "long_term_debt", patterns: &["long-term debt", "long term debt"] },
    ItemMapping { field: "total_liabilities", patterns: &["total liabilities"] },
    ItemMapping { field: "stockholders_equity", patterns: &["stockholders equity", "shareholders equity", "stockholders' equity", "total equity"] },
    ItemMapping { field: "common_stock", patterns: &["common stock"] },
    ItemMapping { field: "retained_earnings", patterns: &["retained earnings"] },
];

pub const CASH_FLOW_ITEMS: &[ItemMapping] = &[
    ItemMapping { field: "net_income", patterns: &["net income", "net loss"] },
    ItemMapping { field: "depreciation_amortization", patterns: &["depreciation", "amortization"] },
    ItemMapping { field: "stock_based_compensation", patterns: &["stock-based compensation", "stock based"] },
    ItemMapping { field: "changes_working_capital", patterns: &["working capital"] },
    ItemMapping { field: "operating_cash_flow", patterns: &["operating activities", "cash from operations", "net cash provided by operating"] },
    ItemMapping { field: "capital_expenditures", patterns: &["capital expenditure", "capex", "property and equipment"] },
    ItemMapping { field: "investing_cash_flow", patterns: &["investing activities", "cash from investing", "net cash used in investing"] },
    ItemMapping { field: "financing_cash_flow", patterns: &["financing activities", "cash from financing", "net cash provided by financing"] },
    ItemMapping { field: "net_change_cash", patterns: &["net increase", "net change in cash"] },
];

/// Provenance ranking for a source sheet: lower is more trusted. The numbers
/// themselves are a tuned heuristic, not an invariant — only the relative
/// order is relied on.
pub fn sheet_priority(sheet_name: &str) -> u8 {
    let name = sheet_name.to_lowercase();
    if name.contains("financial statement") {
        0
    } else if name.contains("consolidated") && (name.contains("operation") || name.contains("balance")) {
        1
    } else if name.contains("operations") || name.contains("income") {
        2
    } else if name.contains("balance") {
        3
    } else if name.contains("valuation") || name.contains("contingent") {
        4
    } else if name.contains("consideration") {
        // Contingent-consideration schedules often restate quarterly figures
        8
    } else if name.contains("management") || name.contains("selected financial") {
        // MD&A and selected-data tables present percentages, not raw figures
        9
    } else {
        5
    }
}

/// One resolved row: a fiscal year and one optional value per column of the
/// owning `MasterTable`. Missing stays missing — never zero.
#[derive(Debug, Clone)]
pub struct MasterRow {
    pub year: i32,
    values: Vec<Option<f64>>,
}

impl MasterRow {
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }
}

/// One row per fiscal year, one column per canonical line item.
#[derive(Debug, Clone)]
pub struct MasterTable {
    pub columns: Vec<String>,
    pub rows: Vec<MasterRow>,
}

impl MasterTable {
    /// Resolved value for `(year, field)`, or `None` when either is absent.
    pub fn get(&self, year: i32, field: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == field)?;
        self.rows
            .iter()
            .find(|r| r.year == year)
            .and_then(|r| r.values[col])
    }
}

pub struct MasterConsolidator {
    items: &'static [ItemMapping],
    derive_net_income_final: bool,
}

impl MasterConsolidator {
    pub fn for_income_statement() -> Self {
        MasterConsolidator {
            items: INCOME_STATEMENT_ITEMS,
            derive_net_income_final: true,
        }
    }

    pub fn for_balance_sheet() -> Self {
        MasterConsolidator {
            items: BALANCE_SHEET_ITEMS,
            derive_net_income_final: false,
        }
    }

    pub fn for_cash_flow() -> Self {
        MasterConsolidator {
            items: CASH_FLOW_ITEMS,
            derive_net_income_final: false,
        }
    }

    /// Consolidates records from many filings into one master table. Records
    /// without a recoverable fiscal year cannot join and are ignored.
    pub fn consolidate(&self, records: &[StructuredRecord]) -> MasterTable {
        let years: BTreeSet<i32> = records.iter().filter_map(|r| r.metadata.year).collect();

        let mut columns: Vec<String> = self.items.iter().map(|m| m.field.to_string()).collect();
        if self.derive_net_income_final {
            columns.push("net_income_final".to_string());
        }

        let mut rows = Vec::new();
        for year in years {
            let year_records: Vec<&StructuredRecord> = records
                .iter()
                .filter(|r| r.metadata.year == Some(year))
                .collect();

            let mut values: Vec<Option<f64>> = self
                .items
                .iter()
                .map(|item| resolve_item(&year_records, item))
                .collect();

            if self.derive_net_income_final {
                let net_income = field_value(&values, self.items, "net_income");
                let net_loss = field_value(&values, self.items, "net_loss");
                // Losses are carried as positive magnitudes; negate to merge
                // into a single profit/loss series.
                values.push(net_income.or(net_loss.map(|v| -v)));
            }

            rows.push(MasterRow { year, values });
        }

        MasterTable { columns, rows }
    }
}

fn field_value(values: &[Option<f64>], items: &[ItemMapping], field: &str) -> Option<f64> {
    items
        .iter()
        .position(|m| m.field == field)
        .and_then(|idx| values[idx])
}

/// Resolves one (year, canonical item) pair from all candidate records.
///
/// Patterns are tried in order; the first pattern that produces any candidate
/// settles the search. Candidates are ranked by sheet provenance, then column
/// position, and a large-magnitude candidate is preferred over a small one
/// when both survive the ranking.
fn resolve_item(year_records: &[&StructuredRecord], item: &ItemMapping) -> Option<f64> {
    for pattern in item.patterns {
        let mut candidates: Vec<(u8, usize, f64)> = Vec::new();

        for record in year_records {
            if !record.line_item.to_lowercase().contains(pattern) {
                continue;
            }
            if is_quarterly_row(record) {
                continue;
            }

            let priority = sheet_priority(&record.sheet_name);
            for (col_idx, (_, value)) in record.values.iter().enumerate() {
                if let Some(v) = value {
                    if v.abs() > NOISE_FLOOR {
                        candidates.push((priority, col_idx, v.abs()));
                    }
                }
            }
        }

        if candidates.is_empty() {
            continue;
        }

        candidates.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        let resolved = candidates
            .iter()
            .find(|(_, _, v)| *v > MAGNITUDE_PREFERENCE)
            .or_else(|| candidates.first())
            .map(|(_, _, v)| *v);
        return resolved;
    }
    None
}

/// True when the source row carries actual quarterly data: at least two
/// quarter-end columns populated.
fn is_quarterly_row(record: &StructuredRecord) -> bool {
    let populated = record
        .values
        .iter()
        .filter(|(label, value)| QUARTER_COLUMNS.contains(&label.as_str()) && value.is_some())
        .count();
    populated >= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::StatementType;
    use crate::filings::FilingMetadata;
    use std::path::PathBuf;

    fn record(
        year: i32,
        sheet_name: &str,
        line_item: &str,
        values: Vec<(&str, Option<f64>)>,
    ) -> StructuredRecord {
        let mut metadata = FilingMetadata::from_path(&PathBuf::from(format!(
            "Acme Corp(10-K) {}-06-15 Annual report.xlsx",
            year
        )));
        metadata.year = Some(year);
        StructuredRecord {
            metadata,
            statement_type: StatementType::IncomeStatement,
            sheet_name: sheet_name.to_string(),
            line_item: line_item.to_string(),
            values: values
                .into_iter()
                .map(|(l, v)| (l.to_string(), v))
                .collect(),
        }
    }

    #[test]
    fn test_provenance_priority_wins() {
        // Operations sheet at priority 1 vs selected-data sheet at
        // priority 9, with magnitudes agreeing on the winner.
        let records = vec![
            record(
                2023,
                "Selected Financial Data",
                "Net revenues",
                vec![("fy_2023", Some(33.4))],
            ),
            record(
                2023,
                "Consolidated Statements of Operations",
                "Net revenues",
                vec![("fy_2023", Some(33400.0))],
            ),
        ];

        let table = MasterConsolidator::for_income_statement().consolidate(&records);
        assert_eq!(table.get(2023, "revenue"), Some(33400.0));
    }

    #[test]
    fn test_earlier_column_wins_within_priority() {
        let records = vec![record(
            2023,
            "Consolidated Statements of Operations",
            "Net revenues",
            vec![("fy_2023", Some(33400.0)), ("fy_2022", Some(29700.0))],
        )];

        let table = MasterConsolidator::for_income_statement().consolidate(&records);
        assert_eq!(table.get(2023, "revenue"), Some(33400.0));
    }

    #[test]
    fn test_quarterly_rows_excluded() {
        let records = vec![
            record(
                2023,
                "Quarterly Results",
                "Net revenues",
                vec![
                    ("june_30", Some(8000.0)),
                    ("september_30", Some(8200.0)),
                    ("december_31", Some(8300.0)),
                    ("march_31", Some(8900.0)),
                ],
            ),
            record(
                2023,
                "Consolidated Statements of Operations",
                "Net revenues",
                vec![("fy_2023", Some(33400.0))],
            ),
        ];

        let table = MasterConsolidator::for_income_statement().consolidate(&records);
        assert_eq!(table.get(2023, "revenue"), Some(33400.0));
    }

    #[test]
    fn test_all_quarterly_year_stays_missing() {
        let records = vec![record(
            2023,
            "Quarterly Results",
            "Net revenues",
            vec![
                ("june_30", Some(8000.0)),
                ("september_30", Some(8200.0)),
                ("december_31", Some(8300.0)),
                ("march_31", Some(8900.0)),
            ],
        )];

        let table = MasterConsolidator::for_income_statement().consolidate(&records);
        assert_eq!(table.get(2023, "revenue"), None);
    }

    #[test]
    fn test_noise_floor_and_magnitude_preference() {
        let records = vec![record(
            2023,
            "Consolidated Statements of Operations",
            "Net revenues",
            vec![
                ("fy_2023", Some(0.005)),  // under the noise floor, dropped
                ("fy_2022", Some(12.5)),   // small survivor
                ("fy_2021", Some(31000.0)) // preferred large magnitude
            ],
        )];

        let table = MasterConsolidator::for_income_statement().consolidate(&records);
        assert_eq!(table.get(2023, "revenue"), Some(31000.0));
    }

    #[test]
    fn test_small_value_kept_when_nothing_large_exists() {
        let records = vec![record(
            2023,
            "Consolidated Statements of Operations",
            "Basic earnings per share",
            vec![("fy_2023", Some(0.42))],
        )];

        let table = MasterConsolidator::for_income_statement().consolidate(&records);
        assert_eq!(table.get(2023, "eps_basic"), Some(0.42));
    }

    #[test]
    fn test_net_income_final_from_net_loss() {
        let records = vec![record(
            2021,
            "Consolidated Statements of Operations",
            "Net loss",
            vec![("fy_2021", Some(-4200.0))],
        )];

        let table = MasterConsolidator::for_income_statement().consolidate(&records);
        // Candidate magnitudes are absolute, so net_loss carries 4200...
        assert_eq!(table.get(2021, "net_loss"), Some(4200.0));
        // ...and the merged series negates it back.
        assert_eq!(table.get(2021, "net_income_final"), Some(-4200.0));
    }

    #[test]
    fn test_missing_year_row_absent_not_zero() {
        let records = vec![record(
            2023,
            "Consolidated Statements of Operations",
            "Net revenues",
            vec![("fy_2023", Some(33400.0))],
        )];

        let table = MasterConsolidator::for_income_statement().consolidate(&records);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.get(2022, "revenue"), None);
    }

    #[test]
    fn test_one_row_per_year() {
        let records = vec![
            record(
                2022,
                "Consolidated Statements of Operations",
                "Net revenues",
                vec![("fy_2022", Some(29700.0))],
            ),
            record(
                2022,
                "Consolidated Statements of Operations",
                "Gross profit",
                vec![("fy_2022", Some(17700.0))],
            ),
            record(
                2023,
                "Consolidated Statements of Operations",
                "Net revenues",
                vec![("fy_2023", Some(33400.0))],
            ),
        ];

        let table = MasterConsolidator::for_income_statement().consolidate(&records);
        assert_eq!(table.rows.len(), 2);
        let years: Vec<i32> = table.rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2022, 2023]);
    }

    #[test]
    fn test_sheet_priority_relative_order() {
        // The absolute numbers are a tunable heuristic; the tests pin only
        // the relative ordering.
        let p = sheet_priority;
        assert!(p("Consolidated Financial Statements") < p("Consolidated Statements of Operations"));
        assert!(p("Consolidated Statements of Operations") < p("Statements of Operations"));
        assert!(p("Statements of Operations") < p("Balance Data"));
        assert!(p("Balance Data") < p("Valuation of Contingent"));
        assert!(p("Valuation of Contingent") < p("Miscellaneous Tab"));
        assert!(p("Miscellaneous Tab") < p("Consideration Schedule"));
        assert!(p("Consideration Schedule") < p("Selected Financial Data"));
    }
}
