// src/extractors/classify.rs
//
// Decides which financial-statement category a sheet belongs to. Two
// strategies: a cheap sheet-name match used only to skip obviously
// irrelevant sheets, and content scoring over the first column, which is the
// authoritative strategy (sheet names in filing exports are frequently
// truncated or meaningless).

use crate::filings::Cell;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A winning content score below this is treated as ambiguous.
const MIN_CONTENT_SCORE: usize = 2;

/// Financial statement categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
    Equity,
    ComprehensiveIncome,
    Compensation,
    Other,
    Unknown,
}

impl StatementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementType::BalanceSheet => "balance_sheet",
            StatementType::IncomeStatement => "income_statement",
            StatementType::CashFlow => "cash_flow",
            StatementType::Equity => "equity",
            StatementType::ComprehensiveIncome => "comprehensive_income",
            StatementType::Compensation => "compensation",
            StatementType::Other => "other",
            StatementType::Unknown => "unknown",
        }
    }

    /// Categories that produce output tables.
    pub const REPORTABLE: [StatementType; 6] = [
        StatementType::BalanceSheet,
        StatementType::IncomeStatement,
        StatementType::CashFlow,
        StatementType::Equity,
        StatementType::ComprehensiveIncome,
        StatementType::Compensation,
    ];
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Content keyword lists, one per category. Tie-breaking follows the order of
// this table: balance sheet > income statement > cash flow > equity >
// comprehensive income > compensation.
const CONTENT_KEYWORDS: &[(StatementType, &[&str])] = &[
    (
        StatementType::BalanceSheet,
        &[
            "assets",
            "liabilities",
            "cash and cash equivalents",
            "accounts receivable",
            "inventories",
            "stockholders equity",
            "property and equipment",
            "current assets",
        ],
    ),
    (
        StatementType::IncomeStatement,
        &[
            "net revenues",
            "revenue",
            "cost of revenues",
            "gross profit",
            "operating expenses",
            "research and development",
            "selling, general and administrative",
            "net income",
            "net loss",
            "loss from operations",
            "income from operations",
        ],
    ),
    (
        StatementType::CashFlow,
        &[
            "cash flows",
            "operating activities",
            "investing activities",
            "financing activities",
            "net increase",
            "net decrease",
            "depreciation",
            "capital expenditures",
        ],
    ),
    (
        StatementType::Equity,
        &[
            "common stock",
            "additional paid-in capital",
            "retained earnings",
            "accumulated other comprehensive",
            "treasury stock",
            "stock-based compensation expense",
            "issuance of common stock",
        ],
    ),
    (
        StatementType::ComprehensiveIncome,
        &[
            "comprehensive income",
            "comprehensive loss",
            "unrealized gain",
            "unrealized loss",
        ],
    ),
    (
        StatementType::Compensation,
        &[
            "salary",
            "bonus",
            "stock awards",
            "option awards",
            "non-equity incentive",
            "all other compensation",
            "total compensation",
        ],
    ),
];

// Name keyword sets, checked in order; first match wins.
const NAME_KEYWORDS: &[(StatementType, &[&str])] = &[
    (StatementType::BalanceSheet, &["balance sheet", "balance", "assets", "liabilities"]),
    (
        StatementType::IncomeStatement,
        &["income statement", "income", "operations", "profit", "loss"],
    ),
    (StatementType::CashFlow, &["cash flow", "cash"]),
    (StatementType::ComprehensiveIncome, &["comprehensive"]),
    (StatementType::Equity, &["equity", "stockholders", "shareholders"]),
    (StatementType::Compensation, &["compensation", "executive"]),
];

// Sheets whose names mark them as uninteresting before any read.
const SKIP_NAME_KEYWORDS: &[&str] = &[
    "exhibit",
    "no title",
    "note",
    "accounting pronouncements",
    "fair value measurement",
    "stock pu",
];

/// Fast pre-filter: true when the sheet name alone marks it as not worth
/// reading (exhibits, notes, boilerplate).
pub fn is_skippable_sheet_name(sheet_name: &str) -> bool {
    let name = sheet_name.to_lowercase();
    SKIP_NAME_KEYWORDS.iter().any(|kw| name.contains(kw))
}

/// Name-based classification. Cheap and unreliable; use only as a first
/// filter. No match yields `Other`.
pub fn classify_by_name(sheet_name: &str) -> StatementType {
    let name = sheet_name.to_lowercase();
    for (stmt_type, keywords) in NAME_KEYWORDS {
        if keywords.iter().any(|kw| name.contains(kw)) {
            return *stmt_type;
        }
    }
    StatementType::Other
}

/// Content-based classification: counts category keywords across the first
/// column's text. The top category wins only with a score of at least two;
/// anything weaker is `Unknown`. This is the canonical strategy.
pub fn classify_by_content(grid: &[Vec<Cell>]) -> StatementType {
    if grid.len() < 3 {
        return StatementType::Unknown;
    }

    let first_col_text = grid
        .iter()
        .filter_map(|row| row.first())
        .filter(|c| !c.is_missing())
        .map(|c| c.text().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut best = StatementType::Unknown;
    let mut best_score = 0usize;
    for (stmt_type, keywords) in CONTENT_KEYWORDS {
        let score = keywords
            .iter()
            .filter(|kw| first_col_text.contains(*kw))
            .count();
        // Strict comparison keeps the earlier (higher priority) category on ties.
        if score > best_score {
            best = *stmt_type;
            best_score = score;
        }
    }

    if best_score >= MIN_CONTENT_SCORE {
        best
    } else {
        StatementType::Unknown
    }
}
