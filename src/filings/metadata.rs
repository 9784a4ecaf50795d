// src/filings/metadata.rs
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

// --- Regex Patterns for Filename Matching (Lazy Static) ---
// Filenames follow the EDGAR export convention:
//   "<Company Name>(<FORM-TYPE>) <YYYY-MM-DD> <description>.xlsx"
static FORM_TYPE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(8-K)",
        r"(?i)(10-K)",
        r"(?i)(10-Q)",
        r"(?i)(DEF\s*14A)",
        r"(?i)(S-\d+)",
        r"(?i)(ARS)",
        r"(?i)Form\s+(\w+-?\w*)",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

static FILING_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("Failed to compile FILING_DATE_RE"));

static COMPANY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^(]+)").expect("Failed to compile COMPANY_RE"));

/// Metadata describing one filing, recovered from its filename.
///
/// Every field except `source_file` is best effort: filings exported by hand
/// do not always carry a recognizable form type or date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingMetadata {
    pub source_file: String,
    pub company: Option<String>,
    pub form_type: Option<String>,
    pub filing_date: Option<NaiveDate>,
    /// Fiscal year, taken from the filing date.
    pub year: Option<i32>,
}

impl FilingMetadata {
    /// Parses filing metadata out of a file path's stem.
    pub fn from_path(path: &Path) -> Self {
        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let company = COMPANY_RE
            .captures(&stem)
            .map(|c| c[1].trim().to_string())
            .filter(|c| !c.is_empty());

        let form_type = FORM_TYPE_RES
            .iter()
            .find_map(|re| re.captures(&stem))
            .map(|c| c[1].to_uppercase());

        let filing_date = FILING_DATE_RE.captures(&stem).and_then(|c| {
            NaiveDate::parse_from_str(&format!("{}-{}-{}", &c[1], &c[2], &c[3]), "%Y-%m-%d").ok()
        });

        let year = filing_date.map(|d| {
            use chrono::Datelike;
            d.year()
        });

        FilingMetadata {
            source_file,
            company,
            form_type,
            filing_date,
            year,
        }
    }

    /// True if this filing's form type is one of the requested forms
    /// (case-insensitive). An unrecognized form type never matches.
    pub fn matches_form(&self, forms: &[String]) -> bool {
        match &self.form_type {
            Some(ft) => forms.iter().any(|f| f.eq_ignore_ascii_case(ft)),
            None => false,
        }
    }

    /// Filing date rendered the way the CSV outputs carry it.
    pub fn filing_date_string(&self) -> String {
        self.filing_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}
