// src/extractors/line_items.rs
//
// Maps inconsistently worded line-item labels onto canonical names. Rules are
// evaluated top to bottom against the lowercased, trimmed label; first match
// wins. Labels that match nothing are kept verbatim so no row is ever dropped
// for lacking a mapping (unmapped rows are simply never joined into masters).

use once_cell::sync::Lazy;
use regex::Regex;

// Order matters: more specific rules ("cost of revenues", "total current
// assets") must sit above the broader ones they would otherwise collide with.
static LINE_ITEM_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"cash and cash equivalents", "Cash and cash equivalents"),
        (r"short[-\s]term investments?", "Short-term investments"),
        (r"accounts?\s+receivable", "Accounts receivable"),
        (r"\binventor(?:y|ies)\b", "Inventories"),
        (r"total current assets", "Total current assets"),
        (r"property(?:,\s*plant)?,?\s+and\s+equipment|property,\s*plant", "Property and equipment"),
        (r"total assets", "Total assets"),
        (r"accounts?\s+payable", "Accounts payable"),
        (r"accrued\s+(?:expenses?|liabilities)", "Accrued expenses"),
        (r"total current liabilities", "Total current liabilities"),
        (r"total liabilities", "Total liabilities"),
        (r"(?:stock|share)holders['\u{2019}]?\s+equity", "Stockholders equity"),
        (r"cost of (?:goods|revenues?|products?)", "Cost of revenues"),
        (r"^(?:net|total)(?:\s+\S+)*\s+revenues?$|^revenues?$", "Net revenues"),
        (r"gross profit", "Gross profit"),
        (r"research\s+(?:and|&)\s+development", "Research and development"),
        (r"selling,?\s+general,?\s+and\s+administrative", "Selling, general and administrative"),
        (r"operating (?:income|profit)|(?:income|profit) from operations", "Operating income"),
        (r"operating loss|loss from operations", "Operating loss"),
        // Per-share rules sit above net income/loss so "Diluted net loss per
        // share" does not collapse into the net-loss bucket.
        (r"basic.*per share|per share.*basic", "Earnings per share, basic"),
        (r"diluted.*per share|per share.*diluted", "Earnings per share, diluted"),
        (r"(?:earnings|income|loss)\s+per\s+share", "Earnings per share"),
        (r"net income", "Net income"),
        (r"net loss", "Net loss"),
    ]
    .iter()
    .filter_map(|(pat, name)| Regex::new(pat).ok().map(|re| (re, *name)))
    .collect()
});

/// Resolves a raw label to its canonical name, or returns the raw label
/// unchanged when no rule matches.
pub fn normalize(raw_label: &str) -> String {
    let lowered = raw_label.trim().to_lowercase();
    for (re, canonical) in LINE_ITEM_RULES.iter() {
        if re.is_match(&lowered) {
            return (*canonical).to_string();
        }
    }
    raw_label.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_pattern_breadth() {
        assert_eq!(normalize("Net revenues"), "Net revenues");
        assert_eq!(normalize("Total revenue"), "Net revenues");
        assert_eq!(normalize("Revenue"), "Net revenues");
        assert_eq!(normalize("Net product and licensing revenue"), "Net revenues");
    }

    #[test]
    fn test_deferred_revenue_not_mapped_to_revenue() {
        assert_eq!(normalize("Deferred revenue"), "Deferred revenue");
    }

    #[test]
    fn test_cost_rule_wins_over_revenue_rule() {
        assert_eq!(normalize("Cost of revenues"), "Cost of revenues");
        assert_eq!(normalize("Cost of goods sold"), "Cost of revenues");
    }

    #[test]
    fn test_stockholders_spelling_variants() {
        assert_eq!(normalize("Total stockholders' equity"), "Stockholders equity");
        assert_eq!(normalize("Shareholders equity"), "Stockholders equity");
        assert_eq!(normalize("Total stockholders\u{2019} equity"), "Stockholders equity");
    }

    #[test]
    fn test_pluralization_and_punctuation() {
        assert_eq!(normalize("Account receivable, net"), "Accounts receivable");
        assert_eq!(normalize("Inventories"), "Inventories");
        assert_eq!(normalize("Inventory"), "Inventories");
        assert_eq!(
            normalize("Selling, general, and administrative"),
            "Selling, general and administrative"
        );
    }

    #[test]
    fn test_specific_totals_before_broad_totals() {
        assert_eq!(normalize("Total current assets"), "Total current assets");
        assert_eq!(normalize("Total assets"), "Total assets");
        assert_eq!(normalize("Total current liabilities"), "Total current liabilities");
        assert_eq!(normalize("Total liabilities"), "Total liabilities");
    }

    #[test]
    fn test_operations_phrasings() {
        assert_eq!(normalize("Income from operations"), "Operating income");
        assert_eq!(normalize("Loss from operations"), "Operating loss");
    }

    #[test]
    fn test_eps_variants() {
        assert_eq!(normalize("Basic earnings per share"), "Earnings per share, basic");
        assert_eq!(normalize("Diluted net loss per share"), "Earnings per share, diluted");
        assert_eq!(normalize("Net income per share"), "Earnings per share");
        assert_eq!(normalize("Net loss per share"), "Earnings per share");
    }

    #[test]
    fn test_unmapped_label_kept_verbatim() {
        assert_eq!(normalize("Goodwill impairment charge"), "Goodwill impairment charge");
        assert_eq!(normalize("  Goodwill  "), "  Goodwill  ");
    }
}
