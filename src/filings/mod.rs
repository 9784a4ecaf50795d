// src/filings/mod.rs
pub mod metadata;
pub mod workbook;

pub use metadata::FilingMetadata;
pub use workbook::{Cell, Sheet, Workbook};
