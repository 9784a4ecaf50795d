// src/extractors/mod.rs
pub mod boundaries;
pub mod classify;
pub mod line_items;
pub mod statement;
pub mod values;

// Re-export key extraction types for convenience
pub use classify::StatementType;
pub use statement::{ExtractorConfig, StatementExtractor, StructuredRecord};
