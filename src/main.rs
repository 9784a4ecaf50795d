// src/main.rs
mod utils;
mod filings;
mod extractors;
mod consolidate;
mod storage;
mod pipeline;

use clap::Parser;
use extractors::ExtractorConfig;
use pipeline::PipelineConfig;
use std::path::PathBuf;
use utils::AppError;

/// Command Line Interface for the SEC filing spreadsheet extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory of filing spreadsheets, grouped by year subdirectory
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Output directory for statement tables, master tables, and run summary
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Form types to process (comma separated); empty processes every file
    #[arg(long, value_delimiter = ',', default_value = "10-K")]
    forms: Vec<String>,

    /// Keep rows/columns whose non-missing cell ratio is at least this
    #[arg(long, default_value_t = 0.3)]
    fill_threshold: f64,

    /// Skip sheets with fewer rows than this
    #[arg(long, default_value_t = 3)]
    min_rows: usize,

    /// Skip sheets with fewer columns than this
    #[arg(long, default_value_t = 2)]
    min_cols: usize,
}

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting extraction for args: {:?}", args);

    let config = PipelineConfig {
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        forms: args.forms,
        extractor: ExtractorConfig {
            fill_threshold: args.fill_threshold,
            min_rows: args.min_rows,
            min_cols: args.min_cols,
        },
    };

    // 3. Run the batch; only a missing input root errors out of run() itself
    let summary = pipeline::run(&config)?;

    tracing::info!(
        "Processing finished. Success: {}, Failures: {}",
        summary.files_succeeded,
        summary.files_failed
    );

    if summary.files_attempted == 0 {
        return Err(AppError::Config(
            "No filings matched the requested form types in the input directory".to_string(),
        ));
    }
    if summary.files_succeeded == 0 {
        return Err(AppError::Processing(format!(
            "Failed to extract data from all {} file(s)",
            summary.files_failed
        )));
    }

    Ok(())
}
