use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use reqwest::Client;
use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::{fetch, output, process, upload};

/// Everything that varies per run: which dataset, where it lands, what the
/// output is called and where it is uploaded.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub dataset: String,
    pub dataset_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_filename: String,
    pub upload_folder: Option<String>,
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunSummary {
    pub duration: Duration,
    pub rows: usize,
    pub columns: usize,
    pub output_path: PathBuf,
    pub output_bytes: u64,
    pub destination_key: String,
}

/// Run the five pipeline stages in order: Validate, Fetch, Normalize, Write,
/// Upload. Each stage is a strict precondition for the next; the first
/// failure aborts the run and is propagated unchanged after the elapsed
/// duration is logged. There is no partial-success state.
pub async fn run(params: &RunParams) -> Result<RunSummary> {
    info!(
        dataset = %params.dataset,
        output = %params.output_filename,
        "starting etl pipeline"
    );
    let started = Instant::now();

    match run_stages(params, started).await {
        Ok(summary) => {
            info!(
                duration = ?summary.duration,
                rows = summary.rows,
                output = %summary.output_path.display(),
                key = %summary.destination_key,
                "pipeline completed"
            );
            Ok(summary)
        }
        Err(err) => {
            error!(elapsed = ?started.elapsed(), error = %err, "pipeline failed");
            Err(err)
        }
    }
}

async fn run_stages(params: &RunParams, started: Instant) -> Result<RunSummary> {
    info!("[1/5] validating configuration");
    let config = Config::from_env()?;

    info!("[2/5] fetching dataset");
    let client = Client::new();
    let files =
        fetch::download_dataset(&client, &config, &params.dataset, &params.dataset_dir).await?;
    let inputs = fetch::spreadsheet_files(&files);
    info!(
        total = files.len(),
        spreadsheets = inputs.len(),
        "dataset files on disk"
    );

    info!("[3/5] normalizing tables");
    let process_date = Local::now().date_naive();
    let table = process::combine_and_normalize(&inputs, process_date)?;

    info!("[4/5] writing csv");
    let (output_path, output_bytes) =
        output::write_csv(&table, &params.output_dir, &params.output_filename)?;

    info!("[5/5] uploading to object storage");
    let destination_key =
        upload::upload_file(&config, &output_path, params.upload_folder.as_deref()).await?;

    Ok(RunSummary {
        duration: started.elapsed(),
        rows: table.row_count(),
        columns: table.column_count(),
        output_path,
        output_bytes,
        destination_key,
    })
}
