use anyhow::Result;
use chrono::Local;
use food_etl::pipeline::{self, RunParams};
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const KAGGLE_DATASET: &str = "saurabhshahane/food-consumption-in-indonesia";
const DATASET_DIR: &str = "datasets";
const OUTPUT_DIR: &str = "outputs";

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging: console + dated log file ───────────────────
    let log_path = format!("etl_{}.log", Local::now().format("%Y%m%d"));
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(log_file)))
        .init();
    info!(log = %log_path, "startup");

    // ─── 2) run the pipeline ─────────────────────────────────────────
    let today = Local::now().format("%Y%m%d");
    let params = RunParams {
        dataset: KAGGLE_DATASET.to_string(),
        dataset_dir: DATASET_DIR.into(),
        output_dir: OUTPUT_DIR.into(),
        output_filename: format!("FoodConsumptionInIndonesia_{today}.csv"),
        upload_folder: Some(OUTPUT_DIR.to_string()),
    };

    // failure exits non-zero; the pipeline has already logged the cause
    let summary = pipeline::run(&params).await?;
    info!(
        rows = summary.rows,
        columns = summary.columns,
        bytes = summary.output_bytes,
        "done"
    );
    Ok(())
}
