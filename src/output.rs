use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, WriterBuilder};
use tracing::info;

use crate::error::{EtlError, Result};
use crate::process::table::CombinedTable;

/// Serialize the combined table under `dir/filename`, creating `dir` if
/// absent. Every field is quoted, numeric and date fields included. Returns
/// the full output path and the written file's byte size.
pub fn write_csv(table: &CombinedTable, dir: &Path, filename: &str) -> Result<(PathBuf, u64)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_path(&path)
        .map_err(csv_io_error)?;

    writer.write_record(&table.columns).map_err(csv_io_error)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|cell| cell.render()))
            .map_err(csv_io_error)?;
    }
    writer.flush()?;

    let bytes = fs::metadata(&path)?.len();
    info!(path = %path.display(), bytes, "csv written");
    Ok((path, bytes))
}

fn csv_io_error(err: csv::Error) -> EtlError {
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => EtlError::Io(io_err),
        other => EtlError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("csv write failed: {other:?}"),
        )),
    }
}
