pub mod clean;
pub mod read;
pub mod table;

use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::process::table::CombinedTable;

/// Read every spreadsheet file, concatenate the tables and normalize the
/// result. Fatal on the first parse failure: the run produces either the
/// whole combined table or nothing.
///
/// Normalization, in order: canonicalize column names, uppercase text cells,
/// stamp `PROCESS_DATE`, strip invisible characters from text cells.
pub fn combine_and_normalize(paths: &[PathBuf], process_date: NaiveDate) -> Result<CombinedTable> {
    if paths.is_empty() {
        return Err(EtlError::EmptyInput);
    }

    let mut tables = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        info!(file = %path.display(), "reading {}/{}", i + 1, paths.len());
        let table = read::read_table(path)?;
        info!(rows = table.rows.len(), "loaded");
        tables.push(table);
    }

    let mut combined = table::combine(tables);
    combined.canonicalize_columns()?;
    combined.map_text(|s| s.to_uppercase());
    combined.stamp_process_date(process_date);
    combined.map_text(clean::strip_invisible);

    info!(
        rows = combined.row_count(),
        columns = combined.column_count(),
        "combined table ready"
    );
    Ok(combined)
}
