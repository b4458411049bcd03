use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::process::table::{Cell, RawTable};

/// Parse one spreadsheet file into a RawTable. `.csv` members go through the
/// csv crate; everything else is opened as a workbook (first sheet only).
pub fn read_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_csv(path),
        _ => read_workbook(path),
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn parse_error(path: &Path, message: impl ToString) -> EtlError {
    EtlError::Parse {
        file: path.display().to_string(),
        message: message.to_string(),
    }
}

fn read_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| parse_error(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| parse_error(path, "workbook has no sheets"))?
        .map_err(|e| parse_error(path, e))?;

    let mut rows_iter = range.rows();
    let columns: Vec<String> = match rows_iter.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::String(s) => s.clone(),
                Data::Empty => format!("UNNAMED_{i}"),
                other => other.to_string(),
            })
            .collect(),
        None => Vec::new(),
    };

    let rows: Vec<Vec<Cell>> = rows_iter
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    debug!(file = %path.display(), rows = rows.len(), columns = columns.len(), "workbook parsed");
    Ok(RawTable {
        source: base_name(path),
        columns,
        rows,
    })
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Null,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Float(*f),
        Data::Int(i) => Cell::Int(*i),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.time() == NaiveTime::MIN => Cell::Date(ndt.date()),
            Some(ndt) => Cell::DateTime(ndt),
            None => Cell::Null,
        },
        Data::DateTimeIso(s) => parse_iso_datetime(s),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => {
            debug!(error = ?e, "cell error treated as null");
            Cell::Null
        }
    }
}

fn parse_iso_datetime(s: &str) -> Cell {
    if let Ok(dt) = s.parse::<NaiveDateTime>() {
        if dt.time() == NaiveTime::MIN {
            return Cell::Date(dt.date());
        }
        return Cell::DateTime(dt);
    }
    if let Ok(d) = s.parse::<NaiveDate>() {
        return Cell::Date(d);
    }
    Cell::Text(s.to_string())
}

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| parse_error(path, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_error(path, e))?;
        rows.push(record.iter().map(cell_from_field).collect());
    }

    debug!(file = %path.display(), rows = rows.len(), columns = columns.len(), "csv parsed");
    Ok(RawTable {
        source: base_name(path),
        columns,
        rows,
    })
}

/// Infer a cell value from a CSV field: integers, then floats, then text.
fn cell_from_field(field: &str) -> Cell {
    if field.is_empty() {
        Cell::Null
    } else if let Ok(i) = field.parse::<i64>() {
        Cell::Int(i)
    } else if let Ok(f) = field.parse::<f64>() {
        Cell::Float(f)
    } else {
        Cell::Text(field.to_string())
    }
}
