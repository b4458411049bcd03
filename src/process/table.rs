use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{EtlError, Result};
use crate::process::clean;

pub const SOURCE_FILE_COLUMN: &str = "SOURCE_FILE";
pub const PROCESS_DATE_COLUMN: &str = "PROCESS_DATE";

/// One spreadsheet cell. Only `Text` participates in the textual transforms;
/// every other variant passes through them unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

impl Cell {
    pub fn is_text(&self) -> bool {
        matches!(self, Cell::Text(_))
    }

    /// Field value as written to the output file. `Null` renders empty.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Cell::Null => String::new(),
        }
    }
}

/// Tabular data parsed from one source file. Row length always equals the
/// column count.
#[derive(Debug)]
pub struct RawTable {
    /// Base name of the originating file, used for the `SOURCE_FILE` tag.
    pub source: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Row-union of all RawTables with columns aligned by name.
#[derive(Debug)]
pub struct CombinedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Concatenate tables row-wise in input order. Columns are aligned by name in
/// first-seen order; a row from a table lacking a column holds `Null` there.
/// The `SOURCE_FILE` column is placed after every data column so appended
/// provenance never interleaves with source data.
pub fn combine(tables: Vec<RawTable>) -> CombinedTable {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for table in &tables {
        for name in &table.columns {
            if !index.contains_key(name) {
                index.insert(name.clone(), columns.len());
                columns.push(name.clone());
            }
        }
    }

    let source_idx = columns.len();
    columns.push(SOURCE_FILE_COLUMN.to_string());
    let width = columns.len();

    let total_rows: usize = tables.iter().map(|t| t.rows.len()).sum();
    let mut rows = Vec::with_capacity(total_rows);
    for table in tables {
        let mapping: Vec<usize> = table.columns.iter().map(|name| index[name]).collect();
        for row in table.rows {
            let mut out = vec![Cell::Null; width];
            for (i, cell) in row.into_iter().enumerate() {
                out[mapping[i]] = cell;
            }
            out[source_idx] = Cell::Text(table.source.clone());
            rows.push(out);
        }
    }

    CombinedTable { columns, rows }
}

impl CombinedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Canonicalize every column name. Two columns collapsing onto the same
    /// canonical name is an error rather than a silent overwrite.
    pub fn canonicalize_columns(&mut self) -> Result<()> {
        let renamed: Vec<String> = self
            .columns
            .iter()
            .map(|name| clean::canonicalize_column(name))
            .collect();

        let mut seen = HashSet::new();
        for name in &renamed {
            if !seen.insert(name.clone()) {
                return Err(EtlError::ColumnCollision(name.clone()));
            }
        }

        self.columns = renamed;
        Ok(())
    }

    /// Columns holding at least one text cell. Computed once so the textual
    /// transforms walk only text-typed columns.
    fn text_column_indices(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| self.rows.iter().any(|row| row[i].is_text()))
            .collect()
    }

    /// Apply `f` to every text cell, column-wise; non-text cells untouched.
    pub fn map_text<F: Fn(&str) -> String>(&mut self, f: F) {
        for idx in self.text_column_indices() {
            for row in &mut self.rows {
                if let Cell::Text(value) = &mut row[idx] {
                    *value = f(value);
                }
            }
        }
    }

    /// Append the `PROCESS_DATE` column with the same date on every row.
    pub fn stamp_process_date(&mut self, date: NaiveDate) {
        self.columns.push(PROCESS_DATE_COLUMN.to_string());
        for row in &mut self.rows {
            row.push(Cell::Date(date));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(source: &str, columns: &[&str], rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable {
            source: source.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn combine_conserves_row_count_and_unions_columns() {
        let a = table(
            "a.xlsx",
            &["Food Item", "Amount (g)"],
            vec![
                vec![Cell::Text("Nasi".into()), Cell::Float(100.0)],
                vec![Cell::Text("Sate".into()), Cell::Float(50.0)],
                vec![Cell::Text("Bakso".into()), Cell::Float(75.0)],
            ],
        );
        let b = table(
            "b.xlsx",
            &["Food Item", "Amount (g)", "Region"],
            vec![
                vec![
                    Cell::Text("Rendang".into()),
                    Cell::Float(120.0),
                    Cell::Text("Sumatra".into()),
                ],
                vec![
                    Cell::Text("Gudeg".into()),
                    Cell::Float(80.0),
                    Cell::Text("Java".into()),
                ],
            ],
        );

        let combined = combine(vec![a, b]);
        assert_eq!(combined.row_count(), 5);
        assert_eq!(
            combined.columns,
            vec!["Food Item", "Amount (g)", "Region", "SOURCE_FILE"]
        );

        // rows from the first table hold Null in the column they lack
        let region = combined.column_index("Region").unwrap();
        for row in &combined.rows[..3] {
            assert_eq!(row[region], Cell::Null);
        }
        for row in &combined.rows[3..] {
            assert!(row[region].is_text());
        }
    }

    #[test]
    fn every_row_carries_its_source_tag() {
        let a = table("first.xlsx", &["X"], vec![vec![Cell::Int(1)]]);
        let b = table("second.xlsx", &["X"], vec![vec![Cell::Int(2)]]);

        let combined = combine(vec![a, b]);
        let src = combined.column_index("SOURCE_FILE").unwrap();
        assert_eq!(combined.rows[0][src], Cell::Text("first.xlsx".into()));
        assert_eq!(combined.rows[1][src], Cell::Text("second.xlsx".into()));
    }

    #[test]
    fn combine_preserves_input_and_row_order() {
        let a = table(
            "a.csv",
            &["N"],
            vec![vec![Cell::Int(1)], vec![Cell::Int(2)]],
        );
        let b = table("b.csv", &["N"], vec![vec![Cell::Int(3)]]);

        let combined = combine(vec![a, b]);
        let n = combined.column_index("N").unwrap();
        let values: Vec<_> = combined.rows.iter().map(|r| r[n].clone()).collect();
        assert_eq!(values, vec![Cell::Int(1), Cell::Int(2), Cell::Int(3)]);
    }

    #[test]
    fn canonicalize_columns_rewrites_names() {
        let mut combined = combine(vec![table(
            "a.xlsx",
            &["Food Item", "Amount (g)"],
            vec![vec![Cell::Null, Cell::Null]],
        )]);
        combined.canonicalize_columns().unwrap();
        assert_eq!(
            combined.columns,
            vec!["Food_Item", "Amount_g", "SOURCE_FILE"]
        );
    }

    #[test]
    fn canonicalize_columns_fails_fast_on_collision() {
        // "Amount g" and "Amount (g)" collapse onto the same canonical name
        let mut combined = combine(vec![table(
            "a.xlsx",
            &["Amount g", "Amount (g)"],
            vec![vec![Cell::Null, Cell::Null]],
        )]);
        let err = combined.canonicalize_columns().unwrap_err();
        match err {
            EtlError::ColumnCollision(name) => assert_eq!(name, "Amount_g"),
            other => panic!("expected ColumnCollision, got {other:?}"),
        }
    }

    #[test]
    fn map_text_skips_non_text_cells() {
        let mut combined = combine(vec![table(
            "a.xlsx",
            &["Name", "Qty"],
            vec![vec![Cell::Text("nasi".into()), Cell::Int(3)]],
        )]);
        combined.map_text(|s| s.to_uppercase());

        let name = combined.column_index("Name").unwrap();
        let qty = combined.column_index("Qty").unwrap();
        assert_eq!(combined.rows[0][name], Cell::Text("NASI".into()));
        assert_eq!(combined.rows[0][qty], Cell::Int(3));
    }

    #[test]
    fn stamp_process_date_is_uniform() {
        let mut combined = combine(vec![table(
            "a.xlsx",
            &["X"],
            vec![vec![Cell::Int(1)], vec![Cell::Int(2)]],
        )]);
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        combined.stamp_process_date(date);

        assert_eq!(combined.columns.last().unwrap(), "PROCESS_DATE");
        for row in &combined.rows {
            assert_eq!(row.last().unwrap(), &Cell::Date(date));
        }
    }

    #[test]
    fn cell_render_forms() {
        assert_eq!(Cell::Text("abc".into()).render(), "abc");
        assert_eq!(Cell::Int(42).render(), "42");
        assert_eq!(Cell::Float(2.5).render(), "2.5");
        assert_eq!(Cell::Null.render(), "");
        let d = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(Cell::Date(d).render(), "2026-08-07");
    }
}
