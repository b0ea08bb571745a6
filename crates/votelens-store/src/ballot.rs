//! Member ballot spreadsheets.
//!
//! The Bundestag publishes one row per member with the faction label and a
//! 0/1 marker in each of the `ja`, `nein` and `Enthaltung` columns. XLS/XLSX
//! files are read with calamine, CSV exports with the Arrow CSV reader.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use calamine::{Data, Range, Reader, open_workbook_auto};
use votelens_core::BallotRow;

use crate::StoreError;

pub const FACTION_COLUMN: &str = "Fraktion/Gruppe";
pub const ADOPT_COLUMN: &str = "ja";
pub const REJECT_COLUMN: &str = "nein";
pub const ABSTAIN_COLUMN: &str = "Enthaltung";

/// Positions of the required columns in a header row.
struct Columns {
    faction: usize,
    adopt: usize,
    reject: usize,
    abstain: usize,
}

impl Columns {
    fn locate<S: AsRef<str>>(header: &[S]) -> Result<Self, StoreError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.as_ref().trim() == name)
                .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            faction: find(FACTION_COLUMN)?,
            adopt: find(ADOPT_COLUMN)?,
            reject: find(REJECT_COLUMN)?,
            abstain: find(ABSTAIN_COLUMN)?,
        })
    }
}

/// Read all member ballots from a spreadsheet, picking the reader by extension.
pub fn read_ballots(path: &Path) -> Result<Vec<BallotRow>, StoreError> {
    if !path.exists() {
        return Err(StoreError::InputNotFound(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => read_csv(path),
        _ => read_workbook(path),
    }
}

fn read_workbook(path: &Path) -> Result<Vec<BallotRow>, StoreError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| StoreError::corrupt(path, "workbook has no sheets"))??;
    rows_from_range(&range)
}

/// Convert the first sheet of a workbook into ballot rows.
pub fn rows_from_range(range: &Range<Data>) -> Result<Vec<BallotRow>, StoreError> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(cell_text).collect();
    let cols = Columns::locate(&header)?;

    let mut out = Vec::new();
    for row in rows {
        let faction = row.get(cols.faction).map(cell_text).unwrap_or_default();
        if faction.trim().is_empty() {
            continue;
        }
        out.push(BallotRow {
            faction,
            adopt: cell_count(row.get(cols.adopt), ADOPT_COLUMN)?,
            reject: cell_count(row.get(cols.reject), REJECT_COLUMN)?,
            abstain: cell_count(row.get(cols.abstain), ABSTAIN_COLUMN)?,
        });
    }
    Ok(out)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_count(cell: Option<&Data>, column: &str) -> Result<u32, StoreError> {
    match cell {
        None | Some(Data::Empty) => Ok(0),
        Some(Data::Int(i)) => Ok((*i).max(0) as u32),
        Some(Data::Float(f)) => Ok(f.max(0.0).round() as u32),
        Some(Data::Bool(b)) => Ok(u32::from(*b)),
        Some(Data::String(s)) => parse_count(s, column),
        Some(other) => Err(StoreError::InvalidValue {
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

fn parse_count(s: &str, column: &str) -> Result<u32, StoreError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(0);
    }
    s.replace(',', ".")
        .parse::<f64>()
        .map(|f| f.max(0.0).round() as u32)
        .map_err(|_| StoreError::InvalidValue {
            column: column.to_string(),
            value: s.to_string(),
        })
}

fn cell(arr: &StringArray, row: usize) -> &str {
    if arr.is_null(row) { "" } else { arr.value(row) }
}

fn read_csv(path: &Path) -> Result<Vec<BallotRow>, StoreError> {
    let mut first_line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut first_line)?;
    let first_line = first_line.trim_start_matches('\u{feff}').trim_end();
    let delimiter = if first_line.contains(';') { b';' } else { b',' };

    let header: Vec<String> = first_line
        .split(delimiter as char)
        .map(|h| h.trim().trim_matches('"').to_string())
        .collect();
    let cols = Columns::locate(&header)?;

    let schema = Schema::new(
        header
            .iter()
            .enumerate()
            .map(|(i, _)| Field::new(format!("c{i}"), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .with_delimiter(delimiter)
        .build(File::open(path)?)?;

    let mut out = Vec::new();
    for batch in reader {
        let batch = batch?;
        let column = |idx: usize| {
            batch
                .column(idx)
                .as_any()
                .downcast_ref::<StringArray>()
                .cloned()
                .ok_or_else(|| StoreError::MissingColumn(header[idx].clone()))
        };
        let faction = column(cols.faction)?;
        let adopt = column(cols.adopt)?;
        let reject = column(cols.reject)?;
        let abstain = column(cols.abstain)?;

        for row in 0..batch.num_rows() {
            let label = cell(&faction, row);
            if label.trim().is_empty() {
                continue;
            }
            out.push(BallotRow {
                faction: label.to_string(),
                adopt: parse_count(cell(&adopt, row), ADOPT_COLUMN)?,
                reject: parse_count(cell(&reject, row), REJECT_COLUMN)?,
                abstain: parse_count(cell(&abstain, row), ABSTAIN_COLUMN)?,
            });
        }
    }
    Ok(out)
}
