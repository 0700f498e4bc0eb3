use calamine::{open_workbook_auto, Data, Reader};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::constants::SPREADSHEET_EXTENSIONS;
use crate::error::{Result, ReviewError};

/// Every cell of a source file as text, plus the file's content fingerprint
#[derive(Debug, Clone)]
pub struct RawRows {
    pub rows: Vec<Vec<String>>,
    /// 1-based file line (or sheet row) each entry of `rows` came from
    pub lines: Vec<usize>,
    pub fingerprint: String,
}

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Read a CSV or spreadsheet file into untyped rows.
///
/// A missing file maps to `SourceMissing`; spreadsheets read their first sheet.
pub fn read_rows(path: &Path) -> Result<RawRows> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ReviewError::SourceMissing {
            path: path.to_path_buf(),
        },
        _ => ReviewError::Io(e),
    })?;
    let fingerprint = hex::encode(Sha256::digest(&bytes));

    let (rows, lines) = if is_spreadsheet(path) {
        read_spreadsheet(path)?
    } else {
        read_csv(&bytes)?
    };

    debug!(path = %path.display(), rows = rows.len(), "Read raw rows");
    Ok(RawRows {
        rows,
        lines,
        fingerprint,
    })
}

type Numbered = (Vec<Vec<String>>, Vec<usize>);

/// Blank lines are skipped by the reader, so line numbers come from record positions
fn read_csv(bytes: &[u8]) -> Result<Numbered> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(rows.len() + 1);
        lines.push(line);
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    Ok((rows, lines))
}

fn read_spreadsheet(path: &Path) -> Result<Numbered> {
    let spreadsheet_error = |message: String| ReviewError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| spreadsheet_error("workbook has no sheets".to_string()))?
        .map_err(|e| spreadsheet_error(e.to_string()))?;

    // The range starts at the first used cell, not necessarily A1
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    let lines = (first_row + 1..=first_row + rows.len()).collect();
    Ok((rows, lines))
}

/// Render a spreadsheet cell the way it would appear in a CSV export
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Codes stored as numbers come back as floats; keep them integral
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
