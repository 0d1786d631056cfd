//! Pasted table parsing.
//!
//! This module turns delimited text copied from a spreadsheet into a
//! `Dataset`. Layout:
//!
//! ```text
//! [S]     v0      v1        <- optional header
//! 0,5     0,21    0,19
//! 1       0,33
//! ```
//!
//! - column 1 is the substrate concentration, columns 2.. are rate series
//! - the delimiter is a tab if the first line contains one, else `;`, else `,`
//! - the first line is a header when none of its cells parses as a number
//! - blank rate cells mean "not measured"; malformed cells are errors
//! - rows are numbered by their 1-based line in the pasted text

use csv::StringRecord;

use crate::domain::{Dataset, SeriesId};
use crate::error::FitError;
use crate::io::numeric::{is_number, parse_number};

/// One data row of a pasted table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// 1-based line in the pasted text.
    pub row: usize,
    pub concentration: f64,
    /// One entry per series column; `None` for a blank cell.
    pub rates: Vec<Option<f64>>,
}

/// Parsed table: series labels plus numeric rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PastedTable {
    pub series: Vec<SeriesId>,
    pub rows: Vec<TableRow>,
    pub has_header: bool,
}

impl PastedTable {
    /// Convert to a dataset; every measured cell becomes an included point.
    pub fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new();
        for row in &self.rows {
            for (series, rate) in self.series.iter().zip(&row.rates) {
                if let Some(v) = rate {
                    dataset.push(series.clone(), row.row, row.concentration, *v);
                }
            }
        }
        dataset
    }
}

/// Pick the field delimiter from the first non-blank line.
pub fn detect_delimiter(text: &str) -> u8 {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if first.contains('\t') {
        b'\t'
    } else if first.contains(';') {
        b';'
    } else {
        b','
    }
}

/// Parse pasted text into a table. Fails on the first malformed cell.
///
/// The first non-blank line is a header only when none of its cells is a
/// number; a typo in the first data row is an error, not a header.
pub fn parse_table(text: &str) -> Result<PastedTable, FitError> {
    let delimiter = detect_delimiter(text);

    let mut header: Option<StringRecord> = None;
    let mut rows = Vec::new();
    let mut n_series = 0usize;
    let mut seen_first = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let record = split_line(raw, delimiter, line)?;

        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        if !seen_first {
            seen_first = true;
            if !record.iter().any(is_number) {
                n_series = n_series.max(record.len().saturating_sub(1));
                header = Some(record);
                continue;
            }
        }

        let row = parse_row(&record, line)?;
        n_series = n_series.max(row.rates.len());
        rows.push(row);
    }

    for row in &mut rows {
        row.rates.resize(n_series, None);
    }

    let series = (0..n_series)
        .map(|j| {
            let label = header
                .as_ref()
                .and_then(|h| h.get(j + 1))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("v{j}"));
            SeriesId::new(label)
        })
        .collect();

    log::info!(
        "parsed table: {} rows, {} series, header={}",
        rows.len(),
        n_series,
        header.is_some()
    );

    Ok(PastedTable {
        series,
        rows,
        has_header: header.is_some(),
    })
}

/// Split one text line into trimmed cells. A blank line yields an empty record.
fn split_line(raw: &str, delimiter: u8, line: usize) -> Result<StringRecord, FitError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(raw.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => Ok(record),
        Some(Err(e)) => Err(FitError::parse(line, 1, raw, format!("unreadable row: {e}"))),
        None => Ok(StringRecord::new()),
    }
}

/// Parse pasted text straight into a dataset.
pub fn parse_dataset(text: &str) -> Result<Dataset, FitError> {
    Ok(parse_table(text)?.to_dataset())
}

fn parse_row(record: &StringRecord, line: usize) -> Result<TableRow, FitError> {
    let mut cells = record.iter();
    let first = cells.next().unwrap_or("");
    if first.is_empty() {
        return Err(FitError::parse(line, 1, first, "missing substrate concentration"));
    }
    let concentration = parse_number(first, line, 1)?;

    let rates = cells
        .enumerate()
        .map(|(j, cell)| {
            if cell.is_empty() {
                Ok(None)
            } else {
                parse_number(cell, line, j + 2).map(Some)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TableRow {
        row: line,
        concentration,
        rates,
    })
}
