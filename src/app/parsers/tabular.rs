//! Shared extraction glue for tabular sources (CSV and spreadsheets).

use crate::domain::model::Record;
use crate::utils::error::{ParserError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use serde_json::Value;
use std::path::Path;

/// Read every row of a CSV file into records keyed by the header row.
pub fn read_csv_records(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Record::new();
        for (header, value) in headers.iter().zip(row.iter()) {
            record.insert(header.to_string(), coerce_scalar(value));
        }
        records.push(record);
    }
    Ok(records)
}

/// Read every row of the first worksheet into records keyed by the header
/// row.
pub fn read_spreadsheet_records(path: &Path) -> Result<Vec<Record>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        ParserError::data_format(format!("Failed to open spreadsheet {}: {}", path.display(), e))
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ParserError::data_format("Spreadsheet contains no worksheets"))?;
    let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
        ParserError::data_format(format!("Failed to read worksheet '{}': {}", sheet_name, e))
    })?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| ParserError::data_format("Spreadsheet contains no data"))?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let mut records = Vec::new();
    for row in rows {
        let mut record = Record::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            record.insert(header.clone(), cell_to_value(cell));
        }
        records.push(record);
    }
    Ok(records)
}

/// Coerce a CSV cell to a number when it looks like one. Leading-zero
/// strings stay strings so identifiers like "033" survive intact.
pub fn coerce_scalar(value: &str) -> Value {
    let trimmed = value.trim();
    let keeps_leading_zero = trimmed.len() > 1 && trimmed.starts_with('0');
    if !trimmed.is_empty() && !keeps_leading_zero {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::from(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::from(f);
        }
    }
    Value::String(trimmed.to_string())
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::from(*b),
        Data::String(s) => Value::String(s.trim().to_string()),
        Data::DateTimeIso(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}
