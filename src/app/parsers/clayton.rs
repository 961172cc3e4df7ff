//! Clayton County tax assessment parsers. PDF documents and spreadsheet
//! exports carry the same field set, so both variants share one rule set
//! and one save path.

use crate::app::parsers::tabular::read_spreadsheet_records;
use crate::db::Db;
use crate::domain::model::Record;
use crate::domain::ports::Parser;
use crate::utils::error::{ParserError, Result};
use crate::utils::validation::{in_range, valid_clayton_parcel_id};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;

pub const REQUIRED_FIELDS: &[&str] = &[
    "parcel_id",
    "owner_name",
    "property_address",
    "market_value",
    "tax_year",
];

static FIELD_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "parcel_id",
            Regex::new(r"Parcel ID:?\s*(\d{2}-\d{3}-\d{3})").unwrap(),
        ),
        ("owner_name", Regex::new(r"Owner Name:?\s*([^\n]+)").unwrap()),
        (
            "property_address",
            Regex::new(r"Property Address:?\s*([^\n]+)").unwrap(),
        ),
        (
            "market_value",
            Regex::new(r"Market Value:?\s*\$?([\d,]+)").unwrap(),
        ),
        ("tax_year", Regex::new(r"Tax Year:?\s*(\d{4})").unwrap()),
    ]
});

/// Locate each field in extracted PDF text. A field without a matching
/// span is a data-format error naming the field.
pub(crate) fn extract_fields(text: &str) -> Result<Record> {
    let mut record = Record::new();
    for (field, pattern) in FIELD_PATTERNS.iter() {
        let captured = pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .ok_or_else(|| {
                ParserError::data_format(format!("Could not find {} in PDF", field))
            })?;
        let value = captured.as_str().trim();
        match *field {
            "market_value" => {
                let amount: f64 = value.replace(',', "").parse().map_err(|_| {
                    ParserError::data_format(format!("Unparseable market value: {}", value))
                })?;
                record.insert(*field, Value::from(amount));
            }
            "tax_year" => {
                let year: i64 = value.parse().map_err(|_| {
                    ParserError::data_format(format!("Unparseable tax year: {}", value))
                })?;
                record.insert(*field, Value::from(year));
            }
            _ => record.insert(*field, value),
        }
    }
    Ok(record)
}

pub(crate) fn validate_record(record: &Record) -> Result<()> {
    if let Some(field) = record.first_missing_field(REQUIRED_FIELDS) {
        return Err(ParserError::validation(format!(
            "Missing required field: {}",
            field
        )));
    }

    let parcel_id = record.get_str("parcel_id").unwrap_or_default();
    if !valid_clayton_parcel_id(parcel_id) {
        return Err(ParserError::validation("Invalid parcel ID format"));
    }

    let market_value = record
        .get_f64("market_value")
        .ok_or_else(|| ParserError::validation("Invalid market value"))?;
    if !in_range(market_value, 0.0, 1e8) {
        return Err(ParserError::validation("Invalid market value"));
    }

    let tax_year = record
        .get_i64("tax_year")
        .ok_or_else(|| ParserError::validation("Invalid tax year"))?;
    if !in_range(tax_year as f64, 1900.0, 2100.0) {
        return Err(ParserError::validation("Invalid tax year"));
    }

    Ok(())
}

pub(crate) async fn save_record(db: &mut Db, record: &Record) -> Result<()> {
    let parcel_id = record.get_str("parcel_id").unwrap_or_default().to_string();
    let owner_name = record.get_str("owner_name").unwrap_or_default().to_string();
    let property_address = record
        .get_str("property_address")
        .unwrap_or_default()
        .to_string();
    let market_value = record.get_f64("market_value").unwrap_or(0.0);
    let tax_year = record.get_i64("tax_year").unwrap_or(0);

    db.transaction(move |db| {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO clayton_properties (
                    parcel_id, owner_name, property_address,
                    market_value, tax_year, last_updated
                ) VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
            )
            .bind(parcel_id)
            .bind(owner_name)
            .bind(property_address)
            .bind(market_value)
            .bind(tax_year)
            .execute(db.conn())
            .await
            .map_err(|e| {
                tracing::error!("Error saving Clayton record: {}", e);
                ParserError::database(format!("Failed to insert Clayton record: {}", e))
            })?;
            Ok(())
        })
    })
    .await
}

/// Parser for Clayton County PDF tax assessment documents.
pub struct ClaytonPdfParser {
    db: Option<Db>,
    pdf_text: Option<String>,
}

impl ClaytonPdfParser {
    pub fn new(db: Option<Db>) -> Self {
        Self { db, pdf_text: None }
    }
}

#[async_trait]
impl Parser for ClaytonPdfParser {
    type Input = PathBuf;
    type Output = Record;

    async fn parse(&mut self, path: PathBuf) -> Result<Record> {
        let text = pdf_extract::extract_text(&path).map_err(|e| {
            ParserError::data_format(format!("Failed to parse PDF {}: {}", path.display(), e))
        })?;
        let record = extract_fields(&text)?;
        self.pdf_text = Some(text);
        Ok(record)
    }

    async fn validate(&self, record: &Record) -> Result<()> {
        validate_record(record)
    }

    async fn save(&mut self, record: &Record) -> Result<()> {
        let db = self
            .db
            .as_mut()
            .ok_or_else(|| ParserError::database("No database connection available"))?;
        save_record(db, record).await
    }

    fn clean(&mut self) {
        self.pdf_text = None;
    }
}

/// Parser for Clayton County spreadsheet exports.
pub struct ClaytonSpreadsheetParser {
    db: Option<Db>,
    table: Option<Vec<Record>>,
}

impl ClaytonSpreadsheetParser {
    pub fn new(db: Option<Db>) -> Self {
        Self { db, table: None }
    }

    fn transform_row(row: &Record) -> Record {
        let mut record = Record::new();
        for field in ["parcel_id", "owner_name", "property_address"] {
            record.insert(
                field,
                row.get_str(field).unwrap_or_default().trim().to_string(),
            );
        }
        record.insert(
            "market_value",
            Value::from(row.get_f64("market_value").unwrap_or(0.0)),
        );
        record.insert("tax_year", Value::from(row.get_i64("tax_year").unwrap_or(0)));
        record
    }
}

#[async_trait]
impl Parser for ClaytonSpreadsheetParser {
    type Input = PathBuf;
    type Output = Record;

    async fn parse(&mut self, path: PathBuf) -> Result<Record> {
        let rows = read_spreadsheet_records(&path)?;
        let first = rows
            .first()
            .ok_or_else(|| ParserError::data_format("Spreadsheet contains no data rows"))?;
        let record = Self::transform_row(first);
        self.table = Some(rows);
        Ok(record)
    }

    async fn validate(&self, record: &Record) -> Result<()> {
        validate_record(record)
    }

    async fn save(&mut self, record: &Record) -> Result<()> {
        let db = self
            .db
            .as_mut()
            .ok_or_else(|| ParserError::database("No database connection available"))?;
        save_record(db, record).await
    }

    fn clean(&mut self) {
        self.table = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TEXT: &str = "\
Clayton County Tax Assessment
Parcel ID: 12-345-678
Owner Name: JANE DOE
Property Address: 400 Tara Blvd
Market Value: $125,000
Tax Year: 2024
";

    #[test]
    fn test_extract_fields_from_document_text() {
        let record = extract_fields(SAMPLE_TEXT).unwrap();
        assert_eq!(record.get_str("parcel_id"), Some("12-345-678"));
        assert_eq!(record.get_str("owner_name"), Some("JANE DOE"));
        assert_eq!(record.get_str("property_address"), Some("400 Tara Blvd"));
        assert_eq!(record.get_f64("market_value"), Some(125000.0));
        assert_eq!(record.get_i64("tax_year"), Some(2024));
    }

    #[test]
    fn test_extract_fields_names_missing_field() {
        let text = SAMPLE_TEXT.replace("Parcel ID: 12-345-678\n", "");
        let err = extract_fields(&text).unwrap_err();
        assert!(err.to_string().contains("Could not find parcel_id in PDF"));
    }

    #[test]
    fn test_validate_record() {
        let record = extract_fields(SAMPLE_TEXT).unwrap();
        assert!(validate_record(&record).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_parcel_id() {
        let mut record = extract_fields(SAMPLE_TEXT).unwrap();
        record.insert("parcel_id", "123-45-678");
        let err = validate_record(&record).unwrap_err();
        assert!(err.to_string().contains("Invalid parcel ID format"));
    }

    #[test]
    fn test_validate_tax_year_bounds() {
        let mut record = extract_fields(SAMPLE_TEXT).unwrap();
        record.insert("tax_year", 1900);
        assert!(validate_record(&record).is_ok());
        record.insert("tax_year", 2100);
        assert!(validate_record(&record).is_ok());
        record.insert("tax_year", 1899);
        assert!(validate_record(&record).is_err());
        record.insert("tax_year", 2101);
        assert!(validate_record(&record).is_err());
    }

    #[test]
    fn test_validate_market_value_bounds() {
        let mut record = extract_fields(SAMPLE_TEXT).unwrap();
        record.insert("market_value", 1e8);
        assert!(validate_record(&record).is_ok());
        record.insert("market_value", 1e8 + 1.0);
        let err = validate_record(&record).unwrap_err();
        assert!(err.to_string().contains("Invalid market value"));
    }
}
