//! Parser for Cobb County PDF tax documents: field-by-field regex
//! extraction from the document text.

use crate::db::Db;
use crate::domain::model::Record;
use crate::domain::ports::Parser;
use crate::utils::error::{ParserError, Result};
use crate::utils::validation::{valid_cobb_property_id, valid_date_format};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;

pub const REQUIRED_FIELDS: &[&str] = &[
    "property_id",
    "location_address",
    "district",
    "land_lot",
    "tax_amount",
    "assessment_date",
];

static PROPERTY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Property ID:\s*(\d{2}-\d{4}-\d{2}-\d{3})").unwrap());
static LOCATION_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Location Address:\s*(.+)").unwrap());
static DISTRICT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"District:\s*(\d+)").unwrap());
static LAND_LOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Land Lot:\s*(\d+)").unwrap());
static TAX_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Tax Amount:\s*\$?([\d,]+\.?\d*)").unwrap());
static ASSESSMENT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Assessment Date:\s*(\d{4}-\d{2}-\d{2})").unwrap());

pub struct CobbPdfParser {
    db: Option<Db>,
    data: Option<Record>,
}

impl CobbPdfParser {
    pub fn new(db: Option<Db>) -> Self {
        Self { db, data: None }
    }

    pub(crate) fn extract_fields(text: &str) -> Result<Record> {
        let mut record = Record::new();
        record.insert("property_id", Self::capture(&PROPERTY_ID, text, "property ID")?);
        record.insert(
            "location_address",
            Self::capture(&LOCATION_ADDRESS, text, "location address")?,
        );
        record.insert("district", Self::capture(&DISTRICT, text, "district")?);
        record.insert("land_lot", Self::capture(&LAND_LOT, text, "land lot")?);

        let amount_text = Self::capture(&TAX_AMOUNT, text, "tax amount")?;
        let tax_amount: f64 = amount_text.replace(',', "").parse().map_err(|_| {
            ParserError::data_format(format!("Unparseable tax amount: {}", amount_text))
        })?;
        record.insert("tax_amount", Value::from(tax_amount));

        record.insert(
            "assessment_date",
            Self::capture(&ASSESSMENT_DATE, text, "assessment date")?,
        );
        Ok(record)
    }

    fn capture(pattern: &Regex, text: &str, label: &str) -> Result<String> {
        pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .ok_or_else(|| ParserError::data_format(format!("Could not find {}", label)))
    }
}

#[async_trait]
impl Parser for CobbPdfParser {
    type Input = PathBuf;
    type Output = Record;

    async fn parse(&mut self, path: PathBuf) -> Result<Record> {
        let text = pdf_extract::extract_text(&path).map_err(|e| {
            ParserError::data_format(format!("Invalid PDF format: {}", e))
        })?;
        tracing::info!("Extracted text from {}", path.display());

        let record = Self::extract_fields(&text)?;
        self.data = Some(record.clone());
        Ok(record)
    }

    async fn validate(&self, record: &Record) -> Result<()> {
        if let Some(field) = record.first_missing_field(REQUIRED_FIELDS) {
            return Err(ParserError::validation(format!(
                "Missing required field: {}",
                field
            )));
        }

        let property_id = record.get_str("property_id").unwrap_or_default();
        if !valid_cobb_property_id(property_id) {
            return Err(ParserError::validation("Invalid property ID format"));
        }

        let tax_amount = record
            .get_f64("tax_amount")
            .ok_or_else(|| ParserError::validation("Invalid tax amount"))?;
        if tax_amount < 0.0 {
            return Err(ParserError::validation("Invalid tax amount"));
        }

        let assessment_date = record.get_str("assessment_date").unwrap_or_default();
        if !valid_date_format(assessment_date, "%Y-%m-%d") {
            return Err(ParserError::validation("Invalid date format"));
        }

        tracing::debug!("Cobb record {} validated", property_id);
        Ok(())
    }

    async fn save(&mut self, record: &Record) -> Result<()> {
        let property_id = record.get_str("property_id").unwrap_or_default().to_string();
        let location_address = record
            .get_str("location_address")
            .unwrap_or_default()
            .to_string();
        let district = record.get_str("district").unwrap_or_default().to_string();
        let land_lot = record.get_str("land_lot").unwrap_or_default().to_string();
        let tax_amount = record.get_f64("tax_amount").unwrap_or(0.0);
        let assessment_date = record
            .get_str("assessment_date")
            .unwrap_or_default()
            .to_string();

        let db = self
            .db
            .as_mut()
            .ok_or_else(|| ParserError::database("No database connection available"))?;

        db.transaction(move |db| {
            Box::pin(async move {
                sqlx::query(
                    "INSERT INTO cobb_properties
                    (property_id, location_address, district, land_lot,
                    tax_amount, assessment_date, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
                )
                .bind(property_id)
                .bind(location_address)
                .bind(district)
                .bind(land_lot)
                .bind(tax_amount)
                .bind(assessment_date)
                .execute(db.conn())
                .await
                .map_err(|e| {
                    tracing::error!("Error saving Cobb record: {}", e);
                    ParserError::database(format!("Failed to insert Cobb record: {}", e))
                })?;
                Ok(())
            })
        })
        .await
    }

    fn clean(&mut self) {
        self.data = None;
    }
}
