//! DeKalb County CivicSource parser: the shared CivicSource extraction
//! layered with bearer-token authentication and DeKalb-specific rules.

use crate::app::auth::AuthSession;
use crate::app::parsers::civicsource::{CivicsourceInput, CivicsourceParser};
use crate::db::{batch_insert, Db};
use crate::domain::model::{Coordinates, Record};
use crate::domain::ports::Parser;
use crate::utils::error::{ParserError, Result};
use crate::utils::validation::{
    in_range, matches_format, valid_date_format, valid_dekalb_tax_id, valid_tax_amount,
};
use async_trait::async_trait;
use serde_json::Value;

pub const PROPERTY_CLASS_PATTERN: &str = r"[A-Z]\d{2}";

// DeKalb County bounding box.
const LAT_RANGE: (f64, f64) = (33.5, 34.0);
const LON_RANGE: (f64, f64) = (-84.4, -83.8);

pub struct DekalbParser {
    base: CivicsourceParser,
    session: AuthSession,
}

impl DekalbParser {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &[
        "tax_id",
        "address",
        "owner_name",
        "assessed_value",
        "tax_status",
        "coordinates",
        "property_class",
        "total_due",
        "sale_date",
    ];

    pub fn new(db: Option<Db>, session: AuthSession) -> Self {
        Self {
            base: CivicsourceParser::new(db),
            session,
        }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut AuthSession {
        &mut self.session
    }

    /// Fetch the county's delinquent-property payload with the session
    /// token and map each object onto a record.
    pub async fn fetch_listings(&mut self) -> Result<Vec<Record>> {
        self.session.ensure_valid().await?;

        let url = self.session.endpoint("properties/delinquent")?;
        let token = self
            .session
            .bearer_token()
            .ok_or_else(|| ParserError::authentication("No valid session token"))?
            .to_string();

        tracing::debug!("Fetching listings from {}", url);
        let payload: Value = self
            .session
            .client()
            .get(url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Value::Array(items) = payload else {
            return Err(ParserError::data_format(
                "Expected a JSON array of property listings",
            ));
        };

        let mut records = Vec::new();
        for item in items {
            let Value::Object(obj) = item else {
                return Err(ParserError::data_format(
                    "Listing entries must be JSON objects",
                ));
            };
            records.push(obj.into_iter().collect());
        }

        tracing::info!("Fetched {} DeKalb listings", records.len());
        Ok(records)
    }

    fn to_row(record: &Record) -> Result<Record> {
        let coords = record
            .get("coordinates")
            .and_then(Coordinates::from_value)
            .ok_or_else(|| ParserError::validation("Invalid coordinates"))?;

        let mut row = Record::new();
        for field in [
            "tax_id",
            "address",
            "owner_name",
            "tax_status",
            "property_class",
            "sale_date",
        ] {
            row.insert(field, record.get(field).cloned().unwrap_or(Value::Null));
        }
        row.insert(
            "assessed_value",
            Value::from(record.get_f64("assessed_value").unwrap_or(0.0)),
        );
        row.insert(
            "total_due",
            Value::from(record.get_f64("total_due").unwrap_or(0.0)),
        );
        row.insert("latitude", Value::from(coords.lat));
        row.insert("longitude", Value::from(coords.lon));
        Ok(row)
    }
}

#[async_trait]
impl Parser for DekalbParser {
    type Input = CivicsourceInput;
    type Output = Record;

    /// Establish a valid session, then run the shared CivicSource
    /// extraction.
    async fn parse(&mut self, input: CivicsourceInput) -> Result<Record> {
        self.session.ensure_valid().await?;
        self.base.parse(input).await
    }

    async fn validate(&self, record: &Record) -> Result<()> {
        if let Some(field) = record.first_missing_field(Self::REQUIRED_FIELDS) {
            return Err(ParserError::validation(format!(
                "Missing required field: {}",
                field
            )));
        }

        let tax_id = record.get_str("tax_id").unwrap_or_default();
        if !valid_dekalb_tax_id(tax_id) {
            return Err(ParserError::validation(
                "Invalid DeKalb County tax ID format",
            ));
        }

        let assessed_value = record
            .get_f64("assessed_value")
            .ok_or_else(|| ParserError::validation("Invalid assessed value"))?;
        if !in_range(assessed_value, 0.0, 1e9) {
            return Err(ParserError::validation("Invalid assessed value"));
        }

        let coords = record
            .get("coordinates")
            .and_then(Coordinates::from_value)
            .ok_or_else(|| {
                ParserError::validation("Invalid coordinates for DeKalb County")
            })?;
        if !in_range(coords.lat, LAT_RANGE.0, LAT_RANGE.1)
            || !in_range(coords.lon, LON_RANGE.0, LON_RANGE.1)
        {
            return Err(ParserError::validation(
                "Invalid coordinates for DeKalb County",
            ));
        }

        let property_class = record.get_str("property_class").unwrap_or_default();
        if !matches_format(property_class, PROPERTY_CLASS_PATTERN) {
            return Err(ParserError::validation("Invalid property class format"));
        }

        let total_due = record
            .get_f64("total_due")
            .ok_or_else(|| ParserError::validation("Invalid total due amount"))?;
        if !valid_tax_amount(total_due) {
            return Err(ParserError::validation("Invalid total due amount"));
        }

        let sale_date = record.get_str("sale_date").unwrap_or_default();
        if !valid_date_format(sale_date, "%Y-%m-%d") {
            return Err(ParserError::validation("Invalid sale date format"));
        }

        Ok(())
    }

    async fn save(&mut self, record: &Record) -> Result<()> {
        let row = Self::to_row(record)?;
        let db = self.base.db_mut()?;
        db.transaction(move |db| {
            Box::pin(async move { batch_insert(db, "dekalb_properties", &[row]).await })
        })
        .await
    }

    fn clean(&mut self) {
        self.base.clean();
    }
}
