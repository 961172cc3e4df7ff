//! Parser for GovEase auction exports. Every row of the file becomes a
//! typed listing; image URLs are checked for reachability before save.

use crate::app::parsers::tabular::{read_csv_records, read_spreadsheet_records};
use crate::config::DEFAULT_IMAGE_CHECK_TIMEOUT_SECS;
use crate::db::Db;
use crate::domain::model::{PropertyListing, Record};
use crate::domain::ports::Parser;
use crate::utils::error::{ParserError, Result};
use crate::utils::validation::in_range;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SALE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct GoveaseParser {
    db: Option<Db>,
    client: Client,
    image_check_timeout: Duration,
    table: Option<Vec<Record>>,
}

impl GoveaseParser {
    pub fn new(db: Option<Db>) -> Self {
        Self::with_image_check_timeout(
            db,
            Duration::from_secs(DEFAULT_IMAGE_CHECK_TIMEOUT_SECS),
        )
    }

    pub fn with_image_check_timeout(db: Option<Db>, timeout: Duration) -> Self {
        Self {
            db,
            client: Client::new(),
            image_check_timeout: timeout,
            table: None,
        }
    }

    fn to_listing(row: &Record) -> Result<PropertyListing> {
        let sale_text = row.get_str("sale_datetime").unwrap_or_default();
        let sale_datetime = NaiveDateTime::parse_from_str(sale_text, SALE_DATETIME_FORMAT)
            .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
            .map_err(|_| {
                ParserError::data_format(format!("Unparseable sale datetime: '{}'", sale_text))
            })?;

        Ok(PropertyListing {
            parcel_id: field_as_string(row, "parcel_id"),
            property_address: field_as_string(row, "property_address"),
            owner_name: field_as_string(row, "owner_name"),
            tax_amount_due: row.get_f64("tax_amount_due").unwrap_or(0.0),
            assessed_value: row.get_f64("assessed_value").unwrap_or(0.0),
            sale_datetime,
            opening_bid: row.get_f64("opening_bid").unwrap_or(0.0),
            latitude: row.get_f64("latitude").unwrap_or(0.0),
            longitude: row.get_f64("longitude").unwrap_or(0.0),
            image_urls: parse_image_urls(row.get("image_urls")),
        })
    }

    /// HEAD probe with the fixed per-request timeout: reachable means a
    /// 2xx status and an image content type.
    async fn is_image_reachable(&self, url: &str) -> bool {
        let response = match self
            .client
            .head(url)
            .timeout(self.image_check_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(_) => return false,
        };

        let is_image = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().contains("image"))
            .unwrap_or(false);

        response.status().is_success() && is_image
    }
}

fn field_as_string(row: &Record, field: &str) -> String {
    match row.get(field) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Image URLs arrive either as a comma-separated string or a JSON array.
fn parse_image_urls(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl Parser for GoveaseParser {
    type Input = PathBuf;
    type Output = Vec<PropertyListing>;

    async fn parse(&mut self, path: PathBuf) -> Result<Vec<PropertyListing>> {
        let extension = Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let rows = match extension.as_str() {
            "csv" => read_csv_records(&path)?,
            "xls" | "xlsx" => read_spreadsheet_records(&path)?,
            _ => {
                return Err(ParserError::data_format(format!(
                    "Unsupported file format: {}",
                    path.display()
                )))
            }
        };

        let listings = rows
            .iter()
            .map(Self::to_listing)
            .collect::<Result<Vec<_>>>()?;
        tracing::info!("Parsed {} GovEase listings", listings.len());

        self.table = Some(rows);
        Ok(listings)
    }

    async fn validate(&self, listings: &Vec<PropertyListing>) -> Result<()> {
        for listing in listings {
            if listing.parcel_id.len() < 5 {
                return Err(ParserError::validation(format!(
                    "Invalid parcel ID format: {}",
                    listing.parcel_id
                )));
            }
            if listing.tax_amount_due < 0.0 {
                return Err(ParserError::validation(format!(
                    "Tax amount cannot be negative: {}",
                    listing.tax_amount_due
                )));
            }
            if listing.assessed_value <= 0.0 {
                return Err(ParserError::validation(format!(
                    "Assessed value must be positive: {}",
                    listing.assessed_value
                )));
            }
            if listing.opening_bid <= 0.0 {
                return Err(ParserError::validation(format!(
                    "Opening bid must be positive: {}",
                    listing.opening_bid
                )));
            }
            if !in_range(listing.latitude, -90.0, 90.0) {
                return Err(ParserError::validation(format!(
                    "Invalid latitude: {}",
                    listing.latitude
                )));
            }
            if !in_range(listing.longitude, -180.0, 180.0) {
                return Err(ParserError::validation(format!(
                    "Invalid longitude: {}",
                    listing.longitude
                )));
            }
            for url in &listing.image_urls {
                if !self.is_image_reachable(url).await {
                    return Err(ParserError::validation(format!(
                        "Invalid image URL: {}",
                        url
                    )));
                }
            }
        }
        Ok(())
    }

    async fn save(&mut self, listings: &Vec<PropertyListing>) -> Result<()> {
        let db = self
            .db
            .as_mut()
            .ok_or_else(|| ParserError::database("No database connection available"))?;

        let listings = listings.clone();
        db.transaction(move |db| {
            Box::pin(async move {
                for listing in &listings {
                    let result = sqlx::query(
                        "INSERT INTO govease_properties (
                            parcel_id, property_address, owner_name, tax_amount_due,
                            assessed_value, sale_datetime, opening_bid, latitude, longitude
                        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(&listing.parcel_id)
                    .bind(&listing.property_address)
                    .bind(&listing.owner_name)
                    .bind(listing.tax_amount_due)
                    .bind(listing.assessed_value)
                    .bind(listing.sale_datetime)
                    .bind(listing.opening_bid)
                    .bind(listing.latitude)
                    .bind(listing.longitude)
                    .execute(db.conn())
                    .await
                    .map_err(|e| {
                        ParserError::database(format!("Failed to save property data: {}", e))
                    })?;

                    let property_row_id = result.last_insert_rowid();
                    for url in &listing.image_urls {
                        sqlx::query(
                            "INSERT INTO property_images (property_id, image_url) VALUES (?, ?)",
                        )
                        .bind(property_row_id)
                        .bind(url)
                        .execute(db.conn())
                        .await
                        .map_err(|e| {
                            ParserError::database(format!("Failed to save image URLs: {}", e))
                        })?;
                    }
                }
                Ok(())
            })
        })
        .await
    }

    fn clean(&mut self) {
        self.table = None;
    }
}
