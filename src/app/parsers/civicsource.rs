//! Parser for CivicSource property data: spreadsheet and CSV exports plus
//! GIS parcel layers.

use crate::app::parsers::tabular::{read_csv_records, read_spreadsheet_records};
use crate::db::{batch_insert, Db};
use crate::domain::model::{Coordinates, Record};
use crate::domain::ports::Parser;
use crate::utils::error::{ParserError, Result};
use crate::utils::validation::{in_range, matches_format};
use async_trait::async_trait;
use geo::Centroid;
use serde_json::Value;
use std::path::PathBuf;

pub const PROPERTY_ID_PATTERN: &str = r"[A-Z]{3}-\d{5}";

/// The input shapes CivicSource publishes property data in.
#[derive(Debug, Clone)]
pub enum CivicsourceInput {
    Spreadsheet(PathBuf),
    Csv(PathBuf),
    Gis(PathBuf),
}

pub struct CivicsourceParser {
    db: Option<Db>,
    table: Option<Vec<Record>>,
}

impl CivicsourceParser {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &[
        "property_id",
        "address",
        "owner_name",
        "assessed_value",
        "tax_status",
        "coordinates",
    ];

    pub fn new(db: Option<Db>) -> Self {
        Self { db, table: None }
    }

    pub(crate) fn db_mut(&mut self) -> Result<&mut Db> {
        self.db
            .as_mut()
            .ok_or_else(|| ParserError::database("No database connection available"))
    }

    /// Map a raw tabular row onto the standard field set. Unmapped source
    /// columns are carried through so county variants can layer extra
    /// fields on top; latitude/longitude collapse into the nested
    /// coordinates object.
    fn transform_tabular(row: &Record) -> Record {
        let mut record = row.clone();

        let lat = record.get_f64("latitude");
        let lon = record.get_f64("longitude");
        record.fields.remove("latitude");
        record.fields.remove("longitude");
        if let (Some(lat), Some(lon)) = (lat, lon) {
            record.insert("coordinates", Coordinates { lat, lon }.to_value());
        }

        if let Some(value) = record.get_f64("assessed_value") {
            record.insert("assessed_value", Value::from(value));
        }

        record
    }

    /// Map the first feature of a GIS layer onto the standard field set;
    /// the geometry centroid becomes the coordinates.
    fn transform_gis(path: &PathBuf) -> Result<Record> {
        let content = std::fs::read_to_string(path)?;
        let geojson: geojson::GeoJson = content.parse().map_err(|e| {
            ParserError::data_format(format!("Failed to parse GIS data: {}", e))
        })?;

        let feature = match geojson {
            geojson::GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .next()
                .ok_or_else(|| ParserError::data_format("GIS layer contains no features"))?,
            geojson::GeoJson::Feature(feature) => feature,
            geojson::GeoJson::Geometry(_) => {
                return Err(ParserError::data_format(
                    "GIS layer contains bare geometry without attributes",
                ))
            }
        };

        let mut record = Record::new();
        if let Some(properties) = feature.properties {
            for (key, value) in properties {
                record.insert(key, value);
            }
        }

        let geometry = feature
            .geometry
            .ok_or_else(|| ParserError::data_format("GIS feature has no geometry"))?;
        let geometry: geo::Geometry<f64> = geo::Geometry::try_from(&geometry.value)
            .map_err(|e| ParserError::data_format(format!("Unsupported geometry: {}", e)))?;
        let centroid = geometry
            .centroid()
            .ok_or_else(|| ParserError::data_format("Geometry has no centroid"))?;

        record.insert(
            "coordinates",
            Coordinates {
                lat: centroid.y(),
                lon: centroid.x(),
            }
            .to_value(),
        );

        Ok(record)
    }

    /// Flatten a validated record into the `properties` column set.
    fn to_row(record: &Record) -> Result<Record> {
        let coords = record
            .get("coordinates")
            .and_then(Coordinates::from_value)
            .ok_or_else(|| ParserError::validation("Invalid coordinates"))?;

        let mut row = Record::new();
        for field in [
            "property_id",
            "address",
            "owner_name",
            "tax_status",
        ] {
            row.insert(
                field,
                record.get(field).cloned().unwrap_or(Value::Null),
            );
        }
        row.insert(
            "assessed_value",
            Value::from(record.get_f64("assessed_value").unwrap_or(0.0)),
        );
        row.insert("latitude", Value::from(coords.lat));
        row.insert("longitude", Value::from(coords.lon));
        Ok(row)
    }
}

#[async_trait]
impl Parser for CivicsourceParser {
    type Input = CivicsourceInput;
    type Output = Record;

    async fn parse(&mut self, input: CivicsourceInput) -> Result<Record> {
        let record = match input {
            CivicsourceInput::Spreadsheet(path) => {
                let rows = read_spreadsheet_records(&path)?;
                let first = rows.first().ok_or_else(|| {
                    ParserError::data_format("Spreadsheet contains no data rows")
                })?;
                let record = Self::transform_tabular(first);
                self.table = Some(rows);
                record
            }
            CivicsourceInput::Csv(path) => {
                let rows = read_csv_records(&path)?;
                let first = rows
                    .first()
                    .ok_or_else(|| ParserError::data_format("CSV contains no data rows"))?;
                let record = Self::transform_tabular(first);
                self.table = Some(rows);
                record
            }
            CivicsourceInput::Gis(path) => Self::transform_gis(&path)?,
        };

        tracing::debug!("Parsed CivicSource record: {:?}", record.get("property_id"));
        Ok(record)
    }

    async fn validate(&self, record: &Record) -> Result<()> {
        if let Some(field) = record.first_missing_field(Self::REQUIRED_FIELDS) {
            return Err(ParserError::validation(format!(
                "Missing required field: {}",
                field
            )));
        }

        let property_id = record.get_str("property_id").unwrap_or_default();
        if !matches_format(property_id, PROPERTY_ID_PATTERN) {
            return Err(ParserError::validation("Invalid property ID format"));
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
            .ok_or_else(|| ParserError::validation("Invalid coordinates"))?;
        if !in_range(coords.lat, -90.0, 90.0) || !in_range(coords.lon, -180.0, 180.0) {
            return Err(ParserError::validation("Invalid coordinates"));
        }

        Ok(())
    }

    async fn save(&mut self, record: &Record) -> Result<()> {
        let row = Self::to_row(record)?;
        let db = self.db_mut()?;
        db.transaction(move |db| {
            Box::pin(async move { batch_insert(db, "properties", &[row]).await })
        })
        .await
    }

    fn clean(&mut self) {
        self.table = None;
    }
}
