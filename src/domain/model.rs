use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One parsed property/tax entity as a field mapping. Shape varies per
/// source; a record is built fresh per parse call, validated before save
/// and discarded afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub fields: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Numeric accessor with string coercion: sources that hand every
    /// column over as text (CSV, PDF spans) still validate numerically.
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// A field counts as present when it exists and its value is neither
    /// null, an empty or whitespace-only string, nor an empty array or
    /// object. Numeric zero is present.
    pub fn has_value(&self, field: &str) -> bool {
        match self.fields.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// First required field missing a value, if any. Checked in
    /// declaration order so validation failures are deterministic.
    pub fn first_missing_field<'a>(&self, required: &'a [&'a str]) -> Option<&'a str> {
        required.iter().copied().find(|f| !self.has_value(f))
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A latitude/longitude pair, stored on records as a nested object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn to_value(self) -> Value {
        serde_json::json!({ "lat": self.lat, "lon": self.lon })
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            lat: obj.get("lat")?.as_f64()?,
            lon: obj.get("lon")?.as_f64()?,
        })
    }
}

/// Typed row shape for GovEase auction exports, which carry a fixed column
/// set rather than the per-county field mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyListing {
    pub parcel_id: String,
    pub property_address: String,
    pub owner_name: String,
    pub tax_amount_due: f64,
    pub assessed_value: f64,
    pub sale_datetime: DateTime<Utc>,
    pub opening_bid: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub image_urls: Vec<String>,
}
