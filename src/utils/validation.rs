use crate::utils::error::{ParserError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

// Tax amounts are strictly positive and capped at $10M.
pub const MAX_TAX_AMOUNT: f64 = 10_000_000.0;

static COBB_PROPERTY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}-\d{4}-\d{2}-\d{3}$").unwrap());
static CLAYTON_PARCEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}-\d{3}-\d{3}$").unwrap());
static DEKALB_TAX_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6}-\d{2}$").unwrap());

/// Full-match check of `value` against `pattern`. The pattern is anchored
/// on both ends before compiling; an invalid pattern never matches.
pub fn matches_format(value: &str, pattern: &str) -> bool {
    match Regex::new(&format!("^(?:{})$", pattern)) {
        Ok(re) => re.is_match(value),
        Err(_) => false,
    }
}

/// Strict date check against one fixed chrono format string.
pub fn valid_date_format(value: &str, format: &str) -> bool {
    NaiveDate::parse_from_str(value, format).is_ok()
}

/// Inclusive range check.
pub fn in_range(value: f64, min: f64, max: f64) -> bool {
    min <= value && value <= max
}

/// Clayton County parcel id, e.g. 12-345-678.
pub fn valid_clayton_parcel_id(value: &str) -> bool {
    CLAYTON_PARCEL_ID.is_match(value)
}

/// Cobb County property id, e.g. 16-0234-00-012.
pub fn valid_cobb_property_id(value: &str) -> bool {
    COBB_PROPERTY_ID.is_match(value)
}

/// DeKalb County tax id: six digits, hyphen, two digits.
pub fn valid_dekalb_tax_id(value: &str) -> bool {
    DEKALB_TAX_ID.is_match(value)
}

/// Tax amounts must be strictly positive and under [`MAX_TAX_AMOUNT`].
pub fn valid_tax_amount(value: f64) -> bool {
    0.0 < value && value < MAX_TAX_AMOUNT
}

// Configuration-level validators. These return a Result naming the field so
// config loading can surface precise diagnostics.

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ParserError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ParserError::InvalidConfigValue {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ParserError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ParserError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}
