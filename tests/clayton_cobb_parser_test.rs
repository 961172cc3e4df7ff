use anyhow::Result;
use serde_json::Value;
use tax_parsers::{
    ClaytonSpreadsheetParser, CobbPdfParser, Db, Parser, ParserError, Record,
};
use tempfile::TempDir;

const CLAYTON_TABLE: &str = "CREATE TABLE clayton_properties (
    parcel_id TEXT,
    owner_name TEXT,
    property_address TEXT,
    market_value REAL,
    tax_year INTEGER,
    last_updated TEXT
)";

const COBB_TABLE: &str = "CREATE TABLE cobb_properties (
    property_id TEXT,
    location_address TEXT,
    district TEXT,
    land_lot TEXT,
    tax_amount REAL,
    assessment_date TEXT,
    created_at TEXT
)";

fn db_url(dir: &TempDir) -> String {
    format!("sqlite://{}/test.db?mode=rwc", dir.path().display())
}

fn clayton_record() -> Record {
    let mut record = Record::new();
    record.insert("parcel_id", "12-345-678");
    record.insert("owner_name", "JANE DOE");
    record.insert("property_address", "400 Tara Blvd");
    record.insert("market_value", Value::from(125000.0));
    record.insert("tax_year", Value::from(2024));
    record
}

fn cobb_record() -> Record {
    let mut record = Record::new();
    record.insert("property_id", "16-0234-00-012");
    record.insert("location_address", "700 Marietta Square");
    record.insert("district", "16");
    record.insert("land_lot", "234");
    record.insert("tax_amount", Value::from(3417.25));
    record.insert("assessment_date", "2024-01-15");
    record
}

#[tokio::test]
async fn test_clayton_validate_names_missing_field() {
    let parser = ClaytonSpreadsheetParser::new(None);
    let mut record = clayton_record();
    record.insert("owner_name", "");
    let err = parser.validate(&record).await.unwrap_err();
    assert!(err.to_string().contains("Missing required field: owner_name"));
}

#[tokio::test]
async fn test_clayton_save_stamps_last_updated() -> Result<()> {
    let dir = TempDir::new()?;
    let url = db_url(&dir);
    let mut db = Db::connect(&url).await?;
    db.execute(CLAYTON_TABLE).await?;

    let record = clayton_record();
    let mut parser = ClaytonSpreadsheetParser::new(Some(db));
    parser.validate(&record).await?;
    parser.save(&record).await?;
    parser.clean();

    let mut verify = Db::connect(&url).await?;
    let (parcel_id, market_value, tax_year, last_updated): (String, f64, i64, Option<String>) =
        sqlx::query_as(
            "SELECT parcel_id, market_value, tax_year, last_updated FROM clayton_properties",
        )
        .fetch_one(verify.conn())
        .await?;
    assert_eq!(parcel_id, "12-345-678");
    assert_eq!(market_value, 125000.0);
    assert_eq!(tax_year, 2024);
    assert!(last_updated.is_some());
    Ok(())
}

#[tokio::test]
async fn test_clayton_save_without_connection_is_database_error() {
    let mut parser = ClaytonSpreadsheetParser::new(None);
    let err = parser.save(&clayton_record()).await.unwrap_err();
    assert!(matches!(err, ParserError::Database { .. }));
}

#[tokio::test]
async fn test_clayton_save_failure_rolls_back() -> Result<()> {
    let dir = TempDir::new()?;
    let url = db_url(&dir);
    let db = Db::connect(&url).await?;
    // No clayton_properties table created.

    let mut parser = ClaytonSpreadsheetParser::new(Some(db));
    let err = parser.save(&clayton_record()).await.unwrap_err();
    assert!(matches!(err, ParserError::Database { .. }));
    Ok(())
}

#[tokio::test]
async fn test_cobb_validate_accepts_well_formed_record() -> Result<()> {
    let parser = CobbPdfParser::new(None);
    parser.validate(&cobb_record()).await?;
    Ok(())
}

#[tokio::test]
async fn test_cobb_validate_rejects_bad_property_id() {
    let parser = CobbPdfParser::new(None);
    let mut record = cobb_record();
    record.insert("property_id", "16-234-0-12");
    let err = parser.validate(&record).await.unwrap_err();
    assert!(err.to_string().contains("Invalid property ID format"));
}

#[tokio::test]
async fn test_cobb_save_stamps_created_at() -> Result<()> {
    let dir = TempDir::new()?;
    let url = db_url(&dir);
    let mut db = Db::connect(&url).await?;
    db.execute(COBB_TABLE).await?;

    let record = cobb_record();
    let mut parser = CobbPdfParser::new(Some(db));
    parser.validate(&record).await?;
    parser.save(&record).await?;
    parser.clean();

    let mut verify = Db::connect(&url).await?;
    let (property_id, tax_amount, assessment_date, created_at): (
        String,
        f64,
        String,
        Option<String>,
    ) = sqlx::query_as(
        "SELECT property_id, tax_amount, assessment_date, created_at FROM cobb_properties",
    )
    .fetch_one(verify.conn())
    .await?;
    assert_eq!(property_id, "16-0234-00-012");
    assert_eq!(tax_amount, 3417.25);
    assert_eq!(assessment_date, "2024-01-15");
    assert!(created_at.is_some());
    Ok(())
}

#[tokio::test]
async fn test_cobb_save_without_connection_is_database_error() {
    let mut parser = CobbPdfParser::new(None);
    let err = parser.save(&cobb_record()).await.unwrap_err();
    assert!(matches!(err, ParserError::Database { .. }));
}
