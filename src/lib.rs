pub mod app;
pub mod config;
pub mod core;
pub mod db;
pub mod domain;
pub mod utils;

pub use crate::app::auth::{AuthSession, Credentials};
pub use crate::app::parsers::{
    CivicsourceInput, CivicsourceParser, ClaytonPdfParser, ClaytonSpreadsheetParser,
    CobbPdfParser, DekalbParser, GoveaseParser,
};
pub use crate::config::ParserConfig;
pub use crate::core::ParserEngine;
pub use crate::db::{batch_insert, Db};
pub use crate::domain::model::{Coordinates, PropertyListing, Record};
pub use crate::domain::ports::Parser;
pub use crate::utils::error::{ParserError, Result};
