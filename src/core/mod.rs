pub mod runner;

pub use crate::domain::model::{Coordinates, PropertyListing, Record};
pub use crate::domain::ports::Parser;
pub use crate::utils::error::Result;
pub use runner::ParserEngine;
