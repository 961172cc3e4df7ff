pub mod civicsource;
pub mod clayton;
pub mod cobb;
pub mod dekalb;
pub mod govease;
pub(crate) mod tabular;

pub use civicsource::{CivicsourceInput, CivicsourceParser};
pub use clayton::{ClaytonPdfParser, ClaytonSpreadsheetParser};
pub use cobb::CobbPdfParser;
pub use dekalb::DekalbParser;
pub use govease::GoveaseParser;
