use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Data format error: {message}")]
    DataFormat { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ParserError {
    pub fn data_format(message: impl Into<String>) -> Self {
        ParserError::DataFormat {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ParserError::Validation {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        ParserError::Authentication {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        ParserError::Database {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParserError>;
