use crate::utils::error::{ParserError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_IMAGE_CHECK_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    pub database: DatabaseConfig,
    pub civicsource: Option<CivicsourceConfig>,
    pub govease: Option<GoveaseConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivicsourceConfig {
    /// Must end with a trailing slash so endpoint joins resolve under it.
    pub base_url: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoveaseConfig {
    pub image_check_timeout_secs: Option<u64>,
}

impl ParserConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ParserConfig = toml::from_str(content).map_err(|e| ParserError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl Validate for ParserConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("database.url", &self.database.url)?;

        if let Some(civicsource) = &self.civicsource {
            validate_url("civicsource.base_url", &civicsource.base_url)?;
            if !civicsource.base_url.ends_with('/') {
                return Err(ParserError::InvalidConfigValue {
                    field: "civicsource.base_url".to_string(),
                    value: civicsource.base_url.clone(),
                    reason: "Base URL must end with a trailing slash".to_string(),
                });
            }
            validate_non_empty_string("civicsource.email", &civicsource.email)?;
            validate_non_empty_string("civicsource.password", &civicsource.password)?;
        }

        if let Some(govease) = &self.govease {
            if govease.image_check_timeout_secs == Some(0) {
                return Err(ParserError::InvalidConfigValue {
                    field: "govease.image_check_timeout_secs".to_string(),
                    value: "0".to_string(),
                    reason: "Timeout must be at least one second".to_string(),
                });
            }
        }

        Ok(())
    }
}
