pub mod record;
pub mod catalog;
pub mod batch;

pub use record::*;
pub use catalog::*;
pub use batch::*;

use serde::{Deserialize, Serialize};

/// What to do when an incoming record correlates with an existing canonical row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    Skip,
    #[default]
    Overwrite,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = IngestionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(IngestionError::Configuration(format!("Unknown duplicate policy: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Draft,
    PendingReview,
    #[default]
    Published,
    Rejected,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Asset error: {0}")]
    Asset(String),

    #[error("Taxonomy error: {0}")]
    Taxonomy(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl IngestionError {
    /// Unique-index violations surface from MongoDB as E11000 write errors.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            IngestionError::DuplicateKey(_) => true,
            IngestionError::Database(e) => {
                let msg = e.to_string();
                msg.contains("E11000") || msg.to_lowercase().contains("duplicate key")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestionError>;
