use crate::domain::model::Mmsi;
use std::path::PathBuf;
use thiserror::Error;

/// Boundary dataset could not be turned into a classifier.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("no boundary dataset found (tried: {})", tried.join(", "))]
    NotFound { tried: Vec<String> },

    #[error("failed to read boundary dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("boundary dataset {path} is not a valid feature collection: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A single boundary could not be evaluated. Always recovered by the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("boundary #{index} has an empty geometry")]
    Empty { index: usize },

    #[error("boundary #{index} has non-finite coordinates")]
    NonFinite { index: usize },

    #[error("point ({lon}, {lat}) is not a finite coordinate")]
    InvalidPoint { lon: f64, lat: f64 },

    #[error("unsupported coordinates for {kind}: {reason}")]
    Coordinates { kind: String, reason: String },
}

#[derive(Error, Debug)]
pub enum AisError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("bulk read failed at offset {offset}: {source}")]
    Read {
        offset: usize,
        #[source]
        source: Box<AisError>,
    },

    #[error("delete batch {batch} failed ({} vessels): {source}", vessels.len())]
    Delete {
        batch: usize,
        vessels: Vec<Mmsi>,
        #[source]
        source: Box<AisError>,
    },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API responded with status {status}: {body}")]
    ApiStatus { status: u16, body: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Confirmation failed: {message}")]
    ConfirmationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Boundary,
    Storage,
    Network,
    Data,
    Configuration,
    Interaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AisError {
    pub fn read(offset: usize, source: AisError) -> Self {
        Self::Read {
            offset,
            source: Box::new(source),
        }
    }

    pub fn delete(batch: usize, vessels: Vec<Mmsi>, source: AisError) -> Self {
        Self::Delete {
            batch,
            vessels,
            source: Box::new(source),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Load(_) | Self::Geometry(_) => ErrorCategory::Boundary,
            Self::Read { .. } | Self::Delete { .. } => ErrorCategory::Storage,
            Self::ApiError(_) | Self::ApiStatus { .. } => ErrorCategory::Network,
            Self::CsvError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorCategory::Data
            }
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::ConfirmationError { .. } => ErrorCategory::Interaction,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Geometry(_) => ErrorSeverity::Low,
            Self::ApiError(_) | Self::ApiStatus { .. } | Self::Read { .. } => {
                ErrorSeverity::Medium
            }
            Self::Load(_)
            | Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfirmationError { .. } => ErrorSeverity::High,
            // Partially applied deletions or a broken filesystem need a human.
            Self::Delete { .. } | Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::Load(LoadError::NotFound { .. }) => {
                "Place a boundary GeoJSON file in the boundaries directory or point [boundaries].directory at it".to_string()
            }
            Self::Load(_) => "Check that the boundary dataset is a valid GeoJSON FeatureCollection".to_string(),
            Self::Geometry(_) => "The boundary is skipped; fix the dataset to classify against it".to_string(),
            Self::Read { .. } => {
                "Nothing was deleted. Re-run the cleanup once the store is reachable".to_string()
            }
            Self::Delete { .. } => {
                "Some batches may already be applied. Re-run the cleanup; it only removes what is still flagged".to_string()
            }
            Self::ApiError(_) | Self::ApiStatus { .. } => {
                "Check network connectivity and the endpoint / credentials".to_string()
            }
            Self::CsvError(_) | Self::SerializationError(_) => {
                "Inspect the input data format".to_string()
            }
            Self::IoError(_) => "Check file permissions and available disk space".to_string(),
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => {
                "Review the configuration file and environment variables".to_string()
            }
            Self::ConfirmationError { .. } => {
                "Run interactively or pass --yes to confirm non-interactively".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Load(e) => format!("Territorial boundaries could not be loaded: {}", e),
            Self::Read { offset, .. } => format!(
                "Reading vessel history failed at row {}; analysis aborted",
                offset
            ),
            Self::Delete { batch, .. } => format!(
                "Deleting vessel histories failed in batch {}; remaining batches skipped",
                batch
            ),
            Self::MissingConfigError { field } => {
                format!("Required setting '{}' is not configured", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AisError>;
