// Report error taxonomy
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReportError {
    #[error("dataset {key} not found at {path}")]
    DatasetNotFound { key: String, path: String },

    #[error("dataset {key} could not be read: {reason}")]
    DatasetUnreadable { key: String, reason: String },

    #[error("dataset {key} does not match the expected schema: {detail}")]
    SchemaMismatch { key: String, detail: String },

    #[error("dataset {key} has no column named {column}")]
    ColumnMissing { key: String, column: String },

    #[error("geometry {location} is unavailable: {reason}")]
    GeometryUnavailable { location: String, reason: String },

    #[error("{} region(s) have no matching geometry: {}", .unmatched.len(), .unmatched.join(", "))]
    GeometryJoinIncomplete { unmatched: Vec<String> },

    #[error("invalid report configuration: {0}")]
    ReportSpecInvalid(String),
}

impl ReportError {
    /// Stable name of the failure kind, shown in panel placeholders
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::DatasetNotFound { .. } => "DatasetNotFound",
            ReportError::DatasetUnreadable { .. } => "DatasetUnreadable",
            ReportError::SchemaMismatch { .. } => "SchemaMismatch",
            ReportError::ColumnMissing { .. } => "ColumnMissing",
            ReportError::GeometryUnavailable { .. } => "GeometryUnavailable",
            ReportError::GeometryJoinIncomplete { .. } => "GeometryJoinIncomplete",
            ReportError::ReportSpecInvalid(_) => "ReportSpecInvalid",
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ReportError::ReportSpecInvalid(message.into())
    }
}
