//! Per-record and per-batch error types.
//!
//! Artifact loading failures live in [`crate::artifacts::ArtifactError`];
//! everything here is recoverable and scoped to a single request or row.

use crate::record::Field;
use std::fmt;

/// A record that cannot be turned into a feature vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedRecord {
    /// Required field absent or blank
    #[error("missing required field {0}")]
    MissingField(Field),

    /// Numeric field holding text that does not parse as a number
    #[error("field {field} is not a number: {value:?}")]
    NotNumeric { field: Field, value: String },

    /// Numeric field holding NaN or an infinity
    #[error("field {field} must be finite, got {value}")]
    NonFinite { field: Field, value: f64 },

    /// Physical quantity that must be strictly positive
    #[error("field {field} must be greater than zero, got {value}")]
    NonPositive { field: Field, value: f64 },

    /// CSV row with more cells than the header
    #[error("row has {found} fields but the header has {expected}")]
    FieldCount { expected: usize, found: usize },

    /// CSV row the reader could not decode (e.g. invalid UTF-8)
    #[error("unreadable row: {0}")]
    Unreadable(String),
}

/// Failure to produce a prediction for one record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("malformed record: {0}")]
    MalformedRecord(#[from] MalformedRecord),

    /// Categorical value outside the encoder vocabulary, under the reject policy
    #[error("unknown {field} category {value:?}")]
    UnknownCategory { field: Field, value: String },

    /// Classifier emitted a code with no star type
    #[error("classifier produced label {0}, which maps to no star type")]
    UnmappedLabel(usize),
}

/// Batch table lacking one or more required columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMismatch {
    /// Required fields with no matching column, in training order
    pub missing: Vec<Field>,
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch file is missing required columns: ")?;
        for (i, field) in self.missing.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} ({})", field, field.column())?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaMismatch {}

/// Batch-level failure. Row-level problems are reported in the batch report instead.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("CSV I/O error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
