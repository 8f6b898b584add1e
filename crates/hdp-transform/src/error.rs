//! Error types for the transform stage.
//!
//! Every variant is terminal for the run: nothing here is retried
//! internally, and any error raised before the load stage commits leaves the
//! warehouse untouched.

use thiserror::Error;

/// Result type alias for transform operations
pub type Result<T> = std::result::Result<T, TransformError>;

/// Which data quality check rejected the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityKind {
    /// Rows with a null (or non-finite) value field.
    MissingValues,
    /// Rows repeating the natural key (region code, year, category).
    DuplicateRows,
}

impl std::fmt::Display for QualityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityKind::MissingValues => write!(f, "missing values"),
            QualityKind::DuplicateRows => write!(f, "duplicate rows"),
        }
    }
}

/// Main error type for the transform stage
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Staging store error: {0}")]
    Store(String),

    #[error("Unparseable payload: {0}")]
    Format(String),

    #[error("Data quality check failed: {kind} ({count} row(s))")]
    Quality { kind: QualityKind, count: usize },

    #[error("No rows left after the both-sexes filter")]
    EmptyResult,

    #[error("Warehouse schema mismatch: expected columns {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Warehouse load failed: {0}")]
    Load(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_error_carries_kind_and_count() {
        let err = TransformError::Quality {
            kind: QualityKind::DuplicateRows,
            count: 3,
        };
        assert_eq!(
            err.to_string(),
            "Data quality check failed: duplicate rows (3 row(s))"
        );
    }

    #[test]
    fn schema_mismatch_reports_both_sides() {
        let err = TransformError::SchemaMismatch {
            expected: vec!["year".into()],
            found: vec![],
        };
        let message = err.to_string();
        assert!(message.contains("expected"));
        assert!(message.contains("year"));
    }
}
