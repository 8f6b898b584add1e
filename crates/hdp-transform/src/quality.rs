//! Data quality gate.
//!
//! Runs over the post-filter table, before normalization. The gate never
//! repairs data: any finding is a hard stop for the run, and each check
//! reports how many rows offended so the failure is diagnosable.

use std::collections::HashSet;

use tracing::info;

use crate::error::{QualityKind, Result, TransformError};
use crate::parse::ParsedRecord;

/// Validate a parsed table against the two mandatory checks:
///
/// 1. Completeness: no row may have a null (or non-finite) value.
/// 2. Uniqueness: the natural key (region code, year, category) must not
///    repeat. Every occurrence beyond the first counts as one duplicate.
///
/// Both checks run to completion over the whole table; completeness is
/// reported first when both fail.
pub fn validate(records: &[ParsedRecord]) -> Result<()> {
    info!("Running data quality checks on {} row(s)", records.len());

    let missing = records
        .iter()
        .filter(|r| !r.value.is_some_and(f64::is_finite))
        .count();
    if missing > 0 {
        return Err(TransformError::Quality {
            kind: QualityKind::MissingValues,
            count: missing,
        });
    }

    let mut seen = HashSet::with_capacity(records.len());
    let mut duplicates = 0;
    for record in records {
        let key = (record.region_code.as_str(), record.time_dim, record.category.as_str());
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        return Err(TransformError::Quality {
            kind: QualityKind::DuplicateRows,
            count: duplicates,
        });
    }

    info!("Data quality checks passed");
    Ok(())
}
