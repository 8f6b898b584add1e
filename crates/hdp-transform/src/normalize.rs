//! Canonical schema normalization.
//!
//! Projects the parsed table into the warehouse row shape: both-sexes rows
//! only, integer year, float life expectancy, and a single `ingested_at`
//! stamp shared by the whole batch.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::parse::ParsedRecord;

/// Category tokens meaning "both sexes". The tabular feed uses the
/// human-readable label, the structured feed the coded token. New
/// source-specific tokens get added here explicitly, never inferred.
pub const BOTH_SEXES_TOKENS: [&str; 2] = ["Both sexes", "SEX_BTSX"];

/// Sex disaggregation category in the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SexCategory {
    Both,
    Male,
    Female,
}

impl SexCategory {
    /// Map a source token onto the canonical category, across both wire
    /// formats. Unknown tokens map to `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "Both sexes" | "SEX_BTSX" => Some(SexCategory::Both),
            "Male" | "SEX_MLE" => Some(SexCategory::Male),
            "Female" | "SEX_FMLE" => Some(SexCategory::Female),
            _ => None,
        }
    }

    /// Warehouse representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SexCategory::Both => "both",
            SexCategory::Male => "male",
            SexCategory::Female => "female",
        }
    }
}

impl std::fmt::Display for SexCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One warehouse row. Never mutated after creation; persisted by append.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub country_name: String,
    pub country_code: String,
    pub year: i32,
    pub sex: SexCategory,
    pub life_expectancy: f64,
    pub ingested_at: DateTime<Utc>,
}

/// Retain only rows whose category is in the both-sexes equivalence set,
/// preserving original order. This is a hard filter; idempotent on an
/// already-filtered table.
pub fn filter_both_sexes(records: Vec<ParsedRecord>) -> Vec<ParsedRecord> {
    let before = records.len();
    let filtered: Vec<ParsedRecord> = records
        .into_iter()
        .filter(|r| BOTH_SEXES_TOKENS.contains(&r.category.as_str()))
        .collect();
    debug!(
        "Both-sexes filter retained {} of {} row(s)",
        filtered.len(),
        before
    );
    filtered
}

/// Project a filtered, validated table into canonical warehouse rows.
///
/// `ingested_at` is captured once at run start and stamped onto every row,
/// so a batch is internally consistent and deterministic under test. The
/// quality gate has already rejected null values by the time this runs; a
/// null here is still reported as a quality failure rather than skipped.
pub fn normalize(
    records: Vec<ParsedRecord>,
    ingested_at: DateTime<Utc>,
) -> Result<Vec<CanonicalRecord>> {
    use crate::error::QualityKind;

    let missing = records.iter().filter(|r| r.value.is_none()).count();
    if missing > 0 {
        return Err(TransformError::Quality {
            kind: QualityKind::MissingValues,
            count: missing,
        });
    }

    records
        .into_iter()
        .map(|record| {
            let sex = SexCategory::from_token(&record.category).ok_or_else(|| {
                TransformError::Format(format!(
                    "Unrecognized sex category token '{}'",
                    record.category
                ))
            })?;
            let life_expectancy = record.value.ok_or_else(|| TransformError::Quality {
                kind: QualityKind::MissingValues,
                count: 1,
            })?;

            Ok(CanonicalRecord {
                country_name: record.region_name,
                country_code: record.region_code,
                year: record.time_dim,
                sex,
                life_expectancy,
                ingested_at,
            })
        })
        .collect()
}
