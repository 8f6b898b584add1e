//! Structured (OData JSON) parser branch.

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::parse::ParsedRecord;

/// The feed is either an OData envelope with a `value` array or a bare
/// array of records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Envelope { value: Vec<RawRow> },
    Rows(Vec<RawRow>),
}

/// One source record; unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "SpatialDim")]
    spatial_dim: Option<String>,
    #[serde(rename = "SpatialDimCode")]
    spatial_dim_code: Option<String>,
    #[serde(rename = "TimeDim")]
    time_dim: Option<i32>,
    #[serde(rename = "Dim1")]
    dim1: Option<String>,
    #[serde(rename = "NumericValue")]
    numeric_value: Option<f64>,
}

/// Parse a JSON payload into the uniform record table.
///
/// The structured feed carries the region code in `SpatialDim` and has no
/// `SpatialDimCode` field, so the code is synthesized from the name (and
/// vice versa) to keep downstream stages format-agnostic. An envelope whose
/// record sequence is empty is a format error, not an empty table.
pub fn parse(bytes: &[u8]) -> Result<Vec<ParsedRecord>> {
    let payload: Payload = serde_json::from_slice(bytes)
        .map_err(|e| TransformError::Format(format!("JSON payload unreadable: {}", e)))?;

    let rows = match payload {
        Payload::Envelope { value } => value,
        Payload::Rows(rows) => rows,
    };
    if rows.is_empty() {
        return Err(TransformError::Format(
            "JSON has no 'value' array or it is empty".to_string(),
        ));
    }

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let (region_name, region_code) = match (row.spatial_dim, row.spatial_dim_code) {
            (Some(name), Some(code)) => (name, code),
            (Some(name), None) => (name.clone(), name),
            (None, Some(code)) => (code.clone(), code),
            (None, None) => {
                return Err(TransformError::Format(format!(
                    "JSON record {}: no SpatialDim or SpatialDimCode field",
                    index
                )))
            },
        };

        let time_dim = row.time_dim.ok_or_else(|| {
            TransformError::Format(format!("JSON record {}: missing TimeDim", index))
        })?;
        let category = row.dim1.ok_or_else(|| {
            TransformError::Format(format!("JSON record {}: missing Dim1", index))
        })?;

        records.push(ParsedRecord {
            region_name,
            region_code,
            time_dim,
            category,
            value: row.numeric_value,
        });
    }

    debug!("Structured parse produced {} record(s)", records.len());
    Ok(records)
}
