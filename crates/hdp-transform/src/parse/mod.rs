//! Raw batch parsing.
//!
//! Two parser branches, one per [`SourceFormat`], both producing the same
//! uniform record shape so that no downstream stage needs to know which wire
//! format the batch arrived in.
//!
//! Source field names (WHO GHO): `SpatialDim` (region name; the structured
//! feed carries the ISO-3 code here), `SpatialDimCode` (region code, tabular
//! only), `TimeDim` (year), `Dim1` (sex category token), `NumericValue`
//! (life expectancy, may be blank or null). When a source lacks one of the
//! name/code fields, the other doubles for it.

use crate::error::Result;
use crate::format::{RawBatch, SourceFormat};

pub mod structured;
pub mod tabular;

/// Intermediate row shape shared by both parser branches.
///
/// All five fields are always populated as columns; only `value` may be
/// null per-row.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub region_name: String,
    pub region_code: String,
    pub time_dim: i32,
    pub category: String,
    pub value: Option<f64>,
}

/// Parse a raw batch into the uniform record table, dispatching on the
/// sniffed format. Fails with [`crate::TransformError::Format`] if the
/// payload is unparseable or mandatory structural columns cannot be
/// resolved.
pub fn parse(batch: &RawBatch) -> Result<Vec<ParsedRecord>> {
    match batch.format {
        SourceFormat::Tabular => tabular::parse(&batch.bytes),
        SourceFormat::Structured => structured::parse(&batch.bytes),
    }
}
