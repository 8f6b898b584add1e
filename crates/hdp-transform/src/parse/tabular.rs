//! Tabular (CSV) parser branch.

use csv::StringRecord;
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::parse::ParsedRecord;

/// Which region identifier columns the header carries. With only one of
/// the two present, it populates both the name and the code.
enum RegionColumns {
    Both { name: usize, code: usize },
    NameOnly(usize),
    CodeOnly(usize),
}

impl RegionColumns {
    fn extract<'r>(&self, cell: impl Fn(usize) -> &'r str) -> (&'r str, &'r str) {
        match *self {
            RegionColumns::Both { name, code } => (cell(name), cell(code)),
            RegionColumns::NameOnly(name) => {
                let name = cell(name);
                (name, name)
            },
            RegionColumns::CodeOnly(code) => {
                let code = cell(code);
                (code, code)
            },
        }
    }
}

/// Header column positions, resolved once per batch.
struct ColumnMap {
    region: RegionColumns,
    time_dim: usize,
    dim1: usize,
    numeric_value: usize,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let region = match (position("SpatialDim"), position("SpatialDimCode")) {
            (Some(name), Some(code)) => Some(RegionColumns::Both { name, code }),
            (Some(name), None) => Some(RegionColumns::NameOnly(name)),
            (None, Some(code)) => Some(RegionColumns::CodeOnly(code)),
            (None, None) => None,
        };
        let time_dim = position("TimeDim");
        let dim1 = position("Dim1");
        let numeric_value = position("NumericValue");

        let mut missing = Vec::new();
        if region.is_none() {
            missing.push("SpatialDim/SpatialDimCode");
        }
        if time_dim.is_none() {
            missing.push("TimeDim");
        }
        if dim1.is_none() {
            missing.push("Dim1");
        }
        if numeric_value.is_none() {
            missing.push("NumericValue");
        }
        if !missing.is_empty() {
            return Err(TransformError::Format(format!(
                "CSV header is missing mandatory column(s): {}",
                missing.join(", ")
            )));
        }

        let (Some(region), Some(time_dim), Some(dim1), Some(numeric_value)) =
            (region, time_dim, dim1, numeric_value)
        else {
            return Err(TransformError::Format(
                "CSV header resolution failed".to_string(),
            ));
        };

        Ok(Self {
            region,
            time_dim,
            dim1,
            numeric_value,
        })
    }
}

/// Parse a delimited-text payload with a header row.
///
/// An empty `NumericValue` cell becomes a null value; nulls are rejected
/// later by the quality gate, not here.
pub fn parse(bytes: &[u8]) -> Result<Vec<ParsedRecord>> {
    let mut reader = csv::Reader::from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| TransformError::Format(format!("CSV header unreadable: {}", e)))?
        .clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        // Header is line 1; data starts on line 2.
        let line = index + 2;
        let row =
            row.map_err(|e| TransformError::Format(format!("CSV line {}: {}", line, e)))?;

        let cell = |col: usize| row.get(col).unwrap_or("").trim();
        let (region_name, region_code) = columns.region.extract(cell);

        let time_cell = cell(columns.time_dim);
        let time_dim = time_cell.parse::<i32>().map_err(|_| {
            TransformError::Format(format!("CSV line {}: invalid TimeDim '{}'", line, time_cell))
        })?;

        let value_cell = cell(columns.numeric_value);
        let value = if value_cell.is_empty() {
            None
        } else {
            Some(value_cell.parse::<f64>().map_err(|_| {
                TransformError::Format(format!(
                    "CSV line {}: invalid NumericValue '{}'",
                    line, value_cell
                ))
            })?)
        };

        records.push(ParsedRecord {
            region_name: region_name.to_string(),
            region_code: region_code.to_string(),
            time_dim,
            category: cell(columns.dim1).to_string(),
            value,
        });
    }

    debug!("Tabular parse produced {} record(s)", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_header() {
        let records = parse(
            b"SpatialDim,SpatialDimCode,TimeDim,Dim1,NumericValue\n\
              Rwanda,RWA,2020,Both sexes,69.3\n\
              Kenya,KEN,2020,Both sexes,66.7\n",
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].region_name, "Rwanda");
        assert_eq!(records[0].region_code, "RWA");
        assert_eq!(records[0].time_dim, 2020);
        assert_eq!(records[0].category, "Both sexes");
        assert_eq!(records[0].value, Some(69.3));
    }

    #[test]
    fn name_column_doubles_as_code() {
        let records =
            parse(b"SpatialDim,TimeDim,Dim1,NumericValue\nRWA,2020,Both sexes,69.3\n").unwrap();
        assert_eq!(records[0].region_name, "RWA");
        assert_eq!(records[0].region_code, "RWA");
    }

    #[test]
    fn code_column_doubles_as_name() {
        let records =
            parse(b"SpatialDimCode,TimeDim,Dim1,NumericValue\nRWA,2020,Both sexes,69.3\n")
                .unwrap();
        assert_eq!(records[0].region_name, "RWA");
        assert_eq!(records[0].region_code, "RWA");
    }

    #[test]
    fn empty_value_cell_is_null() {
        let records =
            parse(b"SpatialDimCode,TimeDim,Dim1,NumericValue\nRWA,2020,Both sexes,\n").unwrap();
        assert_eq!(records[0].value, None);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let records = parse(
            b"Id,SpatialDimCode,TimeDim,Dim1,NumericValue,Comment\n\
              1,RWA,2020,Both sexes,69.3,ok\n",
        )
        .unwrap();
        assert_eq!(records[0].region_code, "RWA");
        assert_eq!(records[0].value, Some(69.3));
    }

    #[test]
    fn missing_mandatory_columns_fail() {
        let err = parse(b"Country,Year\nRwanda,2020\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("TimeDim"));
        assert!(message.contains("NumericValue"));
    }

    #[test]
    fn invalid_year_fails_with_line_number() {
        let err = parse(b"SpatialDimCode,TimeDim,Dim1,NumericValue\nRWA,20xx,Both sexes,69.3\n")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
