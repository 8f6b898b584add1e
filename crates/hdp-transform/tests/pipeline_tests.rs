//! End-to-end tests of the in-memory pipeline stages: sniff -> parse ->
//! filter -> validate -> normalize. The warehouse load has its own
//! Docker-backed test in `warehouse_load_tests.rs`.

use chrono::{DateTime, TimeZone, Utc};
use hdp_transform::{
    format, normalize, parse, pipeline, CanonicalRecord, QualityKind, RawBatch, SexCategory,
    SourceFormat, TransformError,
};

fn run_ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 23, 6, 0, 0).single().unwrap()
}

/// Sniff and parse one payload, then run the in-memory stage chain the way
/// a real run does between the staging fetch and the warehouse load.
fn transform_capped(
    bytes: &[u8],
    max_rows: Option<usize>,
) -> Result<Vec<CanonicalRecord>, TransformError> {
    let batch = RawBatch {
        key: "who_life_expectancy/test".to_string(),
        bytes: bytes.to_vec(),
        format: format::detect(bytes),
    };
    let records = parse::parse(&batch)?;
    pipeline::transform(records, max_rows, run_ts()).map_err(|e| e.source)
}

fn transform(bytes: &[u8]) -> Result<Vec<CanonicalRecord>, TransformError> {
    transform_capped(bytes, None)
}

#[test]
fn structured_input_produces_one_canonical_row() {
    let rows = transform(
        br#"{"value":[{"SpatialDim":"RWA","TimeDim":2020,"Dim1":"SEX_BTSX","NumericValue":69.3}]}"#,
    )
    .unwrap();

    assert_eq!(
        rows,
        vec![CanonicalRecord {
            country_name: "RWA".to_string(),
            country_code: "RWA".to_string(),
            year: 2020,
            sex: SexCategory::Both,
            life_expectancy: 69.3,
            ingested_at: run_ts(),
        }]
    );
}

#[test]
fn tabular_input_matches_structured_output() {
    let from_tabular = transform(
        b"SpatialDimCode,TimeDim,Dim1,NumericValue\nRWA,2020,Both sexes,69.3\n",
    )
    .unwrap();
    let from_structured = transform(
        br#"{"value":[{"SpatialDim":"RWA","TimeDim":2020,"Dim1":"SEX_BTSX","NumericValue":69.3}]}"#,
    )
    .unwrap();

    assert_eq!(from_tabular, from_structured);
}

#[test]
fn format_transparency_over_multiple_rows() {
    let tabular = b"SpatialDim,SpatialDimCode,TimeDim,Dim1,NumericValue\n\
                    Rwanda,RWA,2020,Both sexes,69.3\n\
                    Rwanda,RWA,2019,Both sexes,69.0\n\
                    Kenya,KEN,2020,Both sexes,66.7\n";
    let structured = br#"{"value":[
        {"SpatialDim":"Rwanda","SpatialDimCode":"RWA","TimeDim":2020,"Dim1":"SEX_BTSX","NumericValue":69.3},
        {"SpatialDim":"Rwanda","SpatialDimCode":"RWA","TimeDim":2019,"Dim1":"SEX_BTSX","NumericValue":69.0},
        {"SpatialDim":"Kenya","SpatialDimCode":"KEN","TimeDim":2020,"Dim1":"SEX_BTSX","NumericValue":66.7}
    ]}"#;

    assert_eq!(transform(tabular).unwrap(), transform(structured).unwrap());
}

#[test]
fn empty_numeric_value_fails_validation_before_any_load() {
    let err = transform(
        b"SpatialDimCode,TimeDim,Dim1,NumericValue\n\
          RWA,2020,Both sexes,69.3\n\
          KEN,2020,Both sexes,\n",
    )
    .unwrap_err();

    assert!(matches!(
        err,
        TransformError::Quality {
            kind: QualityKind::MissingValues,
            count: 1,
        }
    ));
}

#[test]
fn duplicate_natural_key_fails_validation() {
    let err = transform(
        b"SpatialDimCode,TimeDim,Dim1,NumericValue\n\
          RWA,2020,Both sexes,69.3\n\
          RWA,2020,Both sexes,69.5\n",
    )
    .unwrap_err();

    assert!(matches!(
        err,
        TransformError::Quality {
            kind: QualityKind::DuplicateRows,
            count: 1,
        }
    ));
}

#[test]
fn sex_disaggregated_only_input_fails_with_empty_result() {
    let err = transform(
        br#"{"value":[
            {"SpatialDim":"RWA","TimeDim":2020,"Dim1":"SEX_MLE","NumericValue":67.1},
            {"SpatialDim":"RWA","TimeDim":2020,"Dim1":"SEX_FMLE","NumericValue":71.5}
        ]}"#,
    )
    .unwrap_err();

    assert!(matches!(err, TransformError::EmptyResult));
}

#[test]
fn mixed_categories_keep_only_both_sexes() {
    let rows = transform(
        b"SpatialDimCode,TimeDim,Dim1,NumericValue\n\
          RWA,2020,Both sexes,69.3\n\
          RWA,2020,Male,67.1\n\
          RWA,2020,Female,71.5\n",
    )
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sex, SexCategory::Both);
    assert_eq!(rows[0].life_expectancy, 69.3);
}

#[test]
fn duplicates_outside_the_filter_do_not_fail_the_run() {
    // The gate runs on the post-filter table; a male/female collision is
    // filtered away before validation ever sees it.
    let rows = transform(
        b"SpatialDimCode,TimeDim,Dim1,NumericValue\n\
          RWA,2020,Both sexes,69.3\n\
          RWA,2020,Male,67.1\n\
          RWA,2020,Male,67.2\n",
    )
    .unwrap();

    assert_eq!(rows.len(), 1);
}

#[test]
fn normalization_is_idempotent_on_filtered_tables() {
    let batch = RawBatch {
        key: "t".to_string(),
        bytes: b"SpatialDimCode,TimeDim,Dim1,NumericValue\nRWA,2020,Both sexes,69.3\n".to_vec(),
        format: SourceFormat::Tabular,
    };
    let records = parse::parse(&batch).unwrap();
    let once = normalize::filter_both_sexes(records);
    let twice = normalize::filter_both_sexes(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn max_rows_cap_truncates_after_filtering_before_the_gate() {
    // Rows: male (filtered out), two clean both-sexes rows, then a
    // duplicate both-sexes row past the cutoff. With MAX_ROWS=2 the male
    // row costs no budget and the duplicate is never validated; order of
    // the surviving rows is unchanged.
    let payload = b"SpatialDimCode,TimeDim,Dim1,NumericValue\n\
                    RWA,2020,Male,67.1\n\
                    RWA,2020,Both sexes,69.3\n\
                    KEN,2020,Both sexes,66.7\n\
                    RWA,2020,Both sexes,69.5\n";

    let rows = transform_capped(payload, Some(2)).unwrap();
    let codes: Vec<&str> = rows.iter().map(|r| r.country_code.as_str()).collect();
    assert_eq!(codes, vec!["RWA", "KEN"]);

    // The same payload without the cap trips the uniqueness check.
    let err = transform(payload).unwrap_err();
    assert!(matches!(
        err,
        TransformError::Quality {
            kind: QualityKind::DuplicateRows,
            count: 1,
        }
    ));
}

#[test]
fn every_row_carries_the_run_timestamp() {
    let rows = transform(
        b"SpatialDimCode,TimeDim,Dim1,NumericValue\n\
          RWA,2020,Both sexes,69.3\n\
          KEN,2020,Both sexes,66.7\n\
          UGA,2020,Both sexes,63.4\n",
    )
    .unwrap();

    assert!(rows.iter().all(|r| r.ingested_at == run_ts()));
}
