//! One-shot transform run orchestration.
//!
//! States: `Fetching -> Detecting -> Parsing -> Filtering -> Validating ->
//! Normalizing -> Loading -> Done`, with failure from any step absorbing
//! into [`RunError`], which names the failing stage. No internal retries;
//! retries belong to whatever scheduler invokes the run. Each run handles
//! exactly one raw batch, all-or-nothing.

use std::time::Instant;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::error::TransformError;
use crate::format::{self, RawBatch, SourceFormat};
use crate::normalize::CanonicalRecord;
use crate::parse::ParsedRecord;
use crate::staging::StagingStore;
use crate::{load, normalize, parse, quality};

/// Pipeline stage, used for failure reporting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Detecting,
    Parsing,
    Filtering,
    Validating,
    Normalizing,
    Loading,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Detecting => "detecting",
            Stage::Parsing => "parsing",
            Stage::Filtering => "filtering",
            Stage::Validating => "validating",
            Stage::Normalizing => "normalizing",
            Stage::Loading => "loading",
            Stage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// A failed run: which stage gave up, and why.
#[derive(Error, Debug)]
#[error("Transform run failed during {stage}: {source}")]
pub struct RunError {
    pub stage: Stage,
    #[source]
    pub source: TransformError,
}

/// Summary of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub object_key: String,
    pub format: SourceFormat,
    pub rows_parsed: usize,
    pub rows_filtered: usize,
    pub rows_written: u64,
    pub ingested_at: DateTime<Utc>,
}

fn at(stage: Stage) -> impl FnOnce(TransformError) -> RunError {
    move |source| RunError { stage, source }
}

/// The in-memory stage chain between parse and load: both-sexes filter,
/// optional row cap, quality gate, normalization.
///
/// The row cap (`MAX_ROWS`) applies after filtering and before the gate,
/// preserving original order: rows beyond the cutoff are not validated, so
/// a defect past the cutoff cannot fail a capped development run.
pub fn transform(
    records: Vec<ParsedRecord>,
    max_rows: Option<usize>,
    ingested_at: DateTime<Utc>,
) -> Result<Vec<CanonicalRecord>, RunError> {
    // Filtering
    let mut filtered = normalize::filter_both_sexes(records);
    if filtered.is_empty() {
        return Err(at(Stage::Filtering)(TransformError::EmptyResult));
    }
    if let Some(max_rows) = max_rows {
        if filtered.len() > max_rows {
            filtered.truncate(max_rows);
            info!("Limited to {} row(s) (MAX_ROWS)", max_rows);
        }
    }

    // Validating
    quality::validate(&filtered).map_err(at(Stage::Validating))?;

    // Normalizing
    normalize::normalize(filtered, ingested_at).map_err(at(Stage::Normalizing))
}

/// Execute one transform run end to end.
///
/// The `ingested_at` stamp for the whole batch is captured here, once, so
/// every canonical row in the batch carries the same timestamp.
pub async fn run(
    config: &Config,
    staging: &StagingStore,
    pool: &PgPool,
) -> Result<RunReport, RunError> {
    let run_started = Instant::now();
    let ingested_at = Utc::now();
    info!("Starting transform run (ingested_at = {})", ingested_at);

    // Fetching
    let t = Instant::now();
    let (latest, bytes) = staging
        .fetch_latest(&config.dataset_prefix)
        .await
        .map_err(at(Stage::Fetching))?;
    info!(
        "Fetched {} ({} bytes) in {:.1?}",
        latest.key,
        bytes.len(),
        t.elapsed()
    );

    // Detecting
    let detected = format::detect(&bytes);
    info!("Detected {} format", detected);
    let batch = RawBatch {
        key: latest.key.clone(),
        bytes,
        format: detected,
    };

    // Parsing
    let t = Instant::now();
    let records = parse::parse(&batch).map_err(at(Stage::Parsing))?;
    let rows_parsed = records.len();
    info!("Parsed {} row(s) in {:.1?}", rows_parsed, t.elapsed());

    // Filtering -> Validating -> Normalizing
    let canonical = transform(records, config.max_rows, ingested_at)?;
    let rows_filtered = canonical.len();
    info!("Both-sexes filter kept {} of {} row(s)", rows_filtered, rows_parsed);

    // Loading
    let t = Instant::now();
    let rows_written = load::load(pool, &canonical)
        .await
        .map_err(at(Stage::Loading))?;
    info!("Loaded {} row(s) in {:.1?}", rows_written, t.elapsed());

    info!(
        "Transform run completed successfully in {:.1?} total",
        run_started.elapsed()
    );

    Ok(RunReport {
        object_key: batch.key,
        format: batch.format,
        rows_parsed,
        rows_filtered,
        rows_written,
        ingested_at,
    })
}
