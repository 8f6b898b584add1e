//! Warehouse bulk loader.
//!
//! Streams the canonical batch into PostgreSQL through the COPY protocol
//! inside a single transaction: either every row of the batch commits or
//! none do. COPY is an order of magnitude faster than batched INSERTs for
//! this table size, which is why the loader never issues per-row
//! statements.

use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::error::{Result, TransformError};
use crate::normalize::CanonicalRecord;

/// Append-only warehouse table the canonical batch lands in.
pub const TARGET_TABLE: &str = "health_life_expectancy";

/// Declared column list of the target table, in ordinal order. The CSV
/// serialization below must match this order exactly.
pub const TARGET_COLUMNS: [&str; 6] = [
    "country_name",
    "country_code",
    "year",
    "sex",
    "life_expectancy",
    "ingested_at",
];

/// Timestamp rendering inside the COPY payload.
const COPY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Bulk-load the canonical batch. Returns the number of rows written.
///
/// The live table schema is verified against [`TARGET_COLUMNS`] before
/// anything is serialized; a drifted table fails fast with
/// [`TransformError::SchemaMismatch`] instead of silently misaligning
/// columns. On any error after `begin`, the transaction is dropped and
/// rolled back, so a partial batch is never visible.
#[instrument(skip(pool, records), fields(rows = records.len()))]
pub async fn load(pool: &PgPool, records: &[CanonicalRecord]) -> Result<u64> {
    verify_schema(pool).await?;

    let payload = serialize_csv(records)?;
    debug!("Serialized {} row(s) into {} bytes", records.len(), payload.len());

    let statement = format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv)",
        TARGET_TABLE,
        TARGET_COLUMNS.join(", ")
    );

    let mut tx = pool.begin().await?;
    let mut copy = (&mut *tx).copy_in_raw(&statement).await?;
    copy.send(payload).await?;
    let rows_written = copy.finish().await?;
    tx.commit().await?;

    info!("COPY committed {} row(s) into {}", rows_written, TARGET_TABLE);
    Ok(rows_written)
}

/// Compare the live column list (name and order) against the declared one.
async fn verify_schema(pool: &PgPool) -> Result<()> {
    // Scoped to the current schema so a same-named table elsewhere on the
    // search path cannot pollute the column list.
    let found: Vec<String> = sqlx::query_scalar(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_name = $1 AND table_schema = current_schema() \
         ORDER BY ordinal_position",
    )
    .bind(TARGET_TABLE)
    .fetch_all(pool)
    .await?;

    let expected: Vec<String> = TARGET_COLUMNS.iter().map(|c| c.to_string()).collect();
    if found != expected {
        return Err(TransformError::SchemaMismatch { expected, found });
    }
    Ok(())
}

/// Render the batch as headerless CSV in [`TARGET_COLUMNS`] order.
fn serialize_csv(records: &[CanonicalRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    for record in records {
        let year = record.year.to_string();
        let life_expectancy = format!("{:.4}", record.life_expectancy);
        let ingested_at = record.ingested_at.format(COPY_TIMESTAMP_FORMAT).to_string();
        writer
            .write_record([
                record.country_name.as_str(),
                record.country_code.as_str(),
                year.as_str(),
                record.sex.as_str(),
                life_expectancy.as_str(),
                ingested_at.as_str(),
            ])
            .map_err(|e| TransformError::Format(format!("CSV serialization failed: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| TransformError::Format(format!("CSV serialization failed: {}", e)))
}
