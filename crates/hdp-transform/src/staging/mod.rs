//! Staging object store client.
//!
//! Thin wrapper over an S3-compatible store (MinIO in dev, AWS otherwise)
//! exposing exactly what one transform run needs: list the objects under
//! the dataset prefix, pick the most recent one, fetch its bytes.

use aws_sdk_s3::{
    config::{Credentials, Region},
    Client,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::error::{Result, TransformError};

pub mod config;

/// One staged object as seen in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Latest-object selection rule: maximum `last_modified` wins; ties are
/// broken by the lexicographically greatest key. Deterministic regardless
/// of listing order.
pub fn select_latest(objects: &[StagedObject]) -> Option<&StagedObject> {
    objects.iter().max_by(|a, b| {
        a.last_modified
            .cmp(&b.last_modified)
            .then_with(|| a.key.cmp(&b.key))
    })
}

#[derive(Clone)]
pub struct StagingStore {
    client: Client,
    bucket: String,
}

impl StagingStore {
    pub async fn new(config: config::StagingConfig) -> Result<Self> {
        debug!("Initializing staging store client for bucket {}", config.bucket);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "hdp-staging",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!("Staging store client initialized for bucket: {}", config.bucket);

        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }

    /// List every object under the prefix, following continuation tokens.
    #[instrument(skip(self))]
    pub async fn list(&self, prefix: &str) -> Result<Vec<StagedObject>> {
        debug!("Listing s3://{}/{}", self.bucket, prefix);

        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = &continuation {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| {
                TransformError::Store(format!(
                    "Failed to list s3://{}/{}: {}",
                    self.bucket, prefix, e
                ))
            })?;

            for object in response.contents() {
                let Some(key) = object.key() else { continue };
                let last_modified = object
                    .last_modified()
                    .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()))
                    .unwrap_or_default();
                objects.push(StagedObject {
                    key: key.to_string(),
                    last_modified,
                });
            }

            if response.is_truncated() == Some(true) {
                continuation = response.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }

        debug!("Found {} object(s) under prefix {}", objects.len(), prefix);
        Ok(objects)
    }

    /// Fetch the full byte payload of one object.
    #[instrument(skip(self))]
    pub async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        debug!("Fetching s3://{}/{}", self.bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                TransformError::Store(format!(
                    "Failed to fetch s3://{}/{}: {}",
                    self.bucket, key, e
                ))
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| {
                TransformError::Store(format!("Failed to read body of {}: {}", key, e))
            })?
            .into_bytes()
            .to_vec();

        info!("Fetched {} bytes from s3://{}/{}", data.len(), self.bucket, key);
        Ok(data)
    }

    /// List the dataset prefix and fetch the most recently modified object.
    /// An empty listing is a staging store error.
    pub async fn fetch_latest(&self, prefix: &str) -> Result<(StagedObject, Vec<u8>)> {
        let objects = self.list(prefix).await?;
        let latest = select_latest(&objects)
            .ok_or_else(|| {
                TransformError::Store(format!(
                    "No objects found under s3://{}/{}",
                    self.bucket, prefix
                ))
            })?
            .clone();

        info!(
            "Selected latest object {} (modified {})",
            latest.key, latest.last_modified
        );

        let bytes = self.fetch(&latest.key).await?;
        Ok((latest, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn object(key: &str, secs: i64) -> StagedObject {
        StagedObject {
            key: key.to_string(),
            last_modified: Utc.timestamp_opt(secs, 0).single().unwrap(),
        }
    }

    #[test]
    fn latest_by_timestamp() {
        let objects = vec![
            object("who_life_expectancy/ingestion_date=2026-08-01/life_expectancy.json", 100),
            object("who_life_expectancy/ingestion_date=2026-08-20/life_expectancy.json", 300),
            object("who_life_expectancy/ingestion_date=2026-08-10/life_expectancy.json", 200),
        ];
        let latest = select_latest(&objects).unwrap();
        assert!(latest.key.contains("2026-08-20"));
    }

    #[test]
    fn timestamp_tie_breaks_by_greatest_key() {
        let objects = vec![
            object("who_life_expectancy/a.csv", 100),
            object("who_life_expectancy/b.json", 100),
        ];
        assert_eq!(select_latest(&objects).unwrap().key, "who_life_expectancy/b.json");
    }

    #[test]
    fn selection_ignores_listing_order() {
        let mut objects = vec![
            object("p/b", 100),
            object("p/a", 100),
            object("p/c", 50),
        ];
        let forward = select_latest(&objects).unwrap().clone();
        objects.reverse();
        let backward = select_latest(&objects).unwrap().clone();
        assert_eq!(forward, backward);
        assert_eq!(forward.key, "p/b");
    }

    #[test]
    fn empty_listing_selects_nothing() {
        assert!(select_latest(&[]).is_none());
    }
}
