//! S3-compatible object backend.
//!
//! The bucket is the container. Works against AWS S3 and S3-compatible
//! services (MinIO, Backblaze B2, etc.) when given a custom endpoint.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file (or the
//! environment overrides layered on top of it) as `key_id` and `key_secret`.

use crate::backend::ObjectBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate_key;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
};
use exn::ResultExt;
use time::UtcDateTime;

/// S3-compatible object backend.
///
/// # Examples
///
/// ```no_run
/// use retrosync_storage::backend::S3Backend;
///
/// let backend = S3Backend::new(
///     "s3",
///     "retropie-sync",
///     "us-east-1",
///     Some("http://localhost:9000"),
///     "access_key_id",
///     "secret_access_key",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    region: String,
}

impl S3Backend {
    /// Create a new S3 object backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region or provider-specific region
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let region = region.into();
        let credentials = Credentials::new(key_id, key_secret, None, None, "retrosync-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.clone()))
            // A failed request fails the pass; the next pass tries again.
            .retry_config(RetryConfig::disabled())
            // Path-style addressing for S3-compatible services (MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            bucket: bucket.into(),
            region,
        }
    }

    #[cfg(test)]
    fn with_client(client: Client, bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self { name: "s3".to_string(), client, bucket: bucket.into(), region: region.into() }
    }

    fn network_error(context: &str, err: impl std::error::Error) -> ErrorKind {
        ErrorKind::Network(format!("{context}: {}", DisplayErrorContext(err)))
    }

    /// Convert AWS DateTime to UtcDateTime.
    fn parse_datetime(dt: &DateTime) -> Result<UtcDateTime> {
        UtcDateTime::from_unix_timestamp_nanos(dt.as_nanos())
            .or_raise(|| ErrorKind::BackendError("S3 datetime out of range".to_string()))
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    fn container(&self) -> &str {
        &self.bucket
    }

    async fn container_exists(&self) -> Result<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => exn::bail!(Self::network_error("head bucket", err)),
        }
    }

    async fn create_container(&self) -> Result<()> {
        tracing::info!(backend = %self.name, bucket = %self.bucket, "Creating bucket");
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        // us-east-1 is the one region that rejects an explicit location.
        if self.region != "us-east-1" {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(configuration);
        }
        request.send().await.map_err(|e| Self::network_error("create bucket", e))?;
        Ok(())
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let key = validate_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| Self::network_error(&format!("put object {key}"), e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let output = match self.client.get_object().bucket(&self.bucket).key(&key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                exn::bail!(ErrorKind::NotFound(key))
            },
            Err(err) => exn::bail!(Self::network_error(&format!("get object {key}"), err)),
        };
        let body = output.body.collect().await.map_err(|e| Self::network_error(&format!("read object {key}"), e))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn head(&self, key: &str) -> Result<Option<UtcDateTime>> {
        let key = validate_key(key)?;
        let output = match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => return Ok(None),
            Err(err) => exn::bail!(Self::network_error(&format!("head object {key}"), err)),
        };
        match output.last_modified() {
            Some(dt) => Ok(Some(Self::parse_datetime(dt)?)),
            None => {
                tracing::warn!(backend = %self.name, key = %key, "Object has no last-modified time");
                Ok(None)
            },
        }
    }
}
