use crate::config::S3Config;
use crate::error::ConnectionError;
use crate::object_key::ObjectKey;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Credentials};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Content type of uploaded records
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Failure to write one object
#[derive(Error, Debug)]
#[error("Failed to upload {key}: {message}")]
pub struct UploadError {
    pub key: String,
    pub message: String,
}

/// Destination for finished records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` under `key`, replacing any existing object
    async fn put_object(&self, key: &ObjectKey, body: Bytes) -> Result<(), UploadError>;
}

/// S3 / MinIO backed object store
pub struct S3Uploader {
    client: S3Client,
    endpoint: String,
}

impl S3Uploader {
    /// Create a new S3 uploader
    pub async fn new(config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        // Static MinIO credentials take precedence over the default chain
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "data-subscriber",
            ));
        }

        let aws_config = loader.load().await;
        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        let endpoint = config.endpoint();
        if let Some(ref endpoint_url) = endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());
        let endpoint = endpoint.unwrap_or_else(|| format!("aws:{}", config.region));

        info!(
            endpoint = %endpoint,
            bucket = %config.bucket,
            "S3 uploader initialized"
        );

        Self { client, endpoint }
    }

    /// Verify the bucket exists and the credentials can reach it
    pub async fn check_bucket(&self, bucket: &str) -> Result<(), ConnectionError> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| ConnectionError::Store {
                bucket: bucket.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        debug!(bucket = %bucket, "Bucket reachable");
        Ok(())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ObjectStore for S3Uploader {
    #[instrument(skip(self, body), fields(bucket = %key.bucket, s3_key = %key.path))]
    async fn put_object(&self, key: &ObjectKey, body: Bytes) -> Result<(), UploadError> {
        debug!(
            endpoint = %self.endpoint,
            size_bytes = body.len(),
            "Uploading CSV"
        );

        self.client
            .put_object()
            .bucket(&key.bucket)
            .key(&key.path)
            .content_type(CSV_CONTENT_TYPE)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| UploadError {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_names_key_and_cause() {
        let key = ObjectKey {
            bucket: "wis2box-incoming".to_string(),
            path: "zmb/centre/1_t.csv".to_string(),
        };
        let err = UploadError {
            key: key.to_string(),
            message: "connection refused".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Failed to upload wis2box-incoming/zmb/centre/1_t.csv: connection refused"
        );
    }

    #[tokio::test]
    async fn test_uploader_uses_configured_endpoint() {
        let config = S3Config {
            endpoint_url: Some("localhost:9000".to_string()),
            bucket: "wis2box-incoming".to_string(),
            access_key: Some("minio".to_string()),
            secret_key: Some("minio123".to_string()),
            ..S3Config::default()
        };

        let uploader = S3Uploader::new(&config).await;
        assert_eq!(uploader.endpoint(), "http://localhost:9000");
    }
}
