//! S3-compatible bucket client.
//!
//! Chute points this at Cloudflare R2 in production, but any
//! S3-compatible endpoint works. Bucket failures are generally treated as
//! non-fatal by callers: the metadata index stays authoritative.

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::info;

use crate::config::BucketConfig;
use crate::error::{Error, Result};

/// Client for the object-storage bucket.
#[derive(Clone)]
pub struct BucketService {
    client: S3Client,
    bucket: String,
    public_base_url: Option<String>,
}

impl BucketService {
    /// Build a client from configuration. Returns None when the bucket is
    /// not fully configured.
    pub async fn from_config(cfg: &BucketConfig) -> Option<Self> {
        let (endpoint, bucket, access_key, secret_key) = match (
            &cfg.endpoint,
            &cfg.bucket,
            &cfg.access_key_id,
            &cfg.secret_access_key,
        ) {
            (Some(e), Some(b), Some(a), Some(s)) => (e, b, a, s),
            _ => return None,
        };

        let credentials = Credentials::new(access_key, secret_key, None, None, "chute");

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        info!(bucket = %bucket, endpoint = %endpoint, "Bucket backend configured");

        Some(Self {
            client: S3Client::from_conf(s3_config),
            bucket: bucket.clone(),
            public_base_url: cfg.public_base_url.clone(),
        })
    }

    /// Store an object under the given key.
    pub async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| Error::Bucket(e.into_service_error().to_string()))?;

        Ok(())
    }

    /// Fetch an object's bytes and content type. Returns Ok(None) when
    /// the key does not exist.
    pub async fn get(&self, key: &str) -> Result<Option<(Vec<u8>, Option<String>)>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    return Ok(None);
                }
                return Err(Error::Bucket(service_err.to_string()));
            }
        };

        let content_type = output.content_type().map(str::to_string);
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Bucket(format!("Failed to read object body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(Some((data, content_type)))
    }

    /// Delete an object. Deleting an absent key is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Bucket(e.into_service_error().to_string()))?;

        Ok(())
    }

    /// Public URL for an object, when the bucket is exposed.
    pub fn object_url(&self, key: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> BucketConfig {
        BucketConfig {
            endpoint: Some("https://acct.r2.cloudflarestorage.com".into()),
            bucket: Some("files".into()),
            access_key_id: Some("key".into()),
            secret_access_key: Some("secret".into()),
            region: "auto".into(),
            public_base_url: Some("https://files.example.com/".into()),
        }
    }

    #[tokio::test]
    async fn test_from_config_requires_credentials() {
        assert!(BucketService::from_config(&BucketConfig::default())
            .await
            .is_none());
        assert!(BucketService::from_config(&full_config()).await.is_some());
    }

    #[tokio::test]
    async fn test_object_url_joins_cleanly() {
        let bucket = BucketService::from_config(&full_config()).await.unwrap();
        assert_eq!(
            bucket.object_url("abc123").as_deref(),
            Some("https://files.example.com/abc123")
        );
    }
}
