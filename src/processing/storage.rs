use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{primitives::ByteStream, types::ObjectCannedAcl, Client as S3Client};

use crate::config::Config;
use crate::models::{IngestionError, Result};

/// Object storage for re-hosted images and generated logos.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Stores `data` at `key` and returns its public URL.
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String>;
}

/// S3-compatible object storage (AWS or MinIO).
pub struct S3AssetStore {
    client: S3Client,
    bucket: String,
    region: String,
    public_base_url: Option<String>,
    endpoint: Option<String>,
}

impl S3AssetStore {
    pub async fn new(config: &Config) -> Result<Self> {
        let base_loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()));

        let loader = if let (Some(access_key), Some(secret_key)) =
            (&config.aws_access_key_id, &config.aws_secret_access_key)
        {
            let creds = aws_sdk_s3::config::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "catalog-ingestion",
            );
            base_loader.credentials_provider(creds)
        } else {
            base_loader
        };

        let shared_config = loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = &config.aws_endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }
        let client = S3Client::from_conf(s3_config_builder.build());

        Ok(Self {
            client,
            bucket: config.default_image_bucket.clone(),
            region: config.aws_region.clone(),
            public_base_url: config.aws_public_base_url.clone(),
            endpoint: config.aws_endpoint.clone(),
        })
    }

    pub fn public_url(&self, key: &str) -> String {
        public_url(
            self.public_base_url.as_deref(),
            self.endpoint.as_deref(),
            &self.bucket,
            &self.region,
            key,
        )
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        let size_bytes = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "Failed to upload object to S3");
                IngestionError::Storage(format!("S3 upload failed: {}", e))
            })?;

        let url = self.public_url(key);
        tracing::debug!(bucket = %self.bucket, key = %key, public_url = %url, size_bytes, "Uploaded object to S3");
        Ok(url)
    }
}

/// Public URL for an object: explicit base URL (access point) first, then the
/// custom endpoint in path style, then the AWS virtual-host form.
pub fn public_url(
    public_base_url: Option<&str>,
    endpoint: Option<&str>,
    bucket: &str,
    region: &str,
    key: &str,
) -> String {
    if let Some(base) = public_base_url {
        let base = base.trim_end_matches('/');
        let sep = if base.ends_with('=') || base.contains('?') { "" } else { "/" };
        return format!("{}{}{}", base, sep, key);
    }
    if let Some(endpoint) = endpoint {
        return format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key);
    }
    if region == "us-east-1" {
        format!("https://{}.s3.amazonaws.com/{}", bucket, key)
    } else {
        format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Process-local object store for tests and dry runs.
#[derive(Default)]
pub struct MemoryAssetStore {
    base_url: String,
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryAssetStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| IngestionError::Storage("asset store lock poisoned".to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject { data, content_type: content_type.to_string() },
        );
        Ok(format!("{}/{}", self.base_url, key))
    }
}
