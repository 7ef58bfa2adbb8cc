use serde::{Deserialize, Serialize};

use crate::models::DuplicatePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub mongodb_uri: String,
    pub mongodb_retry_writes: bool,
    pub database_name: String,
    pub http_timeout_ms: u64,
    pub http_user_agent: String,
    // Object storage (S3 or MinIO)
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: String,
    // Optional custom S3 endpoint (e.g., for MinIO: http://localhost:9000)
    pub aws_endpoint: Option<String>,
    pub aws_public_base_url: Option<String>,
    pub default_image_bucket: String,
    pub max_image_size_mb: u64,
    // Batch behaviour
    pub item_delay_ms: u64,
    pub default_category_label: String,
    pub default_subcategory_label: String,
    pub default_duplicate_policy: DuplicatePolicy,
    pub auto_migrate: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let get = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());

        let mongodb_uri = get("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string());
        let database_name = get("DATABASE_NAME").unwrap_or_else(|| "catalog".to_string());
        let mongodb_retry_writes: bool = get("MONGODB_RETRY_WRITES").and_then(|s| s.parse().ok()).unwrap_or(false);
        let port: u16 = get("PORT").and_then(|s| s.parse().ok()).unwrap_or(8089);
        let http_timeout_ms: u64 = get("HTTP_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(30000);
        let http_user_agent = get("HTTP_USER_AGENT").unwrap_or_else(|| "catalog-ingestion/1.0".to_string());

        let aws_access_key_id = get("AWS_ACCESS_KEY_ID");
        let aws_secret_access_key = get("AWS_SECRET_ACCESS_KEY");
        let aws_region = get("AWS_REGION").unwrap_or_else(|| "eu-central-1".to_string());
        let aws_endpoint = get("AWS_S3_ENDPOINT").or_else(|| get("AWS_ENDPOINT"));
        let aws_public_base_url = get("AWS_S3_PUBLIC_BASE_URL").or_else(|| get("AWS_S3_ACCESS_POINT"));
        let default_image_bucket = get("DEFAULT_IMAGE_BUCKET").unwrap_or_else(|| "catalog-assets".to_string());
        let max_image_size_mb: u64 = get("MAX_IMAGE_SIZE_MB").and_then(|s| s.parse().ok()).unwrap_or(10);

        let item_delay_ms: u64 = get("ITEM_DELAY_MS").and_then(|s| s.parse().ok()).unwrap_or(100);
        let default_category_label = get("DEFAULT_CATEGORY_LABEL").unwrap_or_else(|| "清洁能源技术".to_string());
        let default_subcategory_label = get("DEFAULT_SUBCATEGORY_LABEL").unwrap_or_else(|| "风能技术".to_string());
        let default_duplicate_policy = match get("DEFAULT_DUPLICATE_POLICY").map(|s| s.parse::<DuplicatePolicy>()) {
            Some(Ok(policy)) => policy,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Ignoring DEFAULT_DUPLICATE_POLICY");
                DuplicatePolicy::Overwrite
            }
            None => DuplicatePolicy::Overwrite,
        };
        let auto_migrate: bool = get("AUTO_MIGRATE").and_then(|s| s.parse().ok()).unwrap_or(false);

        Self {
            port,
            mongodb_uri,
            mongodb_retry_writes,
            database_name,
            http_timeout_ms,
            http_user_agent,
            aws_access_key_id,
            aws_secret_access_key,
            aws_region,
            aws_endpoint,
            aws_public_base_url,
            default_image_bucket,
            max_image_size_mb,
            item_delay_ms,
            default_category_label,
            default_subcategory_label,
            default_duplicate_policy,
            auto_migrate,
        }
    }

    pub fn max_image_bytes(&self) -> usize {
        (self.max_image_size_mb as usize).saturating_mul(1024 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8089,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_retry_writes: false,
            database_name: "catalog".to_string(),
            http_timeout_ms: 30000,
            http_user_agent: "catalog-ingestion/1.0".to_string(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "eu-central-1".to_string(),
            aws_endpoint: None,
            aws_public_base_url: None,
            default_image_bucket: "catalog-assets".to_string(),
            max_image_size_mb: 10,
            item_delay_ms: 100,
            default_category_label: "清洁能源技术".to_string(),
            default_subcategory_label: "风能技术".to_string(),
            default_duplicate_policy: DuplicatePolicy::Overwrite,
            auto_migrate: false,
        }
    }
}
