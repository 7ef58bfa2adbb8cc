use std::sync::Arc;

use image::ImageFormat as ImageLibFormat;
use sha2::{Digest, Sha256};

use crate::clients::AssetFetcher;
use crate::models::{ImageOrigin, IngestionError, Result};
use crate::processing::AssetStore;

/// Image chosen for a record and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub url: Option<String>,
    pub origin: ImageOrigin,
}

/// Image formats accepted for re-hosting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }
}

/// Checks that `data` is a decodable image of a supported format within `max_bytes`.
pub fn inspect_image(data: &[u8], max_bytes: usize) -> Result<ImageKind> {
    if data.is_empty() {
        return Err(IngestionError::Asset("Empty image payload".to_string()));
    }
    if data.len() > max_bytes {
        return Err(IngestionError::Asset(format!(
            "Image too large: {} bytes (max: {} bytes)",
            data.len(),
            max_bytes
        )));
    }

    let kind = match image::guess_format(data) {
        Ok(ImageLibFormat::Png) => ImageKind::Png,
        Ok(ImageLibFormat::Jpeg) => ImageKind::Jpeg,
        Ok(ImageLibFormat::Gif) => ImageKind::Gif,
        Ok(ImageLibFormat::WebP) => ImageKind::Webp,
        Ok(other) => return Err(IngestionError::Asset(format!("Unsupported image format: {:?}", other))),
        Err(e) => return Err(IngestionError::Asset(format!("Unrecognised image payload: {}", e))),
    };

    // Full decode rejects truncated or corrupt payloads that only have a valid header.
    let img = image::load_from_memory(data)
        .map_err(|e| IngestionError::Asset(format!("Failed to load image: {}", e)))?;
    tracing::debug!(width = img.width(), height = img.height(), format = ?kind, "Decoded image");

    Ok(kind)
}

pub fn technology_image_key(external_id: &str, kind: ImageKind) -> String {
    format!("technologies/{}.{}", external_id, kind.extension())
}

/// Content-addressed key for a generated logo.
pub fn generated_logo_key(company_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(company_name.trim().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("company-logos/generated-{}.svg", &digest[..16])
}

/// Downloads and re-hosts technology images. Every operation besides
/// `fetch_bytes` degrades to `None` instead of failing the item.
pub struct AssetPipeline {
    fetcher: Arc<dyn AssetFetcher>,
    store: Arc<dyn AssetStore>,
    max_image_bytes: usize,
}

impl AssetPipeline {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, store: Arc<dyn AssetStore>, max_image_bytes: usize) -> Self {
        Self { fetcher, store, max_image_bytes }
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.fetcher.fetch_bytes(url).await
    }

    pub async fn rehost(&self, external_id: &str, url: &str) -> Option<String> {
        match self.try_rehost(external_id, url).await {
            Ok(hosted) => {
                tracing::debug!(external_id = %external_id, source_url = %url, hosted_url = %hosted, "Re-hosted technology image");
                Some(hosted)
            }
            Err(e) => {
                tracing::warn!(external_id = %external_id, source_url = %url, error = %e, "Image re-host failed");
                None
            }
        }
    }

    async fn try_rehost(&self, external_id: &str, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| IngestionError::Asset(format!("Invalid image URL {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(IngestionError::Asset(format!("Unsupported image URL scheme: {}", parsed.scheme())));
        }
        let data = self.fetch_bytes(url).await?;
        let kind = inspect_image(&data, self.max_image_bytes)?;
        let key = technology_image_key(external_id, kind);
        self.store.put_object(&key, data, kind.content_type()).await
    }

    /// Uploads a synthesized SVG logo.
    pub async fn rehost_logo(&self, company_name: &str, svg: Vec<u8>) -> Option<String> {
        let key = generated_logo_key(company_name);
        match self.store.put_object(&key, svg, mime::IMAGE_SVG.as_ref()).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(company = %company_name, key = %key, error = %e, "Logo upload failed");
                None
            }
        }
    }

    /// Re-hosted source image, else the subcategory default, else nothing.
    pub async fn resolve_image(
        &self,
        external_id: &str,
        source_url: Option<&str>,
        default_image_url: Option<&str>,
    ) -> ResolvedImage {
        if let Some(url) = source_url.filter(|u| !u.trim().is_empty()) {
            if let Some(hosted) = self.rehost(external_id, url).await {
                return ResolvedImage { url: Some(hosted), origin: ImageOrigin::Rehosted };
            }
        }
        let fallback = default_image_url
            .filter(|u| !u.trim().is_empty())
            .map(str::to_string);
        ResolvedImage { url: fallback, origin: ImageOrigin::Fallback }
    }
}
