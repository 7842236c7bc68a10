//! Remote asset host access.
//!
//! Product images live on a hosted CDN (Cloudinary). The services only see
//! the [`AssetStore`] seam: `upload` returns a public URL plus an opaque
//! asset id, and `delete` removes a previously uploaded asset. Delete
//! failures are tolerated by callers (logged, not retried, never rolled
//! back), so implementations should report them honestly rather than hide
//! them.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::Value;
use sha1::{Digest, Sha1};
use tracing::instrument;

use crate::config::CloudinaryConfig;

/// Errors surfaced by an asset host backend.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("{0}")]
    Rejected(String),
}

/// A successfully uploaded asset.
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    /// Public URL serving the asset.
    pub url: String,
    /// Provider-side identifier used for later deletion.
    pub asset_id: String,
}

/// An image file received from an admin upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

/// Seam over the remote asset host.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload one image, returning its public URL and asset id.
    async fn upload(&self, image: ImageUpload) -> Result<UploadedAsset, AssetError>;

    /// Delete a previously uploaded asset. Deleting an unknown asset is ok.
    async fn delete(&self, asset_id: &str) -> Result<(), AssetError>;
}

/// Cloudinary REST backend.
pub struct CloudinaryStore {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: secrecy::SecretString,
}

impl CloudinaryStore {
    #[must_use]
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{action}",
            self.cloud_name
        )
    }

    fn sign(&self, params: &[(&str, &str)]) -> String {
        sign_params(params, self.api_secret.expose_secret())
    }

    async fn read_response(response: reqwest::Response) -> Result<Value, AssetError> {
        let ok = response.status().is_success();
        let payload: Value = response.json().await?;

        if ok {
            return Ok(payload);
        }

        let message = payload
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("No se pudo procesar la imagen.")
            .to_owned();
        Err(AssetError::Rejected(message))
    }
}

#[async_trait]
impl AssetStore for CloudinaryStore {
    #[instrument(skip(self, image), fields(file_name = %image.file_name))]
    async fn upload(&self, image: ImageUpload) -> Result<UploadedAsset, AssetError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let public_id = format!("products/{}-{}", timestamp, uuid::Uuid::new_v4());
        let signature = self.sign(&[("public_id", &public_id), ("timestamp", &timestamp)]);

        let part = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("public_id", public_id)
            .text("signature", signature);

        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let payload = Self::read_response(response).await?;

        let url = payload
            .get("secure_url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let asset_id = payload
            .get("public_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        if url.is_empty() || asset_id.is_empty() {
            return Err(AssetError::Rejected(
                "El proveedor no devolvio una imagen valida.".to_owned(),
            ));
        }

        Ok(UploadedAsset { url, asset_id })
    }

    #[instrument(skip(self))]
    async fn delete(&self, asset_id: &str) -> Result<(), AssetError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", asset_id), ("timestamp", &timestamp)]);

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&[
                ("api_key", self.api_key.as_str()),
                ("public_id", asset_id),
                ("signature", &signature),
                ("timestamp", &timestamp),
            ])
            .send()
            .await?;
        let payload = Self::read_response(response).await?;

        match payload.get("result").and_then(Value::as_str) {
            Some("ok" | "not found") => Ok(()),
            _ => Err(AssetError::Rejected(
                "No se pudo eliminar la imagen.".to_owned(),
            )),
        }
    }
}

/// No-op backend for tests and local development without a CDN account.
///
/// Uploads fabricate deterministic URLs; deletes always succeed.
#[derive(Debug, Default)]
pub struct NullAssetStore;

#[async_trait]
impl AssetStore for NullAssetStore {
    async fn upload(&self, image: ImageUpload) -> Result<UploadedAsset, AssetError> {
        let asset_id = format!("local/{}", uuid::Uuid::new_v4());
        Ok(UploadedAsset {
            url: format!("https://assets.invalid/{asset_id}/{}", image.file_name),
            asset_id,
        })
    }

    async fn delete(&self, _asset_id: &str) -> Result<(), AssetError> {
        Ok(())
    }
}

/// Signature over the sorted `key=value` pairs plus the API secret, as
/// required by the provider's signed-request scheme.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut pairs: Vec<&(&str, &str)> = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    pairs.sort_by_key(|(key, _)| *key);

    let payload = pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sorts_and_skips_empty_params() {
        let signed = sign_params(
            &[("timestamp", "100"), ("public_id", "products/x"), ("tags", "")],
            "secret",
        );
        // sha1("public_id=products/x&timestamp=100secret")
        let mut hasher = Sha1::new();
        hasher.update(b"public_id=products/x&timestamp=100secret");
        assert_eq!(signed, hex::encode(hasher.finalize()));
    }

    #[tokio::test]
    async fn null_store_round_trip() {
        let store = NullAssetStore;
        let uploaded = store
            .upload(ImageUpload {
                bytes: vec![1, 2, 3],
                content_type: "image/png".to_owned(),
                file_name: "cover.png".to_owned(),
            })
            .await
            .unwrap();
        assert!(uploaded.url.contains(&uploaded.asset_id));
        store.delete(&uploaded.asset_id).await.unwrap();
    }
}
