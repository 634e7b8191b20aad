use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_required};
use futures::future::try_join_all;
use mime::Mime;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{ImagePayload, ImageUploader, UploadError};

pub const DEFAULT_API_URL: &str = "https://api.cloudinary.com/v1_1";

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: Option<String>,
    pub api_url: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("folder", &self.folder)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl FromEnv for CloudinaryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: env_required("CLOUDINARY_CLOUD_NAME")?,
            api_key: env_required("CLOUDINARY_API_KEY")?,
            api_secret: env_required("CLOUDINARY_API_SECRET")?,
            folder: env_optional("CLOUDINARY_FOLDER"),
            api_url: env_or_default("CLOUDINARY_API_URL", DEFAULT_API_URL),
        })
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Signed uploads to the Cloudinary REST API.
#[derive(Debug, Clone)]
pub struct CloudinaryUploader {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryUploader {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.config.api_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    /// Parameters that take part in the signature, sorted by key.
    fn signed_params(&self, timestamp: i64) -> Vec<(&'static str, String)> {
        let mut params = vec![("timestamp", timestamp.to_string())];
        if let Some(folder) = &self.config.folder {
            params.push(("folder", folder.clone()));
        }
        params.sort_by_key(|(key, _)| *key);
        params
    }

    async fn upload_one(&self, image: ImagePayload) -> Result<String, UploadError> {
        let params = self.signed_params(chrono::Utc::now().timestamp());
        let signature = sign(&params, &self.config.api_secret);

        let mut file = Part::bytes(image.data.to_vec()).file_name(image.file_name.clone());
        if let Some(mime) = part_mime(&image) {
            file = file.mime_str(mime.as_ref())?;
        }

        let mut form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }
        let form = form.part("file", file);

        tracing::debug!(file_name = %image.file_name, bytes = image.data.len(), "Uploading image");

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(UploadError::Rejected {
                file_name: image.file_name,
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<UploadResponse>()
            .await?
            .secure_url
            .ok_or(UploadError::MissingUrl(image.file_name))
    }
}

#[async_trait]
impl ImageUploader for CloudinaryUploader {
    async fn upload(&self, images: Vec<ImagePayload>) -> Result<Vec<String>, UploadError> {
        let count = images.len();
        let urls = try_join_all(images.into_iter().map(|image| self.upload_one(image))).await?;
        tracing::info!(count, "Uploaded images");
        Ok(urls)
    }
}

/// Content type the client sent for the file, dropped when it does not parse.
fn part_mime(image: &ImagePayload) -> Option<Mime> {
    let raw = image.content_type.as_deref()?;
    raw.parse()
        .inspect_err(|e: &mime::FromStrError| {
            tracing::debug!(
                file_name = %image.file_name,
                content_type = raw,
                error = %e,
                "Ignoring invalid content type"
            );
        })
        .ok()
}

/// `sha256("k1=v1&k2=v2" + secret)`, hex encoded.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let payload = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(folder: Option<&str>) -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            folder: folder.map(str::to_string),
            api_url: format!("{DEFAULT_API_URL}/"),
        }
    }

    #[test]
    fn test_upload_url() {
        let uploader = CloudinaryUploader::new(config(None));
        assert_eq!(
            uploader.upload_url(),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn test_signed_params_are_sorted() {
        let uploader = CloudinaryUploader::new(config(Some("catalogo")));
        let params = uploader.signed_params(1_700_000_000);
        assert_eq!(
            params,
            vec![
                ("folder", "catalogo".to_string()),
                ("timestamp", "1700000000".to_string())
            ]
        );
    }

    #[test]
    fn test_sign() {
        let uploader = CloudinaryUploader::new(config(Some("catalogo")));
        let params = uploader.signed_params(1_700_000_000);
        assert_eq!(
            sign(&params, "secret"),
            "02fa740caec8d155296e2866d78b6073b45b295d661940183070c05eabbf213d"
        );

        let uploader = CloudinaryUploader::new(config(None));
        let params = uploader.signed_params(1_700_000_000);
        assert_eq!(
            sign(&params, "secret"),
            "899037359ccfa6a61dabc0d9fbdd808ed945046e5d6451ab46bde7d4677d53b4"
        );
    }

    #[test]
    fn test_part_mime_ignores_invalid_content_type() {
        let image = |content_type: Option<&str>| ImagePayload {
            file_name: "a.png".into(),
            content_type: content_type.map(str::to_string),
            data: axum::body::Bytes::from_static(b"png"),
        };

        assert_eq!(part_mime(&image(Some("image/png"))), Some(mime::IMAGE_PNG));
        assert_eq!(part_mime(&image(Some("not a mime"))), None);
        assert_eq!(part_mime(&image(None)), None);
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("CLOUDINARY_CLOUD_NAME", Some("demo")),
                ("CLOUDINARY_API_KEY", Some("key")),
                ("CLOUDINARY_API_SECRET", Some("secret")),
                ("CLOUDINARY_FOLDER", Some("")),
                ("CLOUDINARY_API_URL", None),
            ],
            || {
                let config = CloudinaryConfig::from_env().unwrap();
                assert_eq!(config.cloud_name, "demo");
                assert_eq!(config.folder, None);
                assert_eq!(config.api_url, DEFAULT_API_URL);
                assert!(!format!("{config:?}").contains("secret"));
            },
        );
    }

    #[test]
    fn test_config_requires_credentials() {
        temp_env::with_vars(
            [
                ("CLOUDINARY_CLOUD_NAME", Some("demo")),
                ("CLOUDINARY_API_KEY", None::<&str>),
                ("CLOUDINARY_API_SECRET", Some("secret")),
            ],
            || {
                let err = CloudinaryConfig::from_env().unwrap_err();
                assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "CLOUDINARY_API_KEY"));
            },
        );
    }
}
