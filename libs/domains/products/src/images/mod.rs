//! Image hosting collaborator.
//!
//! The service only sees [`ImageUploader`]; production wires in
//! [`CloudinaryUploader`], tests substitute fakes.

mod cloudinary;

pub use cloudinary::{CloudinaryConfig, CloudinaryUploader};

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;

/// One file received from a multipart request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image host unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("image host rejected '{file_name}' ({status}): {message}")]
    Rejected {
        file_name: String,
        status: u16,
        message: String,
    },

    #[error("image host returned no URL for '{0}'")]
    MissingUrl(String),
}

/// Uploads images and returns their public URLs in input order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, images: Vec<ImagePayload>) -> Result<Vec<String>, UploadError>;
}
