//! Request bodies for the create/update endpoints, which accept either JSON
//! or `multipart/form-data` with image files.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum_helpers::{AppError, ValidatedJson};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::images::ImagePayload;
use crate::models::ProductFields;

pub const IMAGES_FIELD: &str = "images";
pub const EXISTING_IMAGES_FIELD: &str = "existing_images_json";

/// Either a validated JSON payload or an unread multipart body.
pub enum ProductRequest<J> {
    Json(J),
    Multipart(Multipart),
}

impl<J, S> FromRequest<S> for ProductRequest<J>
where
    J: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(ProductRequest::Multipart(multipart))
        } else {
            let ValidatedJson(payload) = ValidatedJson::<J>::from_request(req, state).await?;
            Ok(ProductRequest::Json(payload))
        }
    }
}

/// Parsed multipart product form.
#[derive(Debug)]
pub struct ProductForm {
    pub fields: ProductFields,
    /// Non-empty file parts in submission order
    pub images: Vec<ImagePayload>,
    /// Raw `existing_images_json`, `"[]"` when absent
    pub existing_images_json: String,
}

impl ProductForm {
    pub async fn read(mut multipart: Multipart) -> ProductResult<Self> {
        let mut text: HashMap<String, String> = HashMap::new();
        let mut images = Vec::new();

        while let Some(field) = multipart.next_field().await.map_err(invalid_body)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGES_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(invalid_body)?;

                // Browsers send an empty part when no file was picked.
                if file_name.is_empty() || data.is_empty() {
                    continue;
                }
                images.push(ImagePayload {
                    file_name,
                    content_type,
                    data,
                });
            } else {
                let value = field.text().await.map_err(invalid_body)?;
                text.insert(name, value);
            }
        }

        let fields = ProductFields {
            nombre: required(&text, "nombre")?,
            descripcion: optional(&text, "descripcion"),
            precio: parse(&text, "precio")?,
            sku: required(&text, "sku")?,
            stock: parse(&text, "stock")?,
            categoria_id: parse(&text, "categoria_id")?,
            material: optional(&text, "material"),
            talle: optional(&text, "talle"),
            color: optional(&text, "color"),
        };

        let existing_images_json =
            optional(&text, EXISTING_IMAGES_FIELD).unwrap_or_else(|| "[]".to_string());

        Ok(Self {
            fields,
            images,
            existing_images_json,
        })
    }
}

fn invalid_body(err: axum::extract::multipart::MultipartError) -> ProductError {
    ProductError::Validation(format!("Invalid multipart body: {}", err.body_text()))
}

fn required(text: &HashMap<String, String>, key: &str) -> ProductResult<String> {
    text.get(key)
        .cloned()
        .ok_or_else(|| ProductError::Validation(format!("Missing form field '{key}'")))
}

fn optional(text: &HashMap<String, String>, key: &str) -> Option<String> {
    text.get(key).filter(|v| !v.trim().is_empty()).cloned()
}

fn parse<T: FromStr>(text: &HashMap<String, String>, key: &str) -> ProductResult<T> {
    let raw = required(text, key)?;
    raw.trim()
        .parse()
        .map_err(|_| ProductError::Validation(format!("Invalid value for '{key}': {raw}")))
}
