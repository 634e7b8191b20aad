use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Upper bound on images attached by a single create/update request.
pub const MAX_IMAGES: usize = 3;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

pub const DELETED_MESSAGE: &str = "Product deleted successfully";

/// Product as returned by the API, variants included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio: f64,
    pub sku: String,
    pub stock: i32,
    pub categoria_id: i32,
    pub material: Option<String>,
    pub talle: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub urls_imagenes: Vec<String>,
    #[serde(default)]
    pub variantes: Vec<Variant>,
}

impl Product {
    pub(crate) fn from_new(id: i32, input: NewProduct) -> Self {
        Self {
            id,
            nombre: input.nombre,
            descripcion: input.descripcion,
            precio: input.precio,
            sku: input.sku,
            stock: input.stock,
            categoria_id: input.categoria_id,
            material: input.material,
            talle: input.talle,
            color: input.color,
            urls_imagenes: input.urls_imagenes,
            variantes: Vec::new(),
        }
    }

    /// Overwrites exactly the fields present in `changes`.
    pub fn apply_changes(&mut self, changes: ProductChanges) {
        if let Some(nombre) = changes.nombre {
            self.nombre = nombre;
        }
        if let Some(descripcion) = changes.descripcion {
            self.descripcion = descripcion;
        }
        if let Some(precio) = changes.precio {
            self.precio = precio;
        }
        if let Some(sku) = changes.sku {
            self.sku = sku;
        }
        if let Some(stock) = changes.stock {
            self.stock = stock;
        }
        if let Some(categoria_id) = changes.categoria_id {
            self.categoria_id = categoria_id;
        }
        if let Some(material) = changes.material {
            self.material = material;
        }
        if let Some(talle) = changes.talle {
            self.talle = talle;
        }
        if let Some(color) = changes.color {
            self.color = color;
        }
        if let Some(urls) = changes.urls_imagenes {
            self.urls_imagenes = urls;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Variant {
    pub id: i32,
    pub producto_id: i32,
    pub tamanio: String,
    pub color: String,
    pub cantidad_en_stock: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateVariant {
    #[validate(length(min = 1))]
    pub tamanio: String,
    #[validate(length(min = 1))]
    pub color: String,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub cantidad_en_stock: i32,
}

/// Scalar product fields as submitted through a multipart form.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ProductFields {
    #[validate(length(min = 1, message = "nombre must not be empty"))]
    pub nombre: String,
    pub descripcion: Option<String>,
    #[validate(
        range(min = 0.0, message = "precio must be zero or positive"),
        custom(function = "finite_price")
    )]
    pub precio: f64,
    #[validate(length(min = 1, message = "sku must not be empty"))]
    pub sku: String,
    #[validate(range(min = 0, message = "stock must be zero or positive"))]
    pub stock: i32,
    pub categoria_id: i32,
    pub material: Option<String>,
    pub talle: Option<String>,
    pub color: Option<String>,
}

impl ProductFields {
    pub fn with_images(self, urls_imagenes: Vec<String>) -> NewProduct {
        NewProduct {
            nombre: self.nombre,
            descripcion: self.descripcion,
            precio: self.precio,
            sku: self.sku,
            stock: self.stock,
            categoria_id: self.categoria_id,
            material: self.material,
            talle: self.talle,
            color: self.color,
            urls_imagenes,
        }
    }
}

/// Multipart form accepted by `POST /` and `PUT /{id}`. Documentation only;
/// the handler reads the parts itself.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ProductUploadForm {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio: f64,
    pub sku: String,
    pub stock: i32,
    pub categoria_id: i32,
    pub material: Option<String>,
    pub talle: Option<String>,
    pub color: Option<String>,
    /// Up to three image files
    #[schema(value_type = Vec<String>, format = Binary)]
    pub images: Vec<Vec<u8>>,
    /// Update only: JSON array of URLs to keep, defaults to `[]`
    pub existing_images_json: Option<String>,
}

/// JSON create payload.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1))]
    pub nombre: String,
    pub descripcion: Option<String>,
    #[validate(range(min = 0.0), custom(function = "finite_price"))]
    pub precio: f64,
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub stock: i32,
    pub categoria_id: i32,
    pub material: Option<String>,
    pub talle: Option<String>,
    pub color: Option<String>,
    /// A single URL or a list of URLs
    #[validate(length(max = 3, message = "Se pueden subir como máximo 3 imágenes."))]
    #[serde(default, deserialize_with = "url_list")]
    #[schema(value_type = Vec<String>)]
    pub urls_imagenes: Vec<String>,
}

impl From<CreateProduct> for NewProduct {
    fn from(input: CreateProduct) -> Self {
        Self {
            nombre: input.nombre,
            descripcion: input.descripcion,
            precio: input.precio,
            sku: input.sku,
            stock: input.stock,
            categoria_id: input.categoria_id,
            material: input.material,
            talle: input.talle,
            color: input.color,
            urls_imagenes: input.urls_imagenes,
        }
    }
}

/// JSON partial update. Absent fields are left untouched; an explicit `null`
/// clears the nullable text fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1))]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub descripcion: Option<Option<String>>,
    #[validate(range(min = 0.0), custom(function = "finite_price"))]
    pub precio: Option<f64>,
    #[validate(length(min = 1))]
    pub sku: Option<String>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub categoria_id: Option<i32>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub material: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub talle: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub color: Option<Option<String>>,
    #[validate(length(max = 3, message = "Se pueden subir como máximo 3 imágenes."))]
    #[serde(default, deserialize_with = "optional_url_list")]
    #[schema(value_type = Option<Vec<String>>)]
    pub urls_imagenes: Option<Vec<String>>,
}

/// Input to [`crate::ProductRepository::insert`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio: f64,
    pub sku: String,
    pub stock: i32,
    pub categoria_id: i32,
    pub material: Option<String>,
    pub talle: Option<String>,
    pub color: Option<String>,
    pub urls_imagenes: Vec<String>,
}

/// Store-level partial update; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub nombre: Option<String>,
    pub descripcion: Option<Option<String>>,
    pub precio: Option<f64>,
    pub sku: Option<String>,
    pub stock: Option<i32>,
    pub categoria_id: Option<i32>,
    pub material: Option<Option<String>>,
    pub talle: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub urls_imagenes: Option<Vec<String>>,
}

impl ProductChanges {
    /// Every column set: the multipart update replaces the whole product.
    pub fn replace_all(fields: ProductFields, urls_imagenes: Vec<String>) -> Self {
        Self {
            nombre: Some(fields.nombre),
            descripcion: Some(fields.descripcion),
            precio: Some(fields.precio),
            sku: Some(fields.sku),
            stock: Some(fields.stock),
            categoria_id: Some(fields.categoria_id),
            material: Some(fields.material),
            talle: Some(fields.talle),
            color: Some(fields.color),
            urls_imagenes: Some(urls_imagenes),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<UpdateProduct> for ProductChanges {
    fn from(input: UpdateProduct) -> Self {
        Self {
            nombre: input.nombre,
            descripcion: input.descripcion,
            precio: input.precio,
            sku: input.sku,
            stock: input.stock,
            categoria_id: input.categoria_id,
            material: input.material,
            talle: input.talle,
            color: input.color,
            urls_imagenes: input.urls_imagenes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ProductSort {
    PrecioAsc,
    PrecioDesc,
    NombreAsc,
    NombreDesc,
}

impl ProductSort {
    /// Unknown keys yield `None`, meaning store order.
    pub fn parse(key: &str) -> Option<Self> {
        key.parse().ok()
    }
}

/// Query string of `GET /`.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    /// Case-insensitive substring match
    pub material: Option<String>,
    /// Maximum price, inclusive
    #[serde(rename = "precio", alias = "precio_max")]
    pub precio_max: Option<f64>,
    pub categoria_id: Option<i32>,
    /// Case-insensitive substring match
    pub talle: Option<String>,
    /// Case-insensitive substring match
    pub color: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    #[param(minimum = 0, default = 0)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    #[param(minimum = 1, maximum = 100, default = 10)]
    pub limit: i64,
    /// One of `precio_asc`, `precio_desc`, `nombre_asc`, `nombre_desc`
    pub sort_by: Option<String>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            material: None,
            precio_max: None,
            categoria_id: None,
            talle: None,
            color: None,
            skip: 0,
            limit: DEFAULT_LIMIT,
            sort_by: None,
        }
    }
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Normalised list criteria handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub material: Option<String>,
    pub precio_max: Option<f64>,
    pub categoria_id: Option<i32>,
    pub talle: Option<String>,
    pub color: Option<String>,
    pub sort: Option<ProductSort>,
    pub skip: u64,
    pub limit: u64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductQuery::default().into()
    }
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        Self {
            material: non_blank(query.material),
            precio_max: query.precio_max,
            categoria_id: query.categoria_id,
            talle: non_blank(query.talle),
            color: non_blank(query.color),
            sort: query.sort_by.as_deref().and_then(ProductSort::parse),
            skip: query.skip.max(0) as u64,
            limit: query.limit.clamp(1, MAX_LIMIT) as u64,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeleteConfirmation {
    pub message: String,
}

impl Default for DeleteConfirmation {
    fn default() -> Self {
        Self {
            message: DELETED_MESSAGE.to_string(),
        }
    }
}

/// `range` lets NaN through and accepts infinity.
fn finite_price(precio: f64) -> Result<(), ValidationError> {
    if precio.is_finite() {
        return Ok(());
    }
    let mut error = ValidationError::new("finite");
    error.message = Some("precio must be a finite number".into());
    Err(error)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn url_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(url)) if url.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(url)) => vec![url],
        Some(OneOrMany::Many(urls)) => urls,
    })
}

fn optional_url_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    url_list(deserializer).map(Some)
}

fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
