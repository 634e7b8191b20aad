//! Sea-ORM entities for the `productos` and `variantes_producto` tables.

pub mod producto;
pub mod variante;

use crate::models::{Product, Variant};

/// Stitches a product row and its variant rows into the API shape.
pub(crate) fn into_product(model: producto::Model, variants: Vec<variante::Model>) -> Product {
    let mut variantes: Vec<Variant> = variants.into_iter().map(Variant::from).collect();
    variantes.sort_by_key(|v| v.id);

    Product {
        id: model.id,
        nombre: model.nombre,
        descripcion: model.descripcion,
        precio: model.precio,
        sku: model.sku,
        stock: model.stock,
        categoria_id: model.categoria_id,
        material: model.material,
        talle: model.talle,
        color: model.color,
        // Older rows may hold a non-array value; those read back as no images.
        urls_imagenes: serde_json::from_value(model.urls_imagenes).unwrap_or_default(),
        variantes,
    }
}
