//! Product Service - Business logic layer

use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::authz::{Actor, Capability, authorize};
use crate::error::{ProductError, ProductResult};
use crate::images::{ImagePayload, ImageUploader};
use crate::models::{
    CreateProduct, CreateVariant, DeleteConfirmation, MAX_IMAGES, NewProduct, Product,
    ProductChanges, ProductFields, ProductFilter, ProductQuery, UpdateProduct, Variant,
};
use crate::repository::ProductRepository;

/// Orchestrates authorization, image uploads and persistence for the catalog.
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
    uploader: Arc<dyn ImageUploader>,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repository: R, uploader: Arc<dyn ImageUploader>) -> Self {
        Self {
            repository: Arc::new(repository),
            uploader,
        }
    }

    /// List products matching the query
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: ProductQuery) -> ProductResult<Vec<Product>> {
        query
            .validate()
            .map_err(|e| ProductError::InvalidQuery(e.to_string()))?;

        self.repository.list(&ProductFilter::from(query)).await
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i32) -> ProductResult<Product> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Multipart create: uploads `images` and stores their URLs on the new product.
    #[instrument(skip(self, actor, fields, images), fields(actor_id = %actor.id, sku = %fields.sku, images = images.len()))]
    pub async fn create_product_with_images(
        &self,
        actor: &Actor,
        fields: ProductFields,
        images: Vec<ImagePayload>,
    ) -> ProductResult<Product> {
        authorize(actor, Capability::ManageCatalog)?;
        ensure_image_count(&images)?;
        fields.validate()?;

        let urls = self.upload_images(images).await?;
        self.ensure_sku_available(&fields.sku).await?;

        self.insert_and_reload(fields.with_images(urls)).await
    }

    /// Multipart update: replaces every scalar field and appends new uploads
    /// to the URLs the client chose to keep.
    #[instrument(skip(self, actor, fields, images, previous_urls_json), fields(actor_id = %actor.id, images = images.len()))]
    pub async fn update_product_with_images(
        &self,
        actor: &Actor,
        id: i32,
        fields: ProductFields,
        images: Vec<ImagePayload>,
        previous_urls_json: &str,
    ) -> ProductResult<Product> {
        authorize(actor, Capability::ManageCatalog)?;
        let existing = self.get_product(id).await?;
        ensure_image_count(&images)?;
        fields.validate()?;

        let new_urls = self.upload_images(images).await?;
        let mut urls: Vec<String> = serde_json::from_str(previous_urls_json).map_err(|e| {
            ProductError::Validation(format!("existing_images_json must be a JSON list of URLs: {e}"))
        })?;
        urls.extend(new_urls);

        if fields.sku != existing.sku {
            self.ensure_sku_available(&fields.sku).await?;
        }

        self.update_and_reload(id, ProductChanges::replace_all(fields, urls))
            .await
    }

    /// JSON create, no uploads.
    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id, sku = %input.sku))]
    pub async fn create_product(
        &self,
        actor: &Actor,
        input: CreateProduct,
    ) -> ProductResult<Product> {
        authorize(actor, Capability::ManageCatalog)?;
        input.validate()?;
        self.ensure_sku_available(&input.sku).await?;

        self.insert_and_reload(NewProduct::from(input)).await
    }

    /// JSON partial update: only fields present in `input` change.
    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn update_product(
        &self,
        actor: &Actor,
        id: i32,
        input: UpdateProduct,
    ) -> ProductResult<Product> {
        authorize(actor, Capability::ManageCatalog)?;
        input.validate()?;
        let existing = self.get_product(id).await?;

        if let Some(sku) = &input.sku
            && *sku != existing.sku
        {
            self.ensure_sku_available(sku).await?;
        }

        let changes = ProductChanges::from(input);
        if changes.is_empty() {
            return Ok(existing);
        }
        self.update_and_reload(id, changes).await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_product(
        &self,
        actor: &Actor,
        id: i32,
    ) -> ProductResult<DeleteConfirmation> {
        authorize(actor, Capability::ManageCatalog)?;
        self.repository.delete(id).await?;
        Ok(DeleteConfirmation::default())
    }

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn add_variant(
        &self,
        actor: &Actor,
        product_id: i32,
        input: CreateVariant,
    ) -> ProductResult<Variant> {
        authorize(actor, Capability::ManageCatalog)?;
        input.validate()?;
        self.repository.insert_variant(product_id, input).await
    }

    async fn upload_images(&self, images: Vec<ImagePayload>) -> ProductResult<Vec<String>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.uploader.upload(images).await?)
    }

    async fn ensure_sku_available(&self, sku: &str) -> ProductResult<()> {
        if self.repository.exists_by_sku(sku).await? {
            return Err(ProductError::DuplicateSku(sku.to_string()));
        }
        Ok(())
    }

    /// Re-reads after the write so the response carries loaded variants.
    async fn insert_and_reload(&self, product: NewProduct) -> ProductResult<Product> {
        let created = self.repository.insert(product).await?;
        self.get_product(created.id).await
    }

    async fn update_and_reload(&self, id: i32, changes: ProductChanges) -> ProductResult<Product> {
        self.repository.update(id, changes).await?;
        self.get_product(id).await
    }
}

fn ensure_image_count(images: &[ImagePayload]) -> ProductResult<()> {
    if images.len() > MAX_IMAGES {
        return Err(ProductError::TooManyImages { max: MAX_IMAGES });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::{MockImageUploader, UploadError};
    use crate::repository::{InMemoryProductRepository, MockProductRepository};
    use axum::body::Bytes;
    use mockall::predicate::eq;

    fn admin() -> Actor {
        Actor::new("admin-1", "admin@example.com", vec!["admin".into()])
    }

    fn customer() -> Actor {
        Actor::new("user-1", "user@example.com", vec!["user".into()])
    }

    fn fields(sku: &str) -> ProductFields {
        ProductFields {
            nombre: "Remera".into(),
            descripcion: None,
            precio: 10.0,
            sku: sku.into(),
            stock: 5,
            categoria_id: 1,
            material: Some("algodón".into()),
            talle: Some("M".into()),
            color: None,
        }
    }

    fn image(name: &str) -> ImagePayload {
        ImagePayload {
            file_name: name.into(),
            content_type: Some("image/png".into()),
            data: Bytes::from_static(b"png"),
        }
    }

    fn create_input(sku: &str) -> CreateProduct {
        CreateProduct {
            nombre: "Remera".into(),
            descripcion: None,
            precio: 10.0,
            sku: sku.into(),
            stock: 5,
            categoria_id: 1,
            material: None,
            talle: None,
            color: None,
            urls_imagenes: vec![],
        }
    }

    /// Uploader that must never be called.
    fn no_uploads() -> Arc<dyn ImageUploader> {
        let mut uploader = MockImageUploader::new();
        uploader.expect_upload().never();
        Arc::new(uploader)
    }

    /// Uploader that maps each file name to `https://cdn.test/<name>`.
    fn echo_uploads() -> Arc<dyn ImageUploader> {
        let mut uploader = MockImageUploader::new();
        uploader.expect_upload().returning(|images| {
            Ok(images
                .into_iter()
                .map(|i| format!("https://cdn.test/{}", i.file_name))
                .collect())
        });
        Arc::new(uploader)
    }

    #[tokio::test]
    async fn test_create_with_images_stores_uploaded_urls() {
        let service = ProductService::new(InMemoryProductRepository::new(), echo_uploads());

        let product = service
            .create_product_with_images(&admin(), fields("SKU-1"), vec![image("a.png"), image("b.png")])
            .await
            .unwrap();

        assert_eq!(
            product.urls_imagenes,
            vec!["https://cdn.test/a.png", "https://cdn.test/b.png"]
        );
        assert!(product.variantes.is_empty());
    }

    #[tokio::test]
    async fn test_create_without_images_skips_uploader() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());

        let product = service
            .create_product_with_images(&admin(), fields("SKU-1"), vec![])
            .await
            .unwrap();

        assert!(product.urls_imagenes.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_non_admin_before_anything_else() {
        let mut repo = MockProductRepository::new();
        repo.expect_exists_by_sku().never();
        repo.expect_insert().never();
        let service = ProductService::new(repo, no_uploads());

        let err = service
            .create_product_with_images(&customer(), fields("SKU-1"), vec![image("a.png")])
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_more_than_three_images() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());
        let images = (0..4).map(|i| image(&format!("{i}.png"))).collect();

        let err = service
            .create_product_with_images(&admin(), fields("SKU-1"), images)
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::TooManyImages { max: 3 }));
    }

    #[tokio::test]
    async fn test_create_duplicate_sku_is_conflict() {
        let mut repo = MockProductRepository::new();
        repo.expect_exists_by_sku()
            .with(eq("SKU-DUP"))
            .returning(|_| Ok(true));
        repo.expect_insert().never();
        let service = ProductService::new(repo, no_uploads());

        let err = service
            .create_product_with_images(&admin(), fields("SKU-DUP"), vec![])
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::DuplicateSku(sku) if sku == "SKU-DUP"));
    }

    #[tokio::test]
    async fn test_create_propagates_upload_failure() {
        let mut uploader = MockImageUploader::new();
        uploader
            .expect_upload()
            .returning(|_| Err(UploadError::MissingUrl("a.png".into())));
        let mut repo = MockProductRepository::new();
        repo.expect_insert().never();
        let service = ProductService::new(repo, Arc::new(uploader));

        let err = service
            .create_product_with_images(&admin(), fields("SKU-1"), vec![image("a.png")])
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::Upload(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_fields() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());
        let mut invalid = fields("SKU-1");
        invalid.precio = -5.0;

        let err = service
            .create_product_with_images(&admin(), invalid, vec![])
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_with_images_appends_to_kept_urls() {
        let service = ProductService::new(InMemoryProductRepository::new(), echo_uploads());
        let created = service
            .create_product_with_images(&admin(), fields("SKU-1"), vec![image("a.png"), image("b.png")])
            .await
            .unwrap();

        let mut replacement = fields("SKU-1");
        replacement.nombre = "Remera Oversize".into();
        replacement.material = None;

        let updated = service
            .update_product_with_images(
                &admin(),
                created.id,
                replacement,
                vec![image("c.png"), image("d.png"), image("e.png")],
                r#"["https://cdn.test/b.png", "https://cdn.test/a.png"]"#,
            )
            .await
            .unwrap();

        assert_eq!(updated.nombre, "Remera Oversize");
        assert_eq!(updated.material, None);
        // Merged list is not capped.
        assert_eq!(
            updated.urls_imagenes,
            vec![
                "https://cdn.test/b.png",
                "https://cdn.test/a.png",
                "https://cdn.test/c.png",
                "https://cdn.test/d.png",
                "https://cdn.test/e.png",
            ]
        );
    }

    #[tokio::test]
    async fn test_update_with_images_rejects_malformed_json() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());
        let created = service
            .create_product(&admin(), create_input("SKU-1"))
            .await
            .unwrap();

        let err = service
            .update_product_with_images(&admin(), created.id, fields("SKU-1"), vec![], "not json")
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_with_images_missing_product() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());

        let err = service
            .update_product_with_images(&admin(), 99, fields("SKU-1"), vec![], "[]")
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::NotFound(99)));
    }

    #[tokio::test]
    async fn test_update_with_images_rejects_sku_of_other_product() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());
        service
            .create_product(&admin(), create_input("SKU-A"))
            .await
            .unwrap();
        let b = service
            .create_product(&admin(), create_input("SKU-B"))
            .await
            .unwrap();

        let err = service
            .update_product_with_images(&admin(), b.id, fields("SKU-A"), vec![], "[]")
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::DuplicateSku(_)));
    }

    #[tokio::test]
    async fn test_json_create_then_partial_update() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());
        let created = service
            .create_product(&admin(), create_input("SKU-1"))
            .await
            .unwrap();

        let updated = service
            .update_product(
                &admin(),
                created.id,
                UpdateProduct {
                    precio: Some(15.99),
                    stock: Some(75),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.precio, 15.99);
        assert_eq!(updated.stock, 75);
        assert_eq!(updated.sku, "SKU-1");
        assert_eq!(updated.nombre, created.nombre);
    }

    #[tokio::test]
    async fn test_json_update_with_no_fields_returns_existing() {
        let mut repo = MockProductRepository::new();
        let existing = Product::from_new(7, NewProduct::from(create_input("SKU-7")));
        let returned = existing.clone();
        repo.expect_get_by_id()
            .with(eq(7))
            .returning(move |_| Ok(Some(returned.clone())));
        repo.expect_update().never();
        let service = ProductService::new(repo, no_uploads());

        let product = service
            .update_product(&admin(), 7, UpdateProduct::default())
            .await
            .unwrap();

        assert_eq!(product, existing);
    }

    #[tokio::test]
    async fn test_json_create_duplicate_sku() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());
        service
            .create_product(&admin(), create_input("SKU-DUP"))
            .await
            .unwrap();

        let err = service
            .create_product(&admin(), create_input("SKU-DUP"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::DuplicateSku(_)));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());
        let created = service
            .create_product(&admin(), create_input("SKU-1"))
            .await
            .unwrap();

        let confirmation = service.delete_product(&admin(), created.id).await.unwrap();
        assert_eq!(confirmation.message, "Product deleted successfully");

        let err = service.get_product(created.id).await.unwrap_err();
        assert!(matches!(err, ProductError::NotFound(_)));

        let err = service.delete_product(&admin(), created.id).await.unwrap_err();
        assert!(matches!(err, ProductError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let mut repo = MockProductRepository::new();
        repo.expect_delete().never();
        let service = ProductService::new(repo, no_uploads());

        let err = service.delete_product(&customer(), 1).await.unwrap_err();
        assert!(matches!(err, ProductError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_add_variant_shows_up_on_product() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());
        let created = service
            .create_product(&admin(), create_input("SKU-1"))
            .await
            .unwrap();

        let variant = service
            .add_variant(
                &admin(),
                created.id,
                CreateVariant {
                    tamanio: "L".into(),
                    color: "azul".into(),
                    cantidad_en_stock: 3,
                },
            )
            .await
            .unwrap();

        assert_eq!(variant.producto_id, created.id);
        let product = service.get_product(created.id).await.unwrap();
        assert_eq!(product.variantes, vec![variant]);
    }

    #[tokio::test]
    async fn test_add_variant_to_missing_product() {
        let service = ProductService::new(InMemoryProductRepository::new(), no_uploads());

        let err = service
            .add_variant(
                &admin(),
                5,
                CreateVariant {
                    tamanio: "L".into(),
                    color: "azul".into(),
                    cantidad_en_stock: 0,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::NotFound(5)));
    }

    #[tokio::test]
    async fn test_list_rejects_out_of_range_limit() {
        let mut repo = MockProductRepository::new();
        repo.expect_list().never();
        let service = ProductService::new(repo, no_uploads());

        let err = service
            .list_products(ProductQuery {
                limit: 500,
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_list_passes_normalised_filter() {
        let mut repo = MockProductRepository::new();
        repo.expect_list()
            .withf(|filter| {
                filter.material.is_none()
                    && filter.color.as_deref() == Some("rojo")
                    && filter.sort.is_none()
                    && filter.skip == 2
                    && filter.limit == 5
            })
            .returning(|_| Ok(vec![]));
        let service = ProductService::new(repo, no_uploads());

        let products = service
            .list_products(ProductQuery {
                material: Some(String::new()),
                color: Some("rojo".into()),
                sort_by: Some("unknown".into()),
                skip: 2,
                limit: 5,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(products.is_empty());
    }
}
