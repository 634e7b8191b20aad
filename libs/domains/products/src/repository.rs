use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    CreateVariant, NewProduct, Product, ProductChanges, ProductFilter, ProductSort, Variant,
};

/// Persistence contract for products and their variants.
///
/// Mutating methods are atomic: on error nothing is persisted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Filtered, sorted page of products with variants loaded
    async fn list(&self, filter: &ProductFilter) -> ProductResult<Vec<Product>>;

    async fn get_by_id(&self, id: i32) -> ProductResult<Option<Product>>;

    async fn exists_by_sku(&self, sku: &str) -> ProductResult<bool>;

    /// Fails with `DuplicateSku` if the SKU is taken
    async fn insert(&self, product: NewProduct) -> ProductResult<Product>;

    /// Applies `changes` to an existing product
    async fn update(&self, id: i32, changes: ProductChanges) -> ProductResult<Product>;

    /// Removes the product and all its variants
    async fn delete(&self, id: i32) -> ProductResult<()>;

    async fn insert_variant(
        &self,
        product_id: i32,
        variant: CreateVariant,
    ) -> ProductResult<Variant>;
}

#[derive(Debug, Default)]
struct Store {
    products: BTreeMap<i32, Product>,
    variants: BTreeMap<i32, Variant>,
    last_product_id: i32,
    last_variant_id: i32,
}

impl Store {
    fn sku_taken(&self, sku: &str, except: Option<i32>) -> bool {
        self.products
            .values()
            .any(|p| p.sku == sku && Some(p.id) != except)
    }

    fn hydrate(&self, product: &Product) -> Product {
        let mut product = product.clone();
        product.variantes = self
            .variants
            .values()
            .filter(|v| v.producto_id == product.id)
            .cloned()
            .collect();
        product
    }
}

/// In-memory implementation of ProductRepository (for development/testing).
/// Ids are assigned sequentially from 1, like a serial column.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProductRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(value: Option<&str>, needle: &str) -> bool {
    value.is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase()))
}

fn matches(product: &Product, filter: &ProductFilter) -> bool {
    if let Some(material) = &filter.material
        && !contains_ci(product.material.as_deref(), material)
    {
        return false;
    }
    if let Some(talle) = &filter.talle
        && !contains_ci(product.talle.as_deref(), talle)
    {
        return false;
    }
    if let Some(color) = &filter.color
        && !contains_ci(product.color.as_deref(), color)
    {
        return false;
    }
    if let Some(max) = filter.precio_max
        && product.precio > max
    {
        return false;
    }
    if let Some(categoria_id) = filter.categoria_id
        && product.categoria_id != categoria_id
    {
        return false;
    }
    true
}

fn compare(sort: ProductSort, a: &Product, b: &Product) -> Ordering {
    let primary = match sort {
        ProductSort::PrecioAsc => a.precio.total_cmp(&b.precio),
        ProductSort::PrecioDesc => b.precio.total_cmp(&a.precio),
        ProductSort::NombreAsc => a.nombre.cmp(&b.nombre),
        ProductSort::NombreDesc => b.nombre.cmp(&a.nombre),
    };
    primary.then(a.id.cmp(&b.id))
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list(&self, filter: &ProductFilter) -> ProductResult<Vec<Product>> {
        let store = self.store.read().await;

        // BTreeMap iteration is already id order.
        let mut found: Vec<&Product> = store
            .products
            .values()
            .filter(|p| matches(p, filter))
            .collect();

        if let Some(sort) = filter.sort {
            found.sort_by(|a, b| compare(sort, a, b));
        }

        Ok(found
            .into_iter()
            .skip(filter.skip as usize)
            .take(filter.limit as usize)
            .map(|p| store.hydrate(p))
            .collect())
    }

    async fn get_by_id(&self, id: i32) -> ProductResult<Option<Product>> {
        let store = self.store.read().await;
        Ok(store.products.get(&id).map(|p| store.hydrate(p)))
    }

    async fn exists_by_sku(&self, sku: &str) -> ProductResult<bool> {
        let store = self.store.read().await;
        Ok(store.sku_taken(sku, None))
    }

    async fn insert(&self, input: NewProduct) -> ProductResult<Product> {
        let mut store = self.store.write().await;

        if store.sku_taken(&input.sku, None) {
            return Err(ProductError::DuplicateSku(input.sku));
        }

        store.last_product_id += 1;
        let product = Product::from_new(store.last_product_id, input);
        store.products.insert(product.id, product.clone());

        tracing::info!(product_id = product.id, sku = %product.sku, "Created product");
        Ok(product)
    }

    async fn update(&self, id: i32, changes: ProductChanges) -> ProductResult<Product> {
        let mut store = self.store.write().await;

        if let Some(sku) = &changes.sku
            && store.sku_taken(sku, Some(id))
        {
            return Err(ProductError::DuplicateSku(sku.clone()));
        }

        let product = store.products.get_mut(&id).ok_or(ProductError::NotFound(id))?;
        product.apply_changes(changes);
        let product = product.clone();

        tracing::info!(product_id = id, "Updated product");
        Ok(store.hydrate(&product))
    }

    async fn delete(&self, id: i32) -> ProductResult<()> {
        let mut store = self.store.write().await;

        if store.products.remove(&id).is_none() {
            return Err(ProductError::NotFound(id));
        }
        store.variants.retain(|_, v| v.producto_id != id);

        tracing::info!(product_id = id, "Deleted product");
        Ok(())
    }

    async fn insert_variant(
        &self,
        product_id: i32,
        input: CreateVariant,
    ) -> ProductResult<Variant> {
        let mut store = self.store.write().await;

        if !store.products.contains_key(&product_id) {
            return Err(ProductError::NotFound(product_id));
        }

        store.last_variant_id += 1;
        let variant = Variant {
            id: store.last_variant_id,
            producto_id: product_id,
            tamanio: input.tamanio,
            color: input.color,
            cantidad_en_stock: input.cantidad_en_stock,
        };
        store.variants.insert(variant.id, variant.clone());

        tracing::info!(product_id, variant_id = variant.id, "Added variant");
        Ok(variant)
    }
}
