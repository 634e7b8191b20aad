use async_trait::async_trait;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, Func, IntoCondition, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, LoaderTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};

use crate::{
    entity::{self, producto, variante},
    error::{ProductError, ProductResult},
    models::{
        CreateVariant, NewProduct, Product, ProductChanges, ProductFilter, ProductSort, Variant,
    },
    repository::ProductRepository,
};

/// Postgres-backed store. Each mutation runs in its own transaction.
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    db: DatabaseConnection,
}

impl PgProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

const LIKE_ESCAPE: char = '\\';

/// `%needle%` with `%`, `_` and the escape character matched literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `LOWER(column) LIKE '%needle%' ESCAPE '\'`
fn contains_ci(column: producto::Column, needle: &str) -> impl IntoCondition {
    use sea_orm::sea_query::ExprTrait;

    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(like_pattern(needle)).escape(LIKE_ESCAPE))
}

/// Unique violations on `sku` surface as `DuplicateSku`; anything else is a database error.
fn write_error(err: DbErr, sku: Option<&str>) -> ProductError {
    match (err.sql_err(), sku) {
        (Some(SqlErr::UniqueConstraintViolation(_)), Some(sku)) => {
            ProductError::DuplicateSku(sku.to_string())
        }
        _ => ProductError::Database(err),
    }
}

fn apply_changes(active: &mut producto::ActiveModel, changes: ProductChanges) {
    if let Some(nombre) = changes.nombre {
        active.nombre = Set(nombre);
    }
    if let Some(descripcion) = changes.descripcion {
        active.descripcion = Set(descripcion);
    }
    if let Some(precio) = changes.precio {
        active.precio = Set(precio);
    }
    if let Some(sku) = changes.sku {
        active.sku = Set(sku);
    }
    if let Some(stock) = changes.stock {
        active.stock = Set(stock);
    }
    if let Some(categoria_id) = changes.categoria_id {
        active.categoria_id = Set(categoria_id);
    }
    if let Some(material) = changes.material {
        active.material = Set(material);
    }
    if let Some(talle) = changes.talle {
        active.talle = Set(talle);
    }
    if let Some(color) = changes.color {
        active.color = Set(color);
    }
    if let Some(urls) = changes.urls_imagenes {
        active.urls_imagenes = Set(serde_json::json!(urls));
    }
}

impl PgProductRepository {
    async fn with_variants(&self, model: producto::Model) -> ProductResult<Product> {
        let variants = model
            .find_related(variante::Entity)
            .order_by_asc(variante::Column::Id)
            .all(&self.db)
            .await?;
        Ok(entity::into_product(model, variants))
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list(&self, filter: &ProductFilter) -> ProductResult<Vec<Product>> {
        let mut query = producto::Entity::find();

        if let Some(material) = &filter.material {
            query = query.filter(contains_ci(producto::Column::Material, material));
        }
        if let Some(talle) = &filter.talle {
            query = query.filter(contains_ci(producto::Column::Talle, talle));
        }
        if let Some(color) = &filter.color {
            query = query.filter(contains_ci(producto::Column::Color, color));
        }
        if let Some(max) = filter.precio_max {
            query = query.filter(producto::Column::Precio.lte(max));
        }
        if let Some(categoria_id) = filter.categoria_id {
            query = query.filter(producto::Column::CategoriaId.eq(categoria_id));
        }

        query = match filter.sort {
            Some(ProductSort::PrecioAsc) => query.order_by_asc(producto::Column::Precio),
            Some(ProductSort::PrecioDesc) => query.order_by_desc(producto::Column::Precio),
            Some(ProductSort::NombreAsc) => query.order_by_asc(producto::Column::Nombre),
            Some(ProductSort::NombreDesc) => query.order_by_desc(producto::Column::Nombre),
            None => query,
        };

        let models = query
            .order_by_asc(producto::Column::Id)
            .offset(filter.skip)
            .limit(filter.limit)
            .all(&self.db)
            .await?;

        // Second query so the page limit counts products, not joined rows.
        let variants = models.load_many(variante::Entity, &self.db).await?;

        Ok(models
            .into_iter()
            .zip(variants)
            .map(|(model, variants)| entity::into_product(model, variants))
            .collect())
    }

    async fn get_by_id(&self, id: i32) -> ProductResult<Option<Product>> {
        match producto::Entity::find_by_id(id).one(&self.db).await? {
            Some(model) => self.with_variants(model).await.map(Some),
            None => Ok(None),
        }
    }

    async fn exists_by_sku(&self, sku: &str) -> ProductResult<bool> {
        let count = producto::Entity::find()
            .filter(producto::Column::Sku.eq(sku))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, input: NewProduct) -> ProductResult<Product> {
        let sku = input.sku.clone();
        let txn = self.db.begin().await?;

        let active: producto::ActiveModel = input.into();
        let model = active
            .insert(&txn)
            .await
            .map_err(|e| write_error(e, Some(&sku)))?;
        txn.commit().await?;

        tracing::info!(product_id = model.id, sku = %model.sku, "Created product");
        Ok(entity::into_product(model, Vec::new()))
    }

    async fn update(&self, id: i32, changes: ProductChanges) -> ProductResult<Product> {
        let sku = changes.sku.clone();
        let txn = self.db.begin().await?;

        let model = producto::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(ProductError::NotFound(id))?;

        let mut active: producto::ActiveModel = model.clone().into();
        apply_changes(&mut active, changes);

        let model = if active.is_changed() {
            active
                .update(&txn)
                .await
                .map_err(|e| write_error(e, sku.as_deref()))?
        } else {
            model
        };
        txn.commit().await?;

        tracing::info!(product_id = id, "Updated product");
        self.with_variants(model).await
    }

    async fn delete(&self, id: i32) -> ProductResult<()> {
        let txn = self.db.begin().await?;

        if producto::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(ProductError::NotFound(id));
        }

        let variants = variante::Entity::delete_many()
            .filter(variante::Column::ProductoId.eq(id))
            .exec(&txn)
            .await?;
        producto::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            product_id = id,
            variants_deleted = variants.rows_affected,
            "Deleted product"
        );
        Ok(())
    }

    async fn insert_variant(
        &self,
        product_id: i32,
        input: CreateVariant,
    ) -> ProductResult<Variant> {
        let txn = self.db.begin().await?;

        if producto::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(ProductError::NotFound(product_id));
        }

        let model = variante::ActiveModel::for_product(product_id, input)
            .insert(&txn)
            .await?;
        txn.commit().await?;

        tracing::info!(product_id, variant_id = model.id, "Added variant");
        Ok(model.into())
    }
}
