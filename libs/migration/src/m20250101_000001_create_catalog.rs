use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Productos::Table)
                    .if_not_exists()
                    .col(pk_auto(Productos::Id))
                    .col(string(Productos::Nombre))
                    .col(text_null(Productos::Descripcion))
                    .col(double(Productos::Precio))
                    .col(string_uniq(Productos::Sku))
                    .col(integer(Productos::Stock).default(0))
                    .col(integer(Productos::CategoriaId))
                    .col(string_null(Productos::Material))
                    .col(string_null(Productos::Talle))
                    .col(string_null(Productos::Color))
                    .col(json(Productos::UrlsImagenes).default("[]"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_productos_categoria_id")
                    .table(Productos::Table)
                    .col(Productos::CategoriaId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_productos_precio")
                    .table(Productos::Table)
                    .col(Productos::Precio)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VariantesProducto::Table)
                    .if_not_exists()
                    .col(pk_auto(VariantesProducto::Id))
                    .col(integer(VariantesProducto::ProductoId))
                    .col(string(VariantesProducto::Tamanio))
                    .col(string(VariantesProducto::Color))
                    .col(integer(VariantesProducto::CantidadEnStock).default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_variantes_producto_producto_id")
                            .from(VariantesProducto::Table, VariantesProducto::ProductoId)
                            .to(Productos::Table, Productos::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_variantes_producto_producto_id")
                    .table(VariantesProducto::Table)
                    .col(VariantesProducto::ProductoId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VariantesProducto::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Productos::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Productos {
    Table,
    Id,
    Nombre,
    Descripcion,
    Precio,
    Sku,
    Stock,
    CategoriaId,
    Material,
    Talle,
    Color,
    UrlsImagenes,
}

#[derive(DeriveIden)]
enum VariantesProducto {
    Table,
    Id,
    ProductoId,
    Tamanio,
    Color,
    CantidadEnStock,
}
