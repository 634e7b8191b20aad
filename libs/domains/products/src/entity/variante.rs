use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{CreateVariant, Variant};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "variantes_producto")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub producto_id: i32,
    pub tamanio: String,
    pub color: String,
    pub cantidad_en_stock: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::producto::Entity",
        from = "Column::ProductoId",
        to = "super::producto::Column::Id",
        on_delete = "Cascade"
    )]
    Producto,
}

impl Related<super::producto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Producto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Variant {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            producto_id: model.producto_id,
            tamanio: model.tamanio,
            color: model.color,
            cantidad_en_stock: model.cantidad_en_stock,
        }
    }
}

impl ActiveModel {
    pub fn for_product(producto_id: i32, input: CreateVariant) -> Self {
        ActiveModel {
            producto_id: Set(producto_id),
            tamanio: Set(input.tamanio),
            color: Set(input.color),
            cantidad_en_stock: Set(input.cantidad_en_stock),
            ..Default::default()
        }
    }
}
