use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::NewProduct;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "productos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub nombre: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub descripcion: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub precio: f64,
    #[sea_orm(unique)]
    pub sku: String,
    pub stock: i32,
    pub categoria_id: i32,
    pub material: Option<String>,
    pub talle: Option<String>,
    pub color: Option<String>,
    pub urls_imagenes: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::variante::Entity")]
    Variantes,
}

impl Related<super::variante::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variantes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<NewProduct> for ActiveModel {
    fn from(input: NewProduct) -> Self {
        ActiveModel {
            nombre: Set(input.nombre),
            descripcion: Set(input.descripcion),
            precio: Set(input.precio),
            sku: Set(input.sku),
            stock: Set(input.stock),
            categoria_id: Set(input.categoria_id),
            material: Set(input.material),
            talle: Set(input.talle),
            color: Set(input.color),
            urls_imagenes: Set(serde_json::json!(input.urls_imagenes)),
            ..Default::default()
        }
    }
}
