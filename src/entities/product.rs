//! Product entity - catalogue items offered by a seller.
//!
//! Visibility is inherited from the owning seller.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning seller
    pub seller_id: i64,
    /// Optional local category of the same seller
    pub category_id: Option<i64>,
    /// Product name
    pub name: String,
    /// Slug, unique within the seller
    pub slug: String,
    /// Article code
    pub code: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Price, never negative
    pub price: Option<f64>,
    /// Stored image asset path
    pub image: Option<String>,
    /// Whether the product can currently be ordered
    pub is_available: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one seller
    #[sea_orm(
        belongs_to = "super::seller::Entity",
        from = "Column::SellerId",
        to = "super::seller::Column::Id"
    )]
    Seller,
    /// Optional local category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::seller::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
