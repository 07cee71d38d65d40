//! Category entity - global directory categories and seller-local categories.
//!
//! `is_global` categories have no `seller_id` and are shared by every seller;
//! local categories belong to exactly one seller and are deleted with it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Slug, unique among global categories or within one seller
    pub slug: String,
    /// Optional description
    pub description: Option<String>,
    /// Shared directory category (true) or seller-local (false)
    pub is_global: bool,
    /// Inactive global categories cannot be attached by non-owners
    pub is_active: bool,
    /// Owning seller for local categories, None for global ones
    pub seller_id: Option<i64>,
    /// Staff user who created the category
    pub created_by: i64,
    /// When the category was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Category and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Local categories belong to one seller
    #[sea_orm(
        belongs_to = "super::seller::Entity",
        from = "Column::SellerId",
        to = "super::seller::Column::Id"
    )]
    Seller,
}

impl Related<super::seller::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
