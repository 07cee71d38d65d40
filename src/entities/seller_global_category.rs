//! Join rows between sellers and the global categories they are listed under.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Seller ↔ global category link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seller_global_categories")]
pub struct Model {
    /// Linked seller
    #[sea_orm(primary_key, auto_increment = false)]
    pub seller_id: i64,
    /// Linked global category
    #[sea_orm(primary_key, auto_increment = false)]
    pub category_id: i64,
}

/// Defines relationships between the link and its ends
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Linked seller
    #[sea_orm(
        belongs_to = "super::seller::Entity",
        from = "Column::SellerId",
        to = "super::seller::Column::Id"
    )]
    Seller,
    /// Linked category
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
