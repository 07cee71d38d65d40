//! Favorite entity - sellers bookmarked by a client.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Favorite database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "favorites")]
pub struct Model {
    /// Client who bookmarked
    #[sea_orm(primary_key, auto_increment = false)]
    pub client_id: i64,
    /// Bookmarked seller
    #[sea_orm(primary_key, auto_increment = false)]
    pub seller_id: i64,
    /// When the bookmark was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Favorite and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Bookmarking client
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    /// Bookmarked seller
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
