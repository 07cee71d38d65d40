//! Seller rating entity - one 1-5 score per (seller, client) pair.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Seller rating database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seller_ratings")]
pub struct Model {
    /// Unique identifier for the rating
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Rated seller
    pub seller_id: i64,
    /// Rating client
    pub client_id: i64,
    /// Score from 1 to 5
    pub rating: i32,
    /// When the rating was first given
    pub created_at: DateTimeUtc,
    /// When the rating was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between SellerRating and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Rated seller
    #[sea_orm(
        belongs_to = "super::seller::Entity",
        from = "Column::SellerId",
        to = "super::seller::Column::Id"
    )]
    Seller,
    /// Rating client
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
}

impl Related<super::seller::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
