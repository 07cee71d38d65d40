//! Client favorites. Only currently visible sellers can be added or listed.

use crate::{
    core::{
        access::{Actor, ensure_can_view, visibility_condition},
        seller::load_seller,
    },
    entities::{Favorite, Seller, favorite, seller},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, QueryTrait, Set, prelude::*};

/// What [`toggle_favorite`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteChange {
    /// The seller is now a favorite
    Added,
    /// The seller is no longer a favorite
    Removed,
}

/// Adds or removes a seller from the calling client's favorites.
pub async fn toggle_favorite(
    db: &DatabaseConnection,
    actor: &Actor,
    seller_id: i64,
) -> Result<FavoriteChange> {
    let client_id = actor.require_client()?;

    let removed = Favorite::delete_many()
        .filter(favorite::Column::ClientId.eq(client_id))
        .filter(favorite::Column::SellerId.eq(seller_id))
        .exec(db)
        .await?;
    if removed.rows_affected > 0 {
        return Ok(FavoriteChange::Removed);
    }

    let seller = load_seller(db, seller_id).await?;
    ensure_can_view(&seller, actor, Utc::now())?;

    Favorite::insert(favorite::ActiveModel {
        client_id: Set(client_id),
        seller_id: Set(seller_id),
        created_at: Set(Utc::now()),
    })
    .exec_without_returning(db)
    .await?;
    Ok(FavoriteChange::Added)
}

/// The calling client's favorite sellers that are still visible, most
/// recently added first.
pub async fn list_favorites(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<seller::Model>> {
    let client_id = actor.require_client()?;

    let favorites = Favorite::find()
        .filter(favorite::Column::ClientId.eq(client_id))
        .order_by_desc(favorite::Column::CreatedAt)
        .all(db)
        .await?;

    let visible = Seller::find()
        .filter(visibility_condition(actor, Utc::now()))
        .filter(
            seller::Column::Id.in_subquery(
                Favorite::find()
                    .select_only()
                    .column(favorite::Column::SellerId)
                    .filter(favorite::Column::ClientId.eq(client_id))
                    .into_query(),
            ),
        )
        .all(db)
        .await?;

    Ok(favorites
        .iter()
        .filter_map(|f| visible.iter().find(|s| s.id == f.seller_id).cloned())
        .collect())
}
