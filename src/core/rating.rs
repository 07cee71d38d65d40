//! Client ratings of sellers.

use crate::{
    core::{
        access::{Actor, ensure_can_view},
        seller::load_seller,
    },
    entities::{Seller, SellerRating, seller, seller_rating},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;

/// Aggregate rating of one seller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal, 0 without ratings
    pub average_rating: f64,
    /// Number of ratings
    pub total_ratings: i32,
}

/// Mean of `ratings` rounded to one decimal.
#[must_use]
pub fn summarize(ratings: &[i32]) -> RatingSummary {
    if ratings.is_empty() {
        return RatingSummary {
            average_rating: 0.0,
            total_ratings: 0,
        };
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / ratings.len() as f64;
    RatingSummary {
        average_rating: (mean * 10.0).round() / 10.0,
        total_ratings: i32::try_from(ratings.len()).unwrap_or(i32::MAX),
    }
}

async fn recalculate<C>(db: &C, seller_id: i64) -> Result<RatingSummary>
where
    C: ConnectionTrait,
{
    let ratings: Vec<i32> = SellerRating::find()
        .select_only()
        .column(seller_rating::Column::Rating)
        .filter(seller_rating::Column::SellerId.eq(seller_id))
        .into_tuple()
        .all(db)
        .await?;
    let summary = summarize(&ratings);

    Seller::update_many()
        .col_expr(seller::Column::AverageRating, Expr::value(summary.average_rating))
        .col_expr(seller::Column::TotalRatings, Expr::value(summary.total_ratings))
        .filter(seller::Column::Id.eq(seller_id))
        .exec(db)
        .await?;
    Ok(summary)
}

/// Records or replaces the calling client's 1-5 rating of a visible seller
/// and refreshes the seller's aggregate.
pub async fn rate_seller(
    db: &DatabaseConnection,
    actor: &Actor,
    seller_id: i64,
    rating: i32,
) -> Result<seller_rating::Model> {
    let client_id = actor.require_client()?;
    if !(1..=5).contains(&rating) {
        return Err(Error::validation("rating", "must be between 1 and 5"));
    }
    let seller = load_seller(db, seller_id).await?;
    ensure_can_view(&seller, actor, Utc::now())?;

    let now = Utc::now();
    let txn = db.begin().await?;
    let existing = SellerRating::find()
        .filter(seller_rating::Column::SellerId.eq(seller_id))
        .filter(seller_rating::Column::ClientId.eq(client_id))
        .one(&txn)
        .await?;

    let saved = match existing {
        Some(found) => {
            let mut active: seller_rating::ActiveModel = found.into();
            active.rating = Set(rating);
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            seller_rating::ActiveModel {
                seller_id: Set(seller_id),
                client_id: Set(client_id),
                rating: Set(rating),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };
    let summary = recalculate(&txn, seller_id).await?;
    txn.commit().await?;

    tracing::debug!(seller_id, client_id, rating, average = summary.average_rating, "seller rated");
    Ok(saved)
}

/// Aggregate rating of a seller `viewer` may see.
pub async fn get_seller_rating(
    db: &DatabaseConnection,
    viewer: &Actor,
    seller_id: i64,
) -> Result<RatingSummary> {
    let seller = load_seller(db, seller_id).await?;
    ensure_can_view(&seller, viewer, Utc::now())?;
    Ok(RatingSummary {
        average_rating: seller.average_rating,
        total_ratings: seller.total_ratings,
    })
}

/// The calling client's ratings, newest first.
pub async fn list_client_ratings(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<seller_rating::Model>> {
    let client_id = actor.require_client()?;
    SellerRating::find()
        .filter(seller_rating::Column::ClientId.eq(client_id))
        .order_by_desc(seller_rating::Column::CreatedAt)
        .order_by_desc(seller_rating::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
