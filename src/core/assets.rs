//! Access control for stored images.
//!
//! A request for `/uploads/...` is resolved to the seller that owns the file
//! (directly for logos and covers, via the product for product photos) and
//! served only if that seller passes [`can_view`](crate::core::access::can_view).

use crate::{
    core::{
        access::{Actor, ensure_can_view},
        seller::load_seller,
    },
    entities::{Product, Seller, product, seller},
    errors::{Error, Result},
    media::MediaKind,
};
use chrono::Utc;
use sea_orm::{Condition, prelude::*};

/// Returns the owning seller id when `viewer` may fetch the asset at `path`.
pub async fn authorize_asset(db: &DatabaseConnection, viewer: &Actor, path: &str) -> Result<i64> {
    let kind = MediaKind::from_asset_path(path).ok_or_else(|| Error::not_found("asset", path))?;

    let owner = match kind {
        MediaKind::Seller => Seller::find()
            .filter(
                Condition::any()
                    .add(seller::Column::Logo.eq(path))
                    .add(seller::Column::CoverImage.eq(path)),
            )
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("asset", path))?,
        MediaKind::Product => {
            let product = Product::find()
                .filter(product::Column::Image.eq(path))
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("asset", path))?;
            load_seller(db, product.seller_id).await?
        }
    };

    ensure_can_view(&owner, viewer, Utc::now())?;
    Ok(owner.id)
}
