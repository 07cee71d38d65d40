//! Product business logic - Handles the catalogue of each seller.
//!
//! Products inherit visibility from their seller: reads go through the same
//! `can_view` predicate, and writes require the caller to be allowed to
//! manage the seller's catalogue (managers only while their seller is active).

use crate::{
    core::{
        access::{Actor, can_mutate, ensure_can_manage_catalog, ensure_can_view},
        seller::load_seller,
        slug::{pick_unique, slug_for},
    },
    entities::{Category, Product, product},
    errors::{Error, Result},
    media::{ImageStore, MediaKind, remove_quietly},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};

/// Product fields for create and update.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    /// Display name
    pub name: String,
    /// Local category of the same seller
    pub category_id: Option<i64>,
    /// Seller's own article code
    pub code: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Price, never negative
    pub price: Option<f64>,
    /// Whether the product can currently be ordered
    pub is_available: bool,
}

async fn load_product<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("product", product_id))
}

async fn unique_product_slug<C>(
    db: &C,
    seller_id: i64,
    name: &str,
    exclude: Option<i64>,
) -> Result<String>
where
    C: ConnectionTrait,
{
    let base = slug_for("name", name)?;
    let mut query = Product::find()
        .select_only()
        .column(product::Column::Slug)
        .filter(product::Column::SellerId.eq(seller_id))
        .filter(product::Column::Slug.starts_with(base.as_str()));
    if let Some(id) = exclude {
        query = query.filter(product::Column::Id.ne(id));
    }
    let taken: Vec<String> = query.into_tuple().all(db).await?;
    Ok(pick_unique(&base, &taken))
}

/// Validates price and the local category of `input`.
async fn check_input(db: &DatabaseConnection, seller_id: i64, input: &ProductInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("name", "must not be empty"));
    }
    if let Some(price) = input.price {
        if !price.is_finite() || price < 0.0 {
            return Err(Error::validation("price", "must be zero or more"));
        }
    }
    if let Some(category_id) = input.category_id {
        let category = Category::find_by_id(category_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("category", category_id))?;
        if category.seller_id != Some(seller_id) {
            return Err(Error::validation(
                "category_id",
                "category does not belong to this seller",
            ));
        }
    }
    Ok(())
}

/// Creates a product under a seller.
///
/// # Errors
/// Returns an error if the caller may not manage the seller's catalogue, the
/// input is invalid, or the database operation fails.
pub async fn create_product(
    db: &DatabaseConnection,
    actor: &Actor,
    seller_id: i64,
    input: ProductInput,
) -> Result<product::Model> {
    let seller = load_seller(db, seller_id).await?;
    ensure_can_manage_catalog(&seller, actor)?;
    check_input(db, seller_id, &input).await?;

    let name = input.name.trim().to_string();
    let now = Utc::now();
    let model = product::ActiveModel {
        seller_id: Set(seller_id),
        category_id: Set(input.category_id),
        slug: Set(unique_product_slug(db, seller_id, &name, None).await?),
        name: Set(name),
        code: Set(input.code),
        description: Set(input.description),
        price: Set(input.price),
        image: Set(None),
        is_available: Set(input.is_available),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    tracing::info!(product_id = created.id, seller_id, "product created");
    Ok(created)
}

/// Replaces a product's fields; a new name regenerates the slug.
///
/// # Errors
/// Returns an error if the product does not exist, the caller may not manage
/// the catalogue, or the input is invalid.
pub async fn update_product(
    db: &DatabaseConnection,
    actor: &Actor,
    product_id: i64,
    input: ProductInput,
) -> Result<product::Model> {
    let current = load_product(db, product_id).await?;
    let seller = load_seller(db, current.seller_id).await?;
    ensure_can_manage_catalog(&seller, actor)?;
    check_input(db, seller.id, &input).await?;

    let name = input.name.trim().to_string();
    let mut active: product::ActiveModel = current.clone().into();
    if name != current.name {
        active.slug = Set(unique_product_slug(db, seller.id, &name, Some(product_id)).await?);
        active.name = Set(name);
    }
    active.category_id = Set(input.category_id);
    active.code = Set(input.code);
    active.description = Set(input.description);
    active.price = Set(input.price);
    active.is_available = Set(input.is_available);
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}

/// Deletes a product and its image.
///
/// # Errors
/// Returns an error if the product does not exist or the caller may not
/// manage the catalogue.
pub async fn delete_product(
    db: &DatabaseConnection,
    images: &dyn ImageStore,
    actor: &Actor,
    product_id: i64,
) -> Result<()> {
    let current = load_product(db, product_id).await?;
    let seller = load_seller(db, current.seller_id).await?;
    ensure_can_manage_catalog(&seller, actor)?;

    Product::delete_by_id(product_id).exec(db).await?;
    remove_quietly(images, current.image.as_deref()).await;
    Ok(())
}

/// Products of a seller `viewer` may see. Callers who cannot edit the seller
/// only get available products.
///
/// # Errors
/// Returns `Forbidden` when the seller is hidden from `viewer`.
pub async fn list_products(
    db: &DatabaseConnection,
    viewer: &Actor,
    seller_id: i64,
) -> Result<Vec<product::Model>> {
    let seller = load_seller(db, seller_id).await?;
    ensure_can_view(&seller, viewer, Utc::now())?;

    let mut query = Product::find().filter(product::Column::SellerId.eq(seller_id));
    if !can_mutate(&seller, viewer) {
        query = query.filter(product::Column::IsAvailable.eq(true));
    }
    query
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// One product by slug within a seller `viewer` may see.
///
/// # Errors
/// Returns `NotFound` for an unknown product and `Forbidden` when the seller
/// is hidden from `viewer`.
pub async fn get_product_by_slug(
    db: &DatabaseConnection,
    viewer: &Actor,
    seller_id: i64,
    slug: &str,
) -> Result<product::Model> {
    let seller = load_seller(db, seller_id).await?;
    ensure_can_view(&seller, viewer, Utc::now())?;

    Product::find()
        .filter(product::Column::SellerId.eq(seller_id))
        .filter(product::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("product", slug))
}

/// Stores a new product image, dropping the one it replaces.
///
/// # Errors
/// Returns an error if the caller may not manage the catalogue or the image
/// is rejected by the store.
pub async fn set_product_image(
    db: &DatabaseConnection,
    images: &dyn ImageStore,
    actor: &Actor,
    product_id: i64,
    bytes: Vec<u8>,
) -> Result<product::Model> {
    let current = load_product(db, product_id).await?;
    let seller = load_seller(db, current.seller_id).await?;
    ensure_can_manage_catalog(&seller, actor)?;

    let path = images.store(bytes, MediaKind::Product).await?;
    let previous = current.image.clone();
    let mut active: product::ActiveModel = current.into();
    active.image = Set(Some(path));
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    remove_quietly(images, previous.as_deref()).await;
    Ok(updated)
}

/// Clears a product image and deletes the file.
///
/// # Errors
/// Returns `Validation` when the product has no image.
pub async fn remove_product_image(
    db: &DatabaseConnection,
    images: &dyn ImageStore,
    actor: &Actor,
    product_id: i64,
) -> Result<product::Model> {
    let current = load_product(db, product_id).await?;
    let seller = load_seller(db, current.seller_id).await?;
    ensure_can_manage_catalog(&seller, actor)?;

    let Some(previous) = current.image.clone() else {
        return Err(Error::validation("image", "product has no image"));
    };
    let mut active: product::ActiveModel = current.into();
    active.image = Set(None);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    remove_quietly(images, Some(&previous)).await;
    Ok(updated)
}
