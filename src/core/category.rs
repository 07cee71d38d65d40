//! Global and seller-local categories.
//!
//! Global categories are directory data curated by staff; deactivating one
//! forces every seller that references it back to draft. Local categories
//! belong to one seller and follow the catalogue rules of that seller.

use crate::{
    core::{
        access::{Actor, Capability, can_mutate, ensure_can_manage_catalog, ensure_can_view},
        lifecycle::{DirectoryEvent, apply_directory_event},
        seller::load_seller,
        slug::{pick_unique, slug_for},
    },
    entities::{Category, Product, SellerGlobalCategory, category, product, seller_global_category},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};

/// Category creation input.
#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
}

async fn load_category<C>(db: &C, category_id: i64) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("category", category_id))
}

/// Slug unique among global categories, or within one seller's locals.
async fn unique_category_slug<C>(
    db: &C,
    name: &str,
    seller_id: Option<i64>,
    exclude: Option<i64>,
) -> Result<String>
where
    C: ConnectionTrait,
{
    let base = slug_for("name", name)?;
    let mut query = Category::find()
        .select_only()
        .column(category::Column::Slug)
        .filter(category::Column::Slug.starts_with(base.as_str()));
    query = match seller_id {
        Some(id) => query.filter(category::Column::SellerId.eq(id)),
        None => query.filter(category::Column::IsGlobal.eq(true)),
    };
    if let Some(id) = exclude {
        query = query.filter(category::Column::Id.ne(id));
    }
    let taken: Vec<String> = query.into_tuple().all(db).await?;
    Ok(pick_unique(&base, &taken))
}

/// Staff may edit global categories; local ones follow the owning seller.
async fn ensure_can_edit<C>(db: &C, actor: &Actor, category: &category::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    match category.seller_id {
        None => actor.require(Capability::ManageDirectory),
        Some(seller_id) => {
            let seller = load_seller(db, seller_id).await?;
            ensure_can_manage_catalog(&seller, actor)
        }
    }
}

/// Creates an inactive global category. Staff only.
pub async fn create_global_category(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewCategory,
) -> Result<category::Model> {
    actor.require(Capability::ManageDirectory)?;
    let creator = actor.require_staff()?;
    let name = input.name.trim().to_string();

    let model = category::ActiveModel {
        slug: Set(unique_category_slug(db, &name, None, None).await?),
        name: Set(name),
        description: Set(input.description),
        is_global: Set(true),
        is_active: Set(false),
        seller_id: Set(None),
        created_by: Set(creator),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    tracing::info!(category_id = created.id, slug = %created.slug, "global category created");
    Ok(created)
}

/// Creates an inactive local category for a seller.
pub async fn create_local_category(
    db: &DatabaseConnection,
    actor: &Actor,
    seller_id: i64,
    input: NewCategory,
) -> Result<category::Model> {
    let seller = load_seller(db, seller_id).await?;
    ensure_can_manage_catalog(&seller, actor)?;
    let creator = actor.require_staff()?;
    let name = input.name.trim().to_string();

    let model = category::ActiveModel {
        slug: Set(unique_category_slug(db, &name, Some(seller_id), None).await?),
        name: Set(name),
        description: Set(input.description),
        is_global: Set(false),
        is_active: Set(false),
        seller_id: Set(Some(seller_id)),
        created_by: Set(creator),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Global categories by name, optionally only active ones.
pub async fn list_global_categories(
    db: &DatabaseConnection,
    active_only: bool,
) -> Result<Vec<category::Model>> {
    let mut query = Category::find().filter(category::Column::IsGlobal.eq(true));
    if active_only {
        query = query.filter(category::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// A global category by slug.
pub async fn get_global_category_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<category::Model> {
    Category::find()
        .filter(category::Column::IsGlobal.eq(true))
        .filter(category::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("category", slug))
}

/// Local categories of a seller `viewer` may see. Viewers who cannot edit
/// the seller only get active categories.
pub async fn list_seller_categories(
    db: &DatabaseConnection,
    viewer: &Actor,
    seller_id: i64,
) -> Result<Vec<category::Model>> {
    let seller = load_seller(db, seller_id).await?;
    ensure_can_view(&seller, viewer, Utc::now())?;

    let mut query = Category::find().filter(category::Column::SellerId.eq(seller_id));
    if !can_mutate(&seller, viewer) {
        query = query.filter(category::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renames a category; the slug follows within its scope.
pub async fn rename_category(
    db: &DatabaseConnection,
    actor: &Actor,
    category_id: i64,
    name: &str,
) -> Result<category::Model> {
    let current = load_category(db, category_id).await?;
    ensure_can_edit(db, actor, &current).await?;

    let name = name.trim();
    let slug = unique_category_slug(db, name, current.seller_id, Some(category_id)).await?;
    let mut active: category::ActiveModel = current.into();
    active.name = Set(name.to_string());
    active.slug = Set(slug);
    Ok(active.update(db).await?)
}

/// Sets the active flag. Turning an active global category off forces the
/// sellers referencing it to draft in the same transaction.
pub async fn set_category_active(
    db: &DatabaseConnection,
    actor: &Actor,
    category_id: i64,
    is_active: bool,
) -> Result<category::Model> {
    let txn = db.begin().await?;
    let current = load_category(&txn, category_id).await?;
    ensure_can_edit(&txn, actor, &current).await?;

    let cascade = current.is_global && current.is_active && !is_active;
    let mut active: category::ActiveModel = current.into();
    active.is_active = Set(is_active);
    let updated = active.update(&txn).await?;
    if cascade {
        apply_directory_event(&txn, DirectoryEvent::CategoryDeactivated(category_id)).await?;
    }
    txn.commit().await?;

    tracing::info!(category_id, is_active, "category status changed");
    Ok(updated)
}

/// Flips the active flag. See [`set_category_active`].
pub async fn toggle_category(
    db: &DatabaseConnection,
    actor: &Actor,
    category_id: i64,
) -> Result<category::Model> {
    let current = load_category(db, category_id).await?;
    set_category_active(db, actor, category_id, !current.is_active).await
}

/// Deletes a category. Seller links to a global category are dropped and
/// products filed under a local one become uncategorised.
pub async fn delete_category(db: &DatabaseConnection, actor: &Actor, category_id: i64) -> Result<()> {
    let current = load_category(db, category_id).await?;
    ensure_can_edit(db, actor, &current).await?;

    let txn = db.begin().await?;
    SellerGlobalCategory::delete_many()
        .filter(seller_global_category::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    Product::update_many()
        .col_expr(product::Column::CategoryId, Expr::value(Option::<i64>::None))
        .filter(product::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    Category::delete_by_id(category_id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(category_id, global = current.is_global, "category deleted");
    Ok(())
}
