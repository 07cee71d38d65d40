//! Seller creation, profile edits, reads and deletion.
//!
//! Status changes live in [`crate::core::lifecycle`]; this module only ever
//! creates sellers as `draft` and never writes the status column.

use crate::{
    core::{
        access::{
            Actor, Capability, ensure_can_mutate, ensure_can_view, visibility_condition,
        },
        seller_request::{consume, find_consumable},
        slug::{pick_unique, slug_for},
    },
    entities::{
        Category, City, Favorite, Product, Seller, SellerGlobalCategory, SellerRating,
        SellerStatus, category, favorite, product, seller, seller_global_category, seller_rating,
    },
    errors::{Error, Result},
    media::{ImageStore, MediaKind, remove_quietly},
};
use chrono::Utc;
use sea_orm::{
    Condition, QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait, prelude::*,
    sea_query::{Expr, SimpleExpr},
};
use std::collections::BTreeSet;

/// Profile fields supplied when creating a seller.
#[derive(Debug, Clone, Default)]
pub struct NewSeller {
    /// Display name
    pub name: String,
    /// City the seller operates in
    pub city_id: i64,
    /// Referenced global categories
    pub global_category_ids: Vec<i64>,
    /// Business type; taken from the consumed request when absent
    pub business_type: Option<String>,
    /// Legal details; taken from the consumed request when absent
    pub legal_info: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// `WhatsApp` contact
    pub whatsapp: Option<String>,
}

/// Profile changes; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SellerUpdate {
    /// New name (slug follows)
    pub name: Option<String>,
    /// New city
    pub city_id: Option<i64>,
    /// New business type
    pub business_type: Option<String>,
    /// New legal details
    pub legal_info: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New address
    pub address: Option<String>,
    /// New phone
    pub phone: Option<String>,
    /// New `WhatsApp` contact
    pub whatsapp: Option<String>,
}

/// Filters for the staff seller list.
#[derive(Debug, Clone, Default)]
pub struct SellerFilter {
    /// Case-insensitive substring of name or slug
    pub query: Option<String>,
    /// Exact status
    pub status: Option<SellerStatus>,
    /// City
    pub city_id: Option<i64>,
    /// Referenced global category
    pub category_id: Option<i64>,
    /// Creator
    pub created_by: Option<i64>,
}

/// Which seller image slot to touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SellerImage {
    /// Square logo
    Logo,
    /// Wide cover image
    Cover,
}

/// Loads a seller row without any access check.
pub async fn load_seller<C>(db: &C, seller_id: i64) -> Result<seller::Model>
where
    C: ConnectionTrait,
{
    Seller::find_by_id(seller_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("seller", seller_id))
}

async fn check_city<C>(db: &C, actor: &Actor, city_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let city = City::find_by_id(city_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("city", city_id))?;
    if !city.is_active && !actor.is_owner() {
        return Err(Error::validation("city_id", format!("city {} is not active", city.slug)));
    }
    Ok(())
}

async fn check_global_categories<C>(db: &C, actor: &Actor, ids: &[i64]) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let unique: Vec<i64> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    if unique.is_empty() {
        return Ok(unique);
    }

    let found = Category::find()
        .filter(category::Column::Id.is_in(unique.clone()))
        .all(db)
        .await?;

    for id in &unique {
        let Some(cat) = found.iter().find(|c| c.id == *id) else {
            return Err(Error::not_found("category", id));
        };
        if !cat.is_global {
            return Err(Error::validation(
                "global_category_ids",
                format!("category {} is not global", cat.slug),
            ));
        }
        if !cat.is_active && !actor.is_owner() {
            return Err(Error::validation(
                "global_category_ids",
                format!("category {} is not active", cat.slug),
            ));
        }
    }
    Ok(unique)
}

async fn unique_seller_slug<C>(db: &C, name: &str, exclude: Option<i64>) -> Result<String>
where
    C: ConnectionTrait,
{
    let base = slug_for("name", name)?;
    let mut query = Seller::find()
        .select_only()
        .column(seller::Column::Slug)
        .filter(seller::Column::Slug.starts_with(base.as_str()));
    if let Some(id) = exclude {
        query = query.filter(seller::Column::Id.ne(id));
    }
    let taken: Vec<String> = query.into_tuple().all(db).await?;
    Ok(pick_unique(&base, &taken))
}

async fn replace_links<C>(db: &C, seller_id: i64, category_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    SellerGlobalCategory::delete_many()
        .filter(seller_global_category::Column::SellerId.eq(seller_id))
        .exec(db)
        .await?;

    if category_ids.is_empty() {
        return Ok(());
    }
    let links = category_ids.iter().map(|&category_id| seller_global_category::ActiveModel {
        seller_id: Set(seller_id),
        category_id: Set(category_id),
    });
    SellerGlobalCategory::insert_many(links)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Creates a seller in `draft`.
///
/// Managers must hold an approved, unused request; it is consumed in the same
/// transaction as the insert. Owner and admins create freely.
pub async fn create_seller(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewSeller,
) -> Result<seller::Model> {
    let creator = actor.require_staff()?;
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("name", "must not be empty"));
    }

    let txn = db.begin().await?;
    check_city(&txn, actor, input.city_id).await?;
    let category_ids = check_global_categories(&txn, actor, &input.global_category_ids).await?;

    let now = Utc::now();
    let request = if actor.can(Capability::CreateSellerFreely) {
        None
    } else {
        actor.require(Capability::CreateSellerWithRequest)?;
        let request = find_consumable(&txn, creator)
            .await?
            .ok_or(Error::NoApprovedRequest {
                manager_id: creator,
            })?;
        consume(&txn, creator, request.id, now).await?;
        Some(request)
    };

    let business_type = non_blank(input.business_type)
        .or_else(|| request.as_ref().map(|r| r.business_type.clone()));
    let legal_info =
        non_blank(input.legal_info).or_else(|| request.as_ref().map(|r| r.legal_info.clone()));

    let model = seller::ActiveModel {
        slug: Set(unique_seller_slug(&txn, &name, None).await?),
        name: Set(name),
        business_type: Set(business_type),
        legal_info: Set(legal_info),
        description: Set(non_blank(input.description)),
        address: Set(non_blank(input.address)),
        phone: Set(non_blank(input.phone)),
        whatsapp: Set(non_blank(input.whatsapp)),
        logo: Set(None),
        cover_image: Set(None),
        city_id: Set(input.city_id),
        status: Set(SellerStatus::Draft),
        activation_start_date: Set(None),
        activation_end_date: Set(None),
        average_rating: Set(0.0),
        total_ratings: Set(0),
        views_count: Set(0),
        created_by: Set(creator),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = model.insert(&txn).await?;
    replace_links(&txn, created.id, &category_ids).await?;
    txn.commit().await?;

    tracing::info!(
        seller_id = created.id,
        slug = %created.slug,
        created_by = creator,
        request_id = request.map(|r| r.id),
        "seller created"
    );
    Ok(created)
}

/// Applies profile changes. A new name regenerates the slug.
pub async fn update_seller(
    db: &DatabaseConnection,
    actor: &Actor,
    seller_id: i64,
    update: SellerUpdate,
) -> Result<seller::Model> {
    let current = load_seller(db, seller_id).await?;
    ensure_can_mutate(&current, actor)?;

    let mut active: seller::ActiveModel = current.clone().into();

    if let Some(name) = update.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("name", "must not be empty"));
        }
        if name != current.name {
            active.slug = Set(unique_seller_slug(db, &name, Some(seller_id)).await?);
            active.name = Set(name);
        }
    }
    if let Some(city_id) = update.city_id {
        if city_id != current.city_id {
            check_city(db, actor, city_id).await?;
            active.city_id = Set(city_id);
        }
    }
    if let Some(v) = update.business_type {
        active.business_type = Set(non_blank(Some(v)));
    }
    if let Some(v) = update.legal_info {
        active.legal_info = Set(non_blank(Some(v)));
    }
    if let Some(v) = update.description {
        active.description = Set(non_blank(Some(v)));
    }
    if let Some(v) = update.address {
        active.address = Set(non_blank(Some(v)));
    }
    if let Some(v) = update.phone {
        active.phone = Set(non_blank(Some(v)));
    }
    if let Some(v) = update.whatsapp {
        active.whatsapp = Set(non_blank(Some(v)));
    }
    active.updated_at = Set(Utc::now());

    Ok(active.update(db).await?)
}

/// Replaces the set of global categories a seller references.
pub async fn set_global_categories(
    db: &DatabaseConnection,
    actor: &Actor,
    seller_id: i64,
    category_ids: &[i64],
) -> Result<Vec<i64>> {
    let current = load_seller(db, seller_id).await?;
    ensure_can_mutate(&current, actor)?;

    let txn = db.begin().await?;
    let ids = check_global_categories(&txn, actor, category_ids).await?;
    replace_links(&txn, seller_id, &ids).await?;
    txn.commit().await?;
    Ok(ids)
}

/// Ids of the global categories a seller references.
pub async fn global_category_ids<C>(db: &C, seller_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    SellerGlobalCategory::find()
        .select_only()
        .column(seller_global_category::Column::CategoryId)
        .filter(seller_global_category::Column::SellerId.eq(seller_id))
        .order_by_asc(seller_global_category::Column::CategoryId)
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

/// A seller by id, if `viewer` may see it.
pub async fn get_seller(
    db: &DatabaseConnection,
    viewer: &Actor,
    seller_id: i64,
) -> Result<seller::Model> {
    let seller = load_seller(db, seller_id).await?;
    ensure_can_view(&seller, viewer, Utc::now())?;
    Ok(seller)
}

/// A seller by slug, if `viewer` may see it; counts one view.
pub async fn get_seller_by_slug(
    db: &DatabaseConnection,
    viewer: &Actor,
    slug: &str,
) -> Result<seller::Model> {
    let seller = Seller::find()
        .filter(seller::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("seller", slug))?;
    ensure_can_view(&seller, viewer, Utc::now())?;

    Seller::update_many()
        .col_expr(
            seller::Column::ViewsCount,
            Expr::col(seller::Column::ViewsCount).add(1),
        )
        .filter(seller::Column::Id.eq(seller.id))
        .exec(db)
        .await?;

    load_seller(db, seller.id).await
}

fn in_global_category(category_id: i64) -> SimpleExpr {
    seller::Column::Id.in_subquery(
        SellerGlobalCategory::find()
            .select_only()
            .column(seller_global_category::Column::SellerId)
            .filter(seller_global_category::Column::CategoryId.eq(category_id))
            .into_query(),
    )
}

/// Seller list with filters, restricted to what `viewer` may see. Newest first.
pub async fn list_sellers(
    db: &DatabaseConnection,
    viewer: &Actor,
    filter: SellerFilter,
) -> Result<Vec<seller::Model>> {
    let mut query = Seller::find().filter(visibility_condition(viewer, Utc::now()));

    if let Some(text) = non_blank(filter.query) {
        query = query.filter(
            Condition::any()
                .add(seller::Column::Name.contains(text.as_str()))
                .add(seller::Column::Slug.contains(text.as_str())),
        );
    }
    if let Some(status) = filter.status {
        query = query.filter(seller::Column::Status.eq(status));
    }
    if let Some(city_id) = filter.city_id {
        query = query.filter(seller::Column::CityId.eq(city_id));
    }
    if let Some(category_id) = filter.category_id {
        query = query.filter(in_global_category(category_id));
    }
    if let Some(created_by) = filter.created_by {
        query = query.filter(seller::Column::CreatedBy.eq(created_by));
    }

    query
        .order_by_desc(seller::Column::CreatedAt)
        .order_by_desc(seller::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Public catalogue, best rated first. `None` for `city_id` spans every city.
pub async fn list_sellers_by_city(
    db: &DatabaseConnection,
    viewer: &Actor,
    city_id: Option<i64>,
    category_id: Option<i64>,
) -> Result<Vec<seller::Model>> {
    let mut query = Seller::find().filter(visibility_condition(viewer, Utc::now()));
    if let Some(city_id) = city_id {
        query = query.filter(seller::Column::CityId.eq(city_id));
    }
    if let Some(category_id) = category_id {
        query = query.filter(in_global_category(category_id));
    }
    query
        .order_by_desc(seller::Column::AverageRating)
        .order_by_desc(seller::Column::TotalRatings)
        .order_by_asc(seller::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every seller one manager created. Staff, or the manager themself.
pub async fn list_sellers_by_manager(
    db: &DatabaseConnection,
    actor: &Actor,
    manager_id: i64,
) -> Result<Vec<seller::Model>> {
    let allowed = actor.can(Capability::ManageAnySeller) || actor.user_id() == Some(manager_id);
    if !allowed {
        return Err(Error::forbidden("may only list own sellers"));
    }
    Seller::find()
        .filter(seller::Column::CreatedBy.eq(manager_id))
        .order_by_desc(seller::Column::CreatedAt)
        .order_by_desc(seller::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a seller with its categories, products, links, ratings and
/// favorites, then removes its images best-effort.
pub async fn delete_seller(
    db: &DatabaseConnection,
    images: &dyn ImageStore,
    actor: &Actor,
    seller_id: i64,
) -> Result<()> {
    let seller = load_seller(db, seller_id).await?;
    ensure_can_mutate(&seller, actor)?;

    let product_images: Vec<Option<String>> = Product::find()
        .select_only()
        .column(product::Column::Image)
        .filter(product::Column::SellerId.eq(seller_id))
        .into_tuple()
        .all(db)
        .await?;

    let txn = db.begin().await?;
    Favorite::delete_many()
        .filter(favorite::Column::SellerId.eq(seller_id))
        .exec(&txn)
        .await?;
    SellerRating::delete_many()
        .filter(seller_rating::Column::SellerId.eq(seller_id))
        .exec(&txn)
        .await?;
    Product::delete_many()
        .filter(product::Column::SellerId.eq(seller_id))
        .exec(&txn)
        .await?;
    Category::delete_many()
        .filter(category::Column::SellerId.eq(seller_id))
        .exec(&txn)
        .await?;
    SellerGlobalCategory::delete_many()
        .filter(seller_global_category::Column::SellerId.eq(seller_id))
        .exec(&txn)
        .await?;
    Seller::delete_by_id(seller_id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(seller_id, actor = actor.role_name(), "seller deleted");

    remove_quietly(images, seller.logo.as_deref()).await;
    remove_quietly(images, seller.cover_image.as_deref()).await;
    for path in product_images.iter().flatten() {
        remove_quietly(images, Some(path)).await;
    }
    Ok(())
}

/// Stores a new logo or cover and drops the one it replaces.
pub async fn set_seller_image(
    db: &DatabaseConnection,
    images: &dyn ImageStore,
    actor: &Actor,
    seller_id: i64,
    slot: SellerImage,
    bytes: Vec<u8>,
) -> Result<seller::Model> {
    let current = load_seller(db, seller_id).await?;
    ensure_can_mutate(&current, actor)?;

    let path = images.store(bytes, MediaKind::Seller).await?;
    let (updated, previous) = write_image_slot(db, current, slot, Some(path)).await?;
    remove_quietly(images, previous.as_deref()).await;
    Ok(updated)
}

/// Clears a logo or cover and deletes the file.
pub async fn remove_seller_image(
    db: &DatabaseConnection,
    images: &dyn ImageStore,
    actor: &Actor,
    seller_id: i64,
    slot: SellerImage,
) -> Result<seller::Model> {
    let current = load_seller(db, seller_id).await?;
    ensure_can_mutate(&current, actor)?;

    let (updated, previous) = write_image_slot(db, current, slot, None).await?;
    remove_quietly(images, previous.as_deref()).await;
    Ok(updated)
}

async fn write_image_slot(
    db: &DatabaseConnection,
    current: seller::Model,
    slot: SellerImage,
    path: Option<String>,
) -> Result<(seller::Model, Option<String>)> {
    let previous = match slot {
        SellerImage::Logo => current.logo.clone(),
        SellerImage::Cover => current.cover_image.clone(),
    };
    let mut active: seller::ActiveModel = current.into();
    match slot {
        SellerImage::Logo => active.logo = Set(path),
        SellerImage::Cover => active.cover_image = Set(path),
    }
    active.updated_at = Set(Utc::now());
    Ok((active.update(db).await?, previous))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{lifecycle, seller_request},
        entities::{RequestStatus, Role, SellerRequest},
        test_utils::*,
    };
    use chrono::Duration;

    fn new_seller(name: &str, city_id: i64) -> NewSeller {
        NewSeller {
            name: name.to_string(),
            city_id,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_request_is_consumed_once() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let owner = create_test_owner(&db).await?;
        let manager = create_test_user(&db, "m@example.com", Role::Manager).await?;
        let city = create_test_city(&db, owner.id, "Paris", true).await?;
        let actor = Actor::Manager(manager.id);

        let none = create_seller(&db, &actor, new_seller("Bakery", city.id)).await;
        assert!(matches!(none, Err(Error::NoApprovedRequest { .. })));

        let request = seller_request::create_request(
            &db,
            &notifier,
            &actor,
            seller_request::NewSellerRequest {
                name: "Bakery".to_string(),
                business_type: "food".to_string(),
                legal_info: "SIRET 1".to_string(),
            },
        )
        .await?;
        seller_request::approve_request(&db, &notifier, &Actor::Owner(owner.id), request.id).await?;

        let seller = create_seller(&db, &actor, new_seller("Bakery", city.id)).await?;
        assert_eq!(seller.status, SellerStatus::Draft);
        assert_eq!(seller.created_by, manager.id);
        assert_eq!(seller.business_type.as_deref(), Some("food"));
        assert_eq!(seller.legal_info.as_deref(), Some("SIRET 1"));

        let used = SellerRequest::find_by_id(request.id).one(&db).await?.unwrap();
        assert!(used.is_used);
        assert!(used.used_at.is_some());
        assert_eq!(used.status, RequestStatus::Approved);

        let second = create_seller(&db, &actor, new_seller("Bakery Two", city.id)).await;
        assert!(matches!(second, Err(Error::NoApprovedRequest { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_create_keeps_request() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_owner(&db).await?;
        let manager = create_test_user(&db, "m@example.com", Role::Manager).await?;
        let city = create_test_city(&db, owner.id, "Paris", true).await?;
        let request =
            create_reviewed_request(&db, manager.id, "Bakery", RequestStatus::Approved, Utc::now())
                .await?;

        let bad = NewSeller {
            global_category_ids: vec![999],
            ..new_seller("Bakery", city.id)
        };
        let result = create_seller(&db, &Actor::Manager(manager.id), bad).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "category", .. })));

        let untouched = SellerRequest::find_by_id(request.id).one(&db).await?.unwrap();
        assert!(!untouched.is_used);
        Ok(())
    }

    #[tokio::test]
    async fn test_directory_checks_on_create() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_owner(&db).await?;
        let admin = create_test_user(&db, "a@example.com", Role::Admin).await?;
        let closed = create_test_city(&db, owner.id, "Closed", false).await?;
        let open = create_test_city(&db, owner.id, "Open", true).await?;
        let dormant = create_test_global_category(&db, owner.id, "Dormant", false).await?;

        let result = create_seller(&db, &Actor::Admin(admin.id), new_seller("A", closed.id)).await;
        assert!(matches!(result, Err(Error::Validation { field: "city_id", .. })));

        let owner_made = create_seller(&db, &Actor::Owner(owner.id), new_seller("A", closed.id)).await?;
        assert_eq!(owner_made.city_id, closed.id);

        let with_dormant = NewSeller {
            global_category_ids: vec![dormant.id],
            ..new_seller("B", open.id)
        };
        let result = create_seller(&db, &Actor::Admin(admin.id), with_dormant).await;
        assert!(matches!(result, Err(Error::Validation { field: "global_category_ids", .. })));

        let missing_city = create_seller(&db, &Actor::Owner(owner.id), new_seller("C", 4242)).await;
        assert!(matches!(missing_city, Err(Error::NotFound { entity: "city", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_non_latin_names_get_slugs() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_owner(&db).await?;
        let city = create_test_city(&db, owner.id, "Moscow", true).await?;
        let actor = Actor::Owner(owner.id);

        let cyrillic = create_seller(&db, &actor, new_seller("Москва", city.id)).await?;
        assert_eq!(cyrillic.slug, "moskva");
        assert_eq!(cyrillic.name, "Москва");

        let ligature = create_seller(&db, &actor, new_seller("Cœur de Bœuf", city.id)).await?;
        assert_eq!(ligature.slug, "coeur-de-boeuf");
        Ok(())
    }

    #[tokio::test]
    async fn test_slugs_are_unique_and_follow_renames() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_owner(&db).await?;
        let city = create_test_city(&db, owner.id, "Paris", true).await?;
        let actor = Actor::Owner(owner.id);

        let first = create_seller(&db, &actor, new_seller("Chez Marie", city.id)).await?;
        let second = create_seller(&db, &actor, new_seller("Chez  Marie!", city.id)).await?;
        assert_eq!(first.slug, "chez-marie");
        assert_eq!(second.slug, "chez-marie-1");

        let renamed = update_seller(
            &db,
            &actor,
            first.id,
            SellerUpdate {
                name: Some("Chez Marie".to_string()),
                phone: Some("+33 1".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(renamed.slug, "chez-marie");
        assert_eq!(renamed.phone.as_deref(), Some("+33 1"));

        let renamed = update_seller(
            &db,
            &actor,
            second.id,
            SellerUpdate {
                name: Some("Chez Paul".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(renamed.slug, "chez-paul");
        Ok(())
    }

    #[tokio::test]
    async fn test_reads_respect_visibility() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let owner = create_test_owner(&db).await?;
        let alice = create_test_user(&db, "alice@example.com", Role::Manager).await?;
        let bob = create_test_user(&db, "bob@example.com", Role::Manager).await?;
        let city = create_test_city(&db, owner.id, "Paris", true).await?;

        let draft = create_test_seller(&db, alice.id, city.id, "Draft Shop").await?;
        let live = create_test_seller(&db, alice.id, city.id, "Live Shop").await?;
        lifecycle::activate(&db, &notifier, &Actor::Owner(owner.id), live.id, Some(1)).await?;

        assert!(get_seller(&db, &Actor::Manager(alice.id), draft.id).await.is_ok());
        assert!(matches!(
            get_seller(&db, &Actor::Manager(bob.id), draft.id).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            get_seller(&db, &Actor::Anonymous, 777).await,
            Err(Error::NotFound { .. })
        ));

        let seen = get_seller_by_slug(&db, &Actor::Anonymous, "live-shop").await?;
        assert_eq!(seen.views_count, 1);
        assert!(matches!(
            get_seller_by_slug(&db, &Actor::Anonymous, "draft-shop").await,
            Err(Error::Forbidden { .. })
        ));
        assert_eq!(load_seller(&db, draft.id).await?.views_count, 0);

        let bob_view = list_sellers(&db, &Actor::Manager(bob.id), SellerFilter::default()).await?;
        assert_eq!(bob_view.iter().map(|s| s.id).collect::<Vec<_>>(), vec![live.id]);
        let alice_view = list_sellers(&db, &Actor::Manager(alice.id), SellerFilter::default()).await?;
        assert_eq!(alice_view.len(), 2);
        let public = list_sellers_by_city(&db, &Actor::Anonymous, Some(city.id), None).await?;
        assert_eq!(public.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_filters_and_ordering() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_owner(&db).await?;
        let city = create_test_city(&db, owner.id, "Paris", true).await?;
        let food = create_test_global_category(&db, owner.id, "Food", true).await?;
        let now = Utc::now();
        let window = (Some(now - Duration::days(1)), Some(now + Duration::days(10)));

        let low = create_test_seller_with_window(&db, owner.id, city.id, "Low", SellerStatus::Active, window.0, window.1).await?;
        let high = create_test_seller_with_window(&db, owner.id, city.id, "High", SellerStatus::Active, window.0, window.1).await?;
        set_rating_stats(&db, low.id, 3.0, 4).await?;
        set_rating_stats(&db, high.id, 4.5, 2).await?;
        link_global_category(&db, high.id, food.id).await?;

        let ranked = list_sellers_by_city(&db, &Actor::Anonymous, Some(city.id), None).await?;
        assert_eq!(ranked.iter().map(|s| s.id).collect::<Vec<_>>(), vec![high.id, low.id]);

        let in_food = list_sellers_by_city(&db, &Actor::Anonymous, Some(city.id), Some(food.id)).await?;
        assert_eq!(in_food.len(), 1);

        let lyon = create_test_city(&db, owner.id, "Lyon", true).await?;
        let elsewhere = create_test_seller_with_window(&db, owner.id, lyon.id, "Elsewhere", SellerStatus::Active, window.0, window.1).await?;
        let everywhere = list_sellers_by_city(&db, &Actor::Anonymous, None, None).await?;
        assert_eq!(
            everywhere.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![high.id, low.id, elsewhere.id]
        );
        assert_eq!(list_sellers_by_city(&db, &Actor::Anonymous, Some(city.id), None).await?.len(), 2);

        let by_text = list_sellers(
            &db,
            &Actor::Owner(owner.id),
            SellerFilter {
                query: Some("hig".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(by_text.len(), 1);

        let drafts = list_sellers(
            &db,
            &Actor::Owner(owner.id),
            SellerFilter {
                status: Some(SellerStatus::Draft),
                ..Default::default()
            },
        )
        .await?;
        assert!(drafts.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_global_category_replacement() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_owner(&db).await?;
        let manager = create_test_user(&db, "m@example.com", Role::Manager).await?;
        let city = create_test_city(&db, owner.id, "Paris", true).await?;
        let food = create_test_global_category(&db, owner.id, "Food", true).await?;
        let drinks = create_test_global_category(&db, owner.id, "Drinks", true).await?;
        let seller = create_test_seller(&db, manager.id, city.id, "Shop").await?;
        let actor = Actor::Manager(manager.id);

        set_global_categories(&db, &actor, seller.id, &[drinks.id, food.id, food.id]).await?;
        assert_eq!(global_category_ids(&db, seller.id).await?, vec![food.id, drinks.id]);

        set_global_categories(&db, &actor, seller.id, &[drinks.id]).await?;
        assert_eq!(global_category_ids(&db, seller.id).await?, vec![drinks.id]);

        let other = create_test_user(&db, "o@example.com", Role::Manager).await?;
        let result = set_global_categories(&db, &Actor::Manager(other.id), seller.id, &[]).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cascades_and_removes_images() -> Result<()> {
        let db = setup_test_db().await?;
        let images = MemoryImageStore::default();
        let owner = create_test_owner(&db).await?;
        let city = create_test_city(&db, owner.id, "Paris", true).await?;
        let food = create_test_global_category(&db, owner.id, "Food", true).await?;
        let seller = create_test_seller(&db, owner.id, city.id, "Shop").await?;
        let actor = Actor::Owner(owner.id);
        link_global_category(&db, seller.id, food.id).await?;

        let with_logo = set_seller_image(&db, &images, &actor, seller.id, SellerImage::Logo, vec![1]).await?;
        let first_logo = with_logo.logo.clone().unwrap();
        let replaced = set_seller_image(&db, &images, &actor, seller.id, SellerImage::Logo, vec![2]).await?;
        assert_ne!(replaced.logo.as_deref(), Some(first_logo.as_str()));
        assert_eq!(images.removed(), vec![first_logo]);

        delete_seller(&db, &images, &actor, seller.id).await?;
        assert!(matches!(load_seller(&db, seller.id).await, Err(Error::NotFound { .. })));
        assert!(global_category_ids(&db, seller.id).await?.is_empty());
        assert_eq!(images.removed().len(), 2);
        Ok(())
    }
}
