//! City directory. Switching a city off sends every seller in it back to draft.

use crate::{
    core::{
        access::{Actor, Capability},
        lifecycle::{DirectoryEvent, apply_directory_event},
        slug::{pick_unique, slug_for},
    },
    entities::{City, city},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};

async fn unique_city_slug<C>(db: &C, name: &str, exclude: Option<i64>) -> Result<String>
where
    C: ConnectionTrait,
{
    let base = slug_for("name", name)?;
    let mut query = City::find()
        .select_only()
        .column(city::Column::Slug)
        .filter(city::Column::Slug.starts_with(base.as_str()));
    if let Some(id) = exclude {
        query = query.filter(city::Column::Id.ne(id));
    }
    let taken: Vec<String> = query.into_tuple().all(db).await?;
    Ok(pick_unique(&base, &taken))
}

async fn load_city<C>(db: &C, city_id: i64) -> Result<city::Model>
where
    C: ConnectionTrait,
{
    City::find_by_id(city_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("city", city_id))
}

/// Creates an inactive city.
pub async fn create_city(db: &DatabaseConnection, actor: &Actor, name: &str) -> Result<city::Model> {
    actor.require(Capability::ManageDirectory)?;
    let creator = actor.require_staff()?;
    let name = name.trim();

    let model = city::ActiveModel {
        slug: Set(unique_city_slug(db, name, None).await?),
        name: Set(name.to_string()),
        is_active: Set(false),
        created_by: Set(creator),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    tracing::info!(city_id = created.id, slug = %created.slug, "city created");
    Ok(created)
}

/// Every city, newest first. Staff only.
pub async fn list_cities(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<city::Model>> {
    actor.require(Capability::ManageDirectory)?;
    City::find()
        .order_by_desc(city::Column::CreatedAt)
        .order_by_desc(city::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active cities by name, for public pickers.
pub async fn list_active_cities(db: &DatabaseConnection) -> Result<Vec<city::Model>> {
    City::find()
        .filter(city::Column::IsActive.eq(true))
        .order_by_asc(city::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// A city by slug.
pub async fn get_city_by_slug(db: &DatabaseConnection, slug: &str) -> Result<city::Model> {
    City::find()
        .filter(city::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("city", slug))
}

/// Renames a city; the slug follows the name.
pub async fn rename_city(
    db: &DatabaseConnection,
    actor: &Actor,
    city_id: i64,
    name: &str,
) -> Result<city::Model> {
    actor.require(Capability::ManageDirectory)?;
    let current = load_city(db, city_id).await?;
    let name = name.trim();
    if name == current.name {
        return Ok(current);
    }

    let slug = unique_city_slug(db, name, Some(city_id)).await?;
    let mut active: city::ActiveModel = current.into();
    active.name = Set(name.to_string());
    active.slug = Set(slug);
    Ok(active.update(db).await?)
}

/// Sets the active flag. Turning an active city off forces its sellers to
/// draft in the same transaction; turning it on restores nothing.
pub async fn set_city_active(
    db: &DatabaseConnection,
    actor: &Actor,
    city_id: i64,
    is_active: bool,
) -> Result<city::Model> {
    actor.require(Capability::ManageDirectory)?;

    let txn = db.begin().await?;
    let current = load_city(&txn, city_id).await?;
    let was_active = current.is_active;

    let mut active: city::ActiveModel = current.into();
    active.is_active = Set(is_active);
    let updated = active.update(&txn).await?;

    if was_active && !is_active {
        apply_directory_event(&txn, DirectoryEvent::CityDeactivated(city_id)).await?;
    }
    txn.commit().await?;

    tracing::info!(city_id, is_active, "city status changed");
    Ok(updated)
}

/// Flips the active flag. See [`set_city_active`].
pub async fn toggle_city(db: &DatabaseConnection, actor: &Actor, city_id: i64) -> Result<city::Model> {
    let current = load_city(db, city_id).await?;
    set_city_active(db, actor, city_id, !current.is_active).await
}
