//! Staff accounts, owner bootstrap and OAuth-resolved clients.

use crate::{
    core::access::{Actor, Capability},
    entities::{City, Client, Role, User, city, client, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Creates the single owner account unless one already exists.
///
/// Returns `Some` with the new owner on first start and `None` afterwards,
/// so it is safe to call on every boot.
pub async fn bootstrap_owner(
    db: &DatabaseConnection,
    email: &str,
    name: &str,
) -> Result<Option<user::Model>> {
    let existing = User::find()
        .filter(user::Column::Role.eq(Role::Owner))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(None);
    }

    let owner = insert_user(db, email, name, Role::Owner, None).await?;
    tracing::info!(user_id = owner.id, email = %owner.email, "owner account created");
    Ok(Some(owner))
}

/// Creates an admin or manager account. Owner only.
pub async fn create_user(
    db: &DatabaseConnection,
    actor: &Actor,
    email: &str,
    name: &str,
    role: Role,
) -> Result<user::Model> {
    actor.require(Capability::ManageUsers)?;
    if role == Role::Owner {
        return Err(Error::Conflict {
            message: "an owner account already exists".to_string(),
        });
    }
    insert_user(db, email, name, role, actor.user_id()).await
}

async fn insert_user(
    db: &DatabaseConnection,
    email: &str,
    name: &str,
    role: Role,
    created_by: Option<i64>,
) -> Result<user::Model> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::validation("email", "must be a valid email address"));
    }
    if name.trim().is_empty() {
        return Err(Error::validation("name", "must not be empty"));
    }

    let duplicate = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(Error::Conflict {
            message: format!("a user with email {email} already exists"),
        });
    }

    let model = user::ActiveModel {
        email: Set(email),
        name: Set(name.trim().to_string()),
        role: Set(role),
        is_active: Set(true),
        created_by: Set(created_by),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Looks up a staff user by id.
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))
}

/// Resolves the [`Actor`] for an active staff account.
pub async fn actor_for_user(db: &DatabaseConnection, user_id: i64) -> Result<Actor> {
    let user = get_user(db, user_id).await?;
    if !user.is_active {
        return Err(Error::forbidden("account is deactivated"));
    }
    Ok(Actor::staff(user.role, user.id))
}

/// Email addresses of the owner and every active admin.
pub async fn staff_recipients<C>(db: &C) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    let staff = User::find()
        .filter(user::Column::Role.is_in([Role::Owner, Role::Admin]))
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;
    Ok(staff.into_iter().map(|u| u.email).collect())
}

/// Email of one user, if the account still exists.
pub async fn user_email<C>(db: &C, user_id: i64) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    Ok(User::find_by_id(user_id).one(db).await?.map(|u| u.email))
}

/// [`user_email`] as a recipient list for notifications sent after a write.
/// A failed lookup is logged and yields no recipients.
pub async fn user_recipients_quietly<C>(db: &C, user_id: i64) -> Vec<String>
where
    C: ConnectionTrait,
{
    match user_email(db, user_id).await {
        Ok(email) => email.into_iter().collect(),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "could not resolve notification recipient");
            Vec::new()
        }
    }
}

/// [`staff_recipients`], logging and yielding none on failure.
pub async fn staff_recipients_quietly<C>(db: &C) -> Vec<String>
where
    C: ConnectionTrait,
{
    staff_recipients(db).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not resolve staff recipients");
        Vec::new()
    })
}

/// Registers a client from a resolved OAuth identity, refreshing email and
/// name when the subject is already known.
pub async fn upsert_client(
    db: &DatabaseConnection,
    google_id: &str,
    email: &str,
    name: &str,
) -> Result<client::Model> {
    if google_id.trim().is_empty() {
        return Err(Error::validation("google_id", "must not be empty"));
    }

    let existing = Client::find()
        .filter(client::Column::GoogleId.eq(google_id))
        .one(db)
        .await?;

    match existing {
        Some(found) => {
            let mut active: client::ActiveModel = found.into();
            active.email = Set(email.to_string());
            active.name = Set(name.to_string());
            Ok(active.update(db).await?)
        }
        None => {
            let model = client::ActiveModel {
                google_id: Set(google_id.to_string()),
                email: Set(email.to_string()),
                name: Set(name.to_string()),
                city_id: Set(None),
                created_at: Set(Utc::now()),
                ..Default::default()
            };
            let created = model.insert(db).await?;
            tracing::info!(client_id = created.id, "client registered");
            Ok(created)
        }
    }
}

/// Looks up a client by id.
pub async fn get_client<C>(db: &C, client_id: i64) -> Result<client::Model>
where
    C: ConnectionTrait,
{
    Client::find_by_id(client_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("client", client_id))
}

/// Sets the client's preferred city; it must exist and be active.
pub async fn set_client_city(
    db: &DatabaseConnection,
    actor: &Actor,
    city_id: i64,
) -> Result<client::Model> {
    let client_id = actor.require_client()?;
    let city = City::find_by_id(city_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("city", city_id))?;
    if !city.is_active {
        return Err(Error::validation("city_id", "city is not active"));
    }

    let found = get_client(db, client_id).await?;
    let mut active: client::ActiveModel = found.into();
    active.city_id = Set(Some(city.id));
    Ok(active.update(db).await?)
}

/// Preferred city of a client, if any.
pub async fn client_city(db: &DatabaseConnection, client_id: i64) -> Result<Option<city::Model>> {
    let client = get_client(db, client_id).await?;
    match client.city_id {
        Some(id) => Ok(City::find_by_id(id).one(db).await?),
        None => Ok(None),
    }
}
