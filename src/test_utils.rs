//! Shared test utilities.
//!
//! Provides an in-memory database and helpers that insert rows directly, so
//! tests can set up any seller state without going through the role gates
//! they are trying to exercise.

#![allow(clippy::unwrap_used)]

use crate::{
    core::slug::slugify,
    entities::{
        Role, Seller, SellerStatus, category, city, seller, seller_global_category,
        seller_request, user, RequestStatus,
    },
    errors::{Error, Result},
    media::{ImageStore, MediaKind, URL_PREFIX},
    notify::{Notification, Notifier},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, Set, prelude::*, sea_query::Expr};
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Inserts the owner account `owner@example.com`.
pub async fn create_test_owner(db: &DatabaseConnection) -> Result<user::Model> {
    create_test_user(db, "owner@example.com", Role::Owner).await
}

/// Inserts an active staff user named after the local part of `email`.
pub async fn create_test_user(db: &DatabaseConnection, email: &str, role: Role) -> Result<user::Model> {
    let name = email.split('@').next().unwrap_or(email).to_string();
    let model = user::ActiveModel {
        email: Set(email.to_string()),
        name: Set(name),
        role: Set(role),
        is_active: Set(true),
        created_by: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Inserts a city.
pub async fn create_test_city(
    db: &DatabaseConnection,
    created_by: i64,
    name: &str,
    is_active: bool,
) -> Result<city::Model> {
    let model = city::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slugify(name)),
        is_active: Set(is_active),
        created_by: Set(created_by),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Inserts a global category.
pub async fn create_test_global_category(
    db: &DatabaseConnection,
    created_by: i64,
    name: &str,
    is_active: bool,
) -> Result<category::Model> {
    let model = category::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slugify(name)),
        description: Set(None),
        is_global: Set(true),
        is_active: Set(is_active),
        seller_id: Set(None),
        created_by: Set(created_by),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Inserts a draft seller without an activation window.
pub async fn create_test_seller(
    db: &DatabaseConnection,
    created_by: i64,
    city_id: i64,
    name: &str,
) -> Result<seller::Model> {
    create_test_seller_with_window(db, created_by, city_id, name, SellerStatus::Draft, None, None)
        .await
}

/// Inserts a seller in any status with the given window.
pub async fn create_test_seller_with_window(
    db: &DatabaseConnection,
    created_by: i64,
    city_id: i64,
    name: &str,
    status: SellerStatus,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<seller::Model> {
    let now = Utc::now();
    let model = seller::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slugify(name)),
        business_type: Set(None),
        legal_info: Set(None),
        description: Set(None),
        address: Set(None),
        phone: Set(None),
        whatsapp: Set(None),
        logo: Set(None),
        cover_image: Set(None),
        city_id: Set(city_id),
        status: Set(status),
        activation_start_date: Set(start),
        activation_end_date: Set(end),
        average_rating: Set(0.0),
        total_ratings: Set(0),
        views_count: Set(0),
        created_by: Set(created_by),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Links a seller to a global category.
pub async fn link_global_category(
    db: &DatabaseConnection,
    seller_id: i64,
    category_id: i64,
) -> Result<()> {
    seller_global_category::Entity::insert(seller_global_category::ActiveModel {
        seller_id: Set(seller_id),
        category_id: Set(category_id),
    })
    .exec_without_returning(db)
    .await?;
    Ok(())
}

/// Overwrites a seller's rating aggregate.
pub async fn set_rating_stats(
    db: &DatabaseConnection,
    seller_id: i64,
    average: f64,
    total: i32,
) -> Result<()> {
    Seller::update_many()
        .col_expr(seller::Column::AverageRating, Expr::value(average))
        .col_expr(seller::Column::TotalRatings, Expr::value(total))
        .filter(seller::Column::Id.eq(seller_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Inserts an already reviewed, unused request.
pub async fn create_reviewed_request(
    db: &DatabaseConnection,
    manager_id: i64,
    name: &str,
    status: RequestStatus,
    reviewed_at: DateTime<Utc>,
) -> Result<seller_request::Model> {
    let model = seller_request::ActiveModel {
        name: Set(name.to_string()),
        business_type: Set("retail".to_string()),
        legal_info: Set("n/a".to_string()),
        status: Set(status),
        requested_by: Set(manager_id),
        reviewed_by: Set(None),
        reviewed_at: Set(Some(reviewed_at)),
        rejection_reason: Set(None),
        is_used: Set(false),
        used_at: Set(None),
        created_at: Set(reviewed_at),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// An unsaved seller row for pure predicate tests.
#[must_use]
pub fn seller_fixture(
    created_by: i64,
    status: SellerStatus,
    end: Option<DateTime<Utc>>,
) -> seller::Model {
    let now = Utc::now();
    seller::Model {
        id: 1,
        name: "Fixture".to_string(),
        slug: "fixture".to_string(),
        business_type: None,
        legal_info: None,
        description: None,
        address: None,
        phone: None,
        whatsapp: None,
        logo: None,
        cover_image: None,
        city_id: 1,
        status,
        activation_start_date: end.map(|e| e - Duration::days(30)),
        activation_end_date: end,
        average_rating: 0.0,
        total_ratings: 0,
        views_count: 0,
        created_by,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Notifier that keeps every delivery for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Vec<String>, Notification)>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Records deliveries, then reports each one as failed.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    /// Everything delivered so far, in order.
    pub fn sent(&self) -> Vec<(Vec<String>, Notification)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipients: &[String], notification: &Notification) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipients.to_vec(), notification.clone()));
        if self.fail {
            return Err(Error::Io(std::io::Error::other("mail relay unavailable")));
        }
        Ok(())
    }
}

/// Image store that hands out fake paths and remembers removals.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    next: AtomicUsize,
    removed: Mutex<Vec<String>>,
}

impl MemoryImageStore {
    /// Paths passed to `remove`, in order.
    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn store(&self, _bytes: Vec<u8>, kind: MediaKind) -> Result<String> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{URL_PREFIX}/{}/mem-{n}.webp", kind.dir()))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.removed.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
