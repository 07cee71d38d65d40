//! Seller entity - the central marketplace listing.
//!
//! A seller belongs to one city, references a set of global categories (via
//! `seller_global_categories`), owns its local categories and products, and
//! moves through the `draft → active → expired/inactive → draft` lifecycle.
//! `created_by` is fixed at creation and drives manager-scoped access.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a seller
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum SellerStatus {
    /// Hidden, editable; the state every seller is created in
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Publicly listed while the activation window is open
    #[sea_orm(string_value = "active")]
    Active,
    /// Paid period ran out (set by the expiration sweep)
    #[sea_orm(string_value = "expired")]
    Expired,
    /// Manually switched off by an owner or admin
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

impl SellerStatus {
    /// Lowercase name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for SellerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seller database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sellers")]
pub struct Model {
    /// Unique identifier for the seller
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// URL slug derived from the name, unique across sellers
    #[sea_orm(unique)]
    pub slug: String,
    /// Business type carried over from the onboarding request
    pub business_type: Option<String>,
    /// Minimal legal details carried over from the onboarding request
    pub legal_info: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// `WhatsApp` contact
    pub whatsapp: Option<String>,
    /// Stored logo asset path
    pub logo: Option<String>,
    /// Stored cover image asset path
    pub cover_image: Option<String>,
    /// City the seller operates in
    pub city_id: i64,
    /// Lifecycle status
    pub status: SellerStatus,
    /// Start of the paid activation window
    pub activation_start_date: Option<DateTimeUtc>,
    /// End of the paid activation window
    pub activation_end_date: Option<DateTimeUtc>,
    /// Average client rating, 0-5 with one decimal
    pub average_rating: f64,
    /// Number of client ratings
    pub total_ratings: i32,
    /// Public detail page views
    pub views_count: i64,
    /// User (owner, admin or manager) who created the seller
    pub created_by: i64,
    /// Optimistic lock counter, bumped on every status write
    pub version: i32,
    /// When the seller was created
    pub created_at: DateTimeUtc,
    /// When the seller was last modified
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// True when the activation window has an end that lies after `now`.
    #[must_use]
    pub fn has_open_window(&self, now: DateTime<Utc>) -> bool {
        self.activation_end_date.is_some_and(|end| end > now)
    }

    /// The public floor: active and inside the activation window.
    #[must_use]
    pub fn is_publicly_listed(&self, now: DateTime<Utc>) -> bool {
        self.status == SellerStatus::Active && self.has_open_window(now)
    }
}

/// Defines relationships between Seller and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each seller is located in one city
    #[sea_orm(
        belongs_to = "super::city::Entity",
        from = "Column::CityId",
        to = "super::city::Column::Id"
    )]
    City,
    /// Each seller was created by one staff user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
    /// One seller has many products
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
    /// One seller owns many local categories
    #[sea_orm(has_many = "super::category::Entity")]
    LocalCategories,
    /// Links to referenced global categories
    #[sea_orm(has_many = "super::seller_global_category::Entity")]
    GlobalCategoryLinks,
}

impl Related<super::city::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::City.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::seller_global_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GlobalCategoryLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
