//! City entity - directory data every seller points at.
//!
//! Cities start inactive. Deactivating a city pushes its non-draft sellers
//! back to draft.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// City database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cities")]
pub struct Model {
    /// Unique identifier for the city
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// URL slug, unique across cities
    #[sea_orm(unique)]
    pub slug: String,
    /// Whether sellers may be placed here by non-owners and be listed
    pub is_active: bool,
    /// Staff user who created the city
    pub created_by: i64,
    /// When the city was created
    pub created_at: DateTimeUtc,
}

/// `City` relationships are declared from the referencing side
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
