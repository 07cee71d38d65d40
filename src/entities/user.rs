//! User entity - staff accounts (owner, admins, managers).
//!
//! Exactly one owner exists system-wide; it is created by the startup
//! bootstrap and can never be duplicated through user creation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Staff role
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The single system owner
    #[sea_orm(string_value = "owner")]
    Owner,
    /// Full control over sellers, directory and requests
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Self-service seller management for own sellers
    #[sea_orm(string_value = "manager")]
    Manager,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Manager => "manager",
        })
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login and notification address
    pub email: String,
    /// Display name
    pub name: String,
    /// Staff role
    pub role: Role,
    /// Disabled accounts keep their sellers but receive no notifications
    pub is_active: bool,
    /// User who created this account (None for the bootstrapped owner)
    pub created_by: Option<i64>,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// `User` relationships are declared from the referencing side
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
