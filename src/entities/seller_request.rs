//! Seller request entity - a manager's application to open a seller.
//!
//! Reviewed exactly once (approved or rejected). An approved request can back
//! exactly one seller creation, after which `is_used` is set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review status of a seller request
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for an owner or admin
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted; may be consumed once
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Declined with a reason
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

/// Seller request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seller_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Proposed seller name
    pub name: String,
    /// Kind of business
    pub business_type: String,
    /// Minimal legal details
    pub legal_info: String,
    /// Review status
    pub status: RequestStatus,
    /// Manager who submitted the request
    pub requested_by: i64,
    /// Owner or admin who reviewed it
    pub reviewed_by: Option<i64>,
    /// When it was reviewed
    pub reviewed_at: Option<DateTimeUtc>,
    /// Reason given on rejection
    pub rejection_reason: Option<String>,
    /// Whether a seller was already created from it
    pub is_used: bool,
    /// When it was consumed
    pub used_at: Option<DateTimeUtc>,
    /// When it was submitted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between SellerRequest and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Submitting manager
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RequestedBy",
        to = "super::user::Column::Id"
    )]
    Requester,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requester.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
