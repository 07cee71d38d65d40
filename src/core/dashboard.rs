//! Dashboard statistics for the admin panel.

use crate::{
    core::access::{Actor, Capability},
    entities::{
        RequestStatus, Role, Seller, SellerRequest, SellerStatus, User, seller, seller_request,
        user,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;

/// Seller counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SellerCounts {
    /// All sellers in scope
    pub total: u64,
    /// `active`
    pub active: u64,
    /// `draft`
    pub draft: u64,
    /// `expired`
    pub expired: u64,
    /// `inactive`
    pub inactive: u64,
}

/// Request counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestCounts {
    /// `pending`
    pub pending: u64,
    /// `approved`
    pub approved: u64,
    /// `rejected`
    pub rejected: u64,
}

/// Overview shown on the dashboard landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Overview {
    /// Seller counts
    pub sellers: SellerCounts,
    /// Request counts
    pub requests: RequestCounts,
}

/// Per-manager line of the staff dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerStats {
    /// Manager user id
    pub manager_id: i64,
    /// Manager name
    pub name: String,
    /// Manager email
    pub email: String,
    /// Sellers created by the manager
    pub total_sellers: u64,
    /// Of which active
    pub active_sellers: u64,
    /// Request counts
    pub requests: RequestCounts,
}

async fn count_sellers(db: &DatabaseConnection, manager_id: Option<i64>) -> Result<SellerCounts> {
    let mut query = Seller::find()
        .select_only()
        .column(seller::Column::Status)
        .column_as(seller::Column::Id.count(), "n")
        .group_by(seller::Column::Status);
    if let Some(id) = manager_id {
        query = query.filter(seller::Column::CreatedBy.eq(id));
    }
    let rows: Vec<(SellerStatus, i64)> = query.into_tuple().all(db).await?;

    let mut counts = SellerCounts::default();
    for (status, n) in rows {
        let n = u64::try_from(n).unwrap_or(0);
        counts.total += n;
        match status {
            SellerStatus::Active => counts.active = n,
            SellerStatus::Draft => counts.draft = n,
            SellerStatus::Expired => counts.expired = n,
            SellerStatus::Inactive => counts.inactive = n,
        }
    }
    Ok(counts)
}

async fn count_requests(db: &DatabaseConnection, manager_id: Option<i64>) -> Result<RequestCounts> {
    let mut query = SellerRequest::find()
        .select_only()
        .column(seller_request::Column::Status)
        .column_as(seller_request::Column::Id.count(), "n")
        .group_by(seller_request::Column::Status);
    if let Some(id) = manager_id {
        query = query.filter(seller_request::Column::RequestedBy.eq(id));
    }
    let rows: Vec<(RequestStatus, i64)> = query.into_tuple().all(db).await?;

    let mut counts = RequestCounts::default();
    for (status, n) in rows {
        let n = u64::try_from(n).unwrap_or(0);
        match status {
            RequestStatus::Pending => counts.pending = n,
            RequestStatus::Approved => counts.approved = n,
            RequestStatus::Rejected => counts.rejected = n,
        }
    }
    Ok(counts)
}

/// System-wide overview for owner and admins, own scope for managers.
pub async fn overview(db: &DatabaseConnection, actor: &Actor) -> Result<Overview> {
    let scope = match actor {
        Actor::Owner(_) | Actor::Admin(_) => None,
        Actor::Manager(id) => Some(*id),
        Actor::Client(_) | Actor::Anonymous => {
            return Err(Error::forbidden("dashboard requires a staff account"));
        }
    };
    Ok(Overview {
        sellers: count_sellers(db, scope).await?,
        requests: count_requests(db, scope).await?,
    })
}

/// One line per manager, by name. Owner and admins only.
pub async fn manager_stats(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<ManagerStats>> {
    actor.require(Capability::ManageAnySeller)?;

    let managers = User::find()
        .filter(user::Column::Role.eq(Role::Manager))
        .order_by_asc(user::Column::Name)
        .all(db)
        .await?;

    let mut stats = Vec::with_capacity(managers.len());
    for manager in managers {
        let sellers = count_sellers(db, Some(manager.id)).await?;
        stats.push(ManagerStats {
            manager_id: manager.id,
            name: manager.name,
            email: manager.email,
            total_sellers: sellers.total,
            active_sellers: sellers.active,
            requests: count_requests(db, Some(manager.id)).await?,
        });
    }
    Ok(stats)
}
