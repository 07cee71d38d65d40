//! Seller onboarding requests.
//!
//! A manager asks for a seller, staff approve or reject it, and an approved
//! request can be consumed exactly once by [`crate::core::seller::create_seller`].

use crate::{
    core::{
        access::{Actor, Capability},
        user::{staff_recipients_quietly, user_recipients_quietly},
    },
    entities::{RequestStatus, SellerRequest, seller_request},
    errors::{Error, Result},
    notify::{Notification, Notifier, dispatch},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};

/// Fields a manager submits.
#[derive(Debug, Clone, Default)]
pub struct NewSellerRequest {
    /// Proposed seller name
    pub name: String,
    /// Kind of business
    pub business_type: String,
    /// Minimal legal details
    pub legal_info: String,
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Submits a request and tells the owner and every admin about it.
pub async fn create_request(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    actor: &Actor,
    input: NewSellerRequest,
) -> Result<seller_request::Model> {
    actor.require(Capability::SubmitRequests)?;
    let manager_id = actor.require_staff()?;

    let model = seller_request::ActiveModel {
        name: Set(required("name", &input.name)?),
        business_type: Set(required("business_type", &input.business_type)?),
        legal_info: Set(required("legal_info", &input.legal_info)?),
        status: Set(RequestStatus::Pending),
        requested_by: Set(manager_id),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        rejection_reason: Set(None),
        is_used: Set(false),
        used_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let request = model.insert(db).await?;
    tracing::info!(request_id = request.id, manager_id, "seller request submitted");

    let requested_by = user_recipients_quietly(db, manager_id)
        .await
        .pop()
        .unwrap_or_else(|| format!("manager {manager_id}"));
    dispatch(
        notifier,
        &staff_recipients_quietly(db).await,
        Notification::NewRequest {
            seller_name: request.name.clone(),
            business_type: request.business_type.clone(),
            requested_by,
        },
    )
    .await;

    Ok(request)
}

/// The calling manager's own requests, newest first.
pub async fn list_my_requests(
    db: &DatabaseConnection,
    actor: &Actor,
    status: Option<RequestStatus>,
) -> Result<Vec<seller_request::Model>> {
    actor.require(Capability::SubmitRequests)?;
    let manager_id = actor.require_staff()?;

    let mut query = SellerRequest::find().filter(seller_request::Column::RequestedBy.eq(manager_id));
    if let Some(status) = status {
        query = query.filter(seller_request::Column::Status.eq(status));
    }
    query
        .order_by_desc(seller_request::Column::CreatedAt)
        .order_by_desc(seller_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every request, optionally narrowed by status and manager. Staff only.
pub async fn list_requests(
    db: &DatabaseConnection,
    actor: &Actor,
    status: Option<RequestStatus>,
    manager_id: Option<i64>,
) -> Result<Vec<seller_request::Model>> {
    actor.require(Capability::ReviewRequests)?;

    let mut query = SellerRequest::find();
    if let Some(status) = status {
        query = query.filter(seller_request::Column::Status.eq(status));
    }
    if let Some(manager_id) = manager_id {
        query = query.filter(seller_request::Column::RequestedBy.eq(manager_id));
    }
    query
        .order_by_desc(seller_request::Column::CreatedAt)
        .order_by_desc(seller_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// One request; managers may only read their own.
pub async fn get_request(
    db: &DatabaseConnection,
    actor: &Actor,
    request_id: i64,
) -> Result<seller_request::Model> {
    let request = SellerRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("seller request", request_id))?;

    match actor {
        Actor::Owner(_) | Actor::Admin(_) => Ok(request),
        Actor::Manager(id) if request.requested_by == *id => Ok(request),
        _ => Err(Error::forbidden(format!(
            "seller request {request_id} belongs to another manager"
        ))),
    }
}

/// Moves a pending request to `approved` or `rejected`, guarded on the row
/// still being pending.
async fn review(
    db: &DatabaseConnection,
    actor: &Actor,
    request_id: i64,
    outcome: RequestStatus,
    reason: Option<String>,
) -> Result<seller_request::Model> {
    actor.require(Capability::ReviewRequests)?;
    let reviewer = actor.require_staff()?;

    let request = SellerRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("seller request", request_id))?;
    if request.status != RequestStatus::Pending {
        return Err(Error::AlreadyReviewed {
            request_id,
            status: request.status,
        });
    }

    let result = SellerRequest::update_many()
        .col_expr(seller_request::Column::Status, Expr::value(outcome))
        .col_expr(seller_request::Column::ReviewedBy, Expr::value(reviewer))
        .col_expr(seller_request::Column::ReviewedAt, Expr::value(Utc::now()))
        .col_expr(seller_request::Column::RejectionReason, Expr::value(reason))
        .filter(seller_request::Column::Id.eq(request_id))
        .filter(seller_request::Column::Status.eq(RequestStatus::Pending))
        .exec(db)
        .await?;

    let reviewed = SellerRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("seller request", request_id))?;

    if result.rows_affected == 0 {
        return Err(Error::AlreadyReviewed {
            request_id,
            status: reviewed.status,
        });
    }

    tracing::info!(request_id, reviewer, status = %outcome, "seller request reviewed");
    Ok(reviewed)
}

/// Approves a pending request and tells the manager.
pub async fn approve_request(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    actor: &Actor,
    request_id: i64,
) -> Result<seller_request::Model> {
    let request = review(db, actor, request_id, RequestStatus::Approved, None).await?;

    let recipients = user_recipients_quietly(db, request.requested_by).await;
    dispatch(
        notifier,
        &recipients,
        Notification::RequestApproved {
            seller_name: request.name.clone(),
        },
    )
    .await;
    Ok(request)
}

/// Rejects a pending request with a mandatory reason and tells the manager.
pub async fn reject_request(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    actor: &Actor,
    request_id: i64,
    reason: &str,
) -> Result<seller_request::Model> {
    let reason = required("rejection_reason", reason)?;
    let request = review(db, actor, request_id, RequestStatus::Rejected, Some(reason.clone())).await?;

    let recipients = user_recipients_quietly(db, request.requested_by).await;
    dispatch(
        notifier,
        &recipients,
        Notification::RequestRejected {
            seller_name: request.name.clone(),
            reason,
        },
    )
    .await;
    Ok(request)
}

/// The most recently reviewed approved, unused request of `manager_id`.
pub async fn find_consumable<C>(db: &C, manager_id: i64) -> Result<Option<seller_request::Model>>
where
    C: ConnectionTrait,
{
    SellerRequest::find()
        .filter(seller_request::Column::RequestedBy.eq(manager_id))
        .filter(seller_request::Column::Status.eq(RequestStatus::Approved))
        .filter(seller_request::Column::IsUsed.eq(false))
        .order_by_desc(seller_request::Column::ReviewedAt)
        .order_by_desc(seller_request::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Marks `request_id` used unless someone else got there first.
pub(crate) async fn consume<C>(
    db: &C,
    manager_id: i64,
    request_id: i64,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = SellerRequest::update_many()
        .col_expr(seller_request::Column::IsUsed, Expr::value(true))
        .col_expr(seller_request::Column::UsedAt, Expr::value(Some(now)))
        .filter(seller_request::Column::Id.eq(request_id))
        .filter(seller_request::Column::IsUsed.eq(false))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::NoApprovedRequest { manager_id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{entities::Role, test_utils::*};

    fn bakery() -> NewSellerRequest {
        NewSellerRequest {
            name: "Bakery".to_string(),
            business_type: "food".to_string(),
            legal_info: "SIRET 123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_notifies_owner_and_admins() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        create_test_owner(&db).await?;
        create_test_user(&db, "admin@example.com", Role::Admin).await?;
        let manager = create_test_user(&db, "m@example.com", Role::Manager).await?;

        let request = create_request(&db, &notifier, &Actor::Manager(manager.id), bakery()).await?;
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(!request.is_used);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, vec!["owner@example.com", "admin@example.com"]);
        assert_eq!(sent[0].1.kind(), "new-request");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_validation_and_roles() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let owner = create_test_owner(&db).await?;
        let manager = create_test_user(&db, "m@example.com", Role::Manager).await?;

        let mut input = bakery();
        input.legal_info = "  ".to_string();
        let result = create_request(&db, &notifier, &Actor::Manager(manager.id), input).await;
        assert!(matches!(result, Err(Error::Validation { field: "legal_info", .. })));

        let result = create_request(&db, &notifier, &Actor::Owner(owner.id), bakery()).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_review_once() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let owner = create_test_owner(&db).await?;
        let manager = create_test_user(&db, "m@example.com", Role::Manager).await?;
        let request = create_request(&db, &notifier, &Actor::Manager(manager.id), bakery()).await?;

        let approved = approve_request(&db, &notifier, &Actor::Owner(owner.id), request.id).await?;
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(owner.id));
        assert!(approved.reviewed_at.is_some());

        let again = reject_request(&db, &notifier, &Actor::Owner(owner.id), request.id, "late").await;
        assert!(matches!(
            again,
            Err(Error::AlreadyReviewed { status: RequestStatus::Approved, .. })
        ));

        let last = notifier.sent().pop().unwrap();
        assert_eq!(last.0, vec!["m@example.com"]);
        assert_eq!(last.1.kind(), "request-approved");
        Ok(())
    }

    #[tokio::test]
    async fn test_review_stands_when_recipient_lookup_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let owner = create_test_owner(&db).await?;
        let manager = create_test_user(&db, "m@example.com", Role::Manager).await?;
        let request = create_request(&db, &notifier, &Actor::Manager(manager.id), bakery()).await?;
        let before = notifier.sent().len();

        db.execute_unprepared("PRAGMA foreign_keys = OFF").await?;
        db.execute_unprepared("DROP TABLE users").await?;

        let approved = approve_request(&db, &notifier, &Actor::Owner(owner.id), request.id).await?;
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(notifier.sent().len(), before);

        let later = create_request(&db, &notifier, &Actor::Manager(manager.id), bakery()).await?;
        assert_eq!(later.status, RequestStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn test_reject_requires_reason() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let owner = create_test_owner(&db).await?;
        let manager = create_test_user(&db, "m@example.com", Role::Manager).await?;
        let request = create_request(&db, &notifier, &Actor::Manager(manager.id), bakery()).await?;

        let result = reject_request(&db, &notifier, &Actor::Admin(owner.id), request.id, "").await;
        assert!(matches!(result, Err(Error::Validation { field: "rejection_reason", .. })));

        let rejected =
            reject_request(&db, &notifier, &Actor::Admin(owner.id), request.id, "no tax id").await?;
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("no tax id"));

        let by_manager = approve_request(&db, &notifier, &Actor::Manager(manager.id), request.id).await;
        assert!(matches!(by_manager, Err(Error::Forbidden { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_reads_are_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let owner = create_test_owner(&db).await?;
        let alice = create_test_user(&db, "alice@example.com", Role::Manager).await?;
        let bob = create_test_user(&db, "bob@example.com", Role::Manager).await?;
        let request = create_request(&db, &notifier, &Actor::Manager(alice.id), bakery()).await?;
        create_request(&db, &notifier, &Actor::Manager(bob.id), bakery()).await?;

        assert_eq!(list_my_requests(&db, &Actor::Manager(alice.id), None).await?.len(), 1);
        assert_eq!(list_requests(&db, &Actor::Owner(owner.id), None, None).await?.len(), 2);
        assert_eq!(
            list_requests(&db, &Actor::Owner(owner.id), Some(RequestStatus::Pending), Some(bob.id))
                .await?
                .len(),
            1
        );
        assert!(get_request(&db, &Actor::Manager(alice.id), request.id).await.is_ok());
        assert!(matches!(
            get_request(&db, &Actor::Manager(bob.id), request.id).await,
            Err(Error::Forbidden { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_find_consumable_prefers_latest_review() -> Result<()> {
        let db = setup_test_db().await?;
        let manager = create_test_user(&db, "m@example.com", Role::Manager).await?;
        let now = Utc::now();

        let older = create_reviewed_request(&db, manager.id, "Old", RequestStatus::Approved, now - chrono::Duration::days(2)).await?;
        let newer = create_reviewed_request(&db, manager.id, "New", RequestStatus::Approved, now - chrono::Duration::days(1)).await?;
        create_reviewed_request(&db, manager.id, "No", RequestStatus::Rejected, now).await?;

        assert_eq!(find_consumable(&db, manager.id).await?.unwrap().id, newer.id);
        consume(&db, manager.id, newer.id, now).await?;
        assert_eq!(find_consumable(&db, manager.id).await?.unwrap().id, older.id);

        let raced = consume(&db, manager.id, newer.id, now).await;
        assert!(matches!(raced, Err(Error::NoApprovedRequest { .. })));
        Ok(())
    }
}
