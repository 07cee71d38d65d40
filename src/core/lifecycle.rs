//! Seller lifecycle state machine.
//!
//! ```text
//!            activate (staff: grant or reuse window,
//!                      manager: reuse unexpired window)
//!   draft ───────────────────────────────────────────▶ active ◀──┐
//!     ▲                                                 │  │     │ extend
//!     │ move_to_draft                        sweep      │  │     │ (staff)
//!     │ (staff, own manager)                 end < now  ▼  │     │
//!     ├──────────────────────────────────────────── expired ─────┘
//!     │                                                    │
//!     │                                       deactivate   ▼
//!     └──────────────────────────────────────────── inactive
//! ```
//!
//! Transitions are planned by the pure [`plan_transition`] against a fixed
//! `now`, then written with an optimistic check on the `version` column so two
//! concurrent writers cannot both succeed from the same snapshot. Directory
//! cascades ([`DirectoryEvent`]) and the expiration sweep are set-based and
//! bypass actor checks.

use crate::{
    core::{
        access::{Actor, Capability, can_mutate},
        seller::load_seller,
        user::{staff_recipients, user_recipients_quietly},
    },
    entities::{Seller, SellerGlobalCategory, SellerStatus, seller, seller_global_category},
    errors::{Error, Result},
    notify::{Notification, Notifier, dispatch},
};
use chrono::{DateTime, Duration, Months, Utc};
use sea_orm::{QueryOrder, QuerySelect, QueryTrait, prelude::*, sea_query::Expr};

/// A requested status change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// `draft → active`. Staff must pass `months` when no unexpired window exists.
    Activate {
        /// Length of a freshly granted window
        months: Option<u32>,
    },
    /// Push the end of an active or expired seller's window forward.
    Extend {
        /// Months added to the current end
        months: u32,
    },
    /// Staff switch-off of an active or expired seller.
    Deactivate,
    /// Back to the editable, hidden state.
    MoveToDraft,
}

impl Transition {
    /// Status the transition targets.
    #[must_use]
    pub const fn target(self) -> SellerStatus {
        match self {
            Self::Activate { .. } | Self::Extend { .. } => SellerStatus::Active,
            Self::Deactivate => SellerStatus::Inactive,
            Self::MoveToDraft => SellerStatus::Draft,
        }
    }
}

/// Outcome of planning a transition: the row values to write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Plan {
    /// New status
    pub status: SellerStatus,
    /// New activation start
    pub start: Option<DateTime<Utc>>,
    /// New activation end
    pub end: Option<DateTime<Utc>>,
    /// Whether the creator should be told about a granted period
    pub notify_creator: bool,
}

/// Set-based directory changes that force sellers back to draft.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectoryEvent {
    /// A city was switched off
    CityDeactivated(i64),
    /// A global category was switched off
    CategoryDeactivated(i64),
}

fn add_months(from: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>> {
    if months < 1 {
        return Err(Error::validation("months", "must be at least 1"));
    }
    from.checked_add_months(Months::new(months))
        .ok_or_else(|| Error::validation("months", "activation end is out of range"))
}

fn invalid(from: SellerStatus, transition: Transition) -> Error {
    Error::InvalidStateTransition {
        from,
        to: transition.target(),
    }
}

/// Decides whether `actor` may apply `transition` to `seller` at `now`, and
/// what the row looks like afterwards. Performs no I/O.
pub fn plan_transition(
    seller: &seller::Model,
    actor: &Actor,
    transition: Transition,
    now: DateTime<Utc>,
) -> Result<Plan> {
    let keep = Plan {
        status: transition.target(),
        start: seller.activation_start_date,
        end: seller.activation_end_date,
        notify_creator: false,
    };

    match transition {
        Transition::Activate { months } => match actor {
            Actor::Owner(_) | Actor::Admin(_) => {
                if seller.status != SellerStatus::Draft {
                    return Err(invalid(seller.status, transition));
                }
                if seller.has_open_window(now) {
                    return Ok(Plan {
                        notify_creator: true,
                        ..keep
                    });
                }
                let months = months
                    .ok_or_else(|| Error::validation("months", "required to grant a new period"))?;
                Ok(Plan {
                    status: SellerStatus::Active,
                    start: Some(now),
                    end: Some(add_months(now, months)?),
                    notify_creator: true,
                })
            }
            Actor::Manager(id) => {
                if seller.created_by != *id {
                    return Err(Error::forbidden(format!(
                        "seller {} belongs to another manager",
                        seller.id
                    )));
                }
                if seller.status != SellerStatus::Draft {
                    return Err(invalid(seller.status, transition));
                }
                if !seller.has_open_window(now) {
                    return Err(Error::ActivationWindowExpired {
                        seller_id: seller.id,
                    });
                }
                Ok(keep)
            }
            Actor::Client(_) | Actor::Anonymous => {
                Err(Error::forbidden("only staff may activate sellers"))
            }
        },
        Transition::Extend { months } => {
            actor.require(Capability::GrantActivation)?;
            if !matches!(seller.status, SellerStatus::Active | SellerStatus::Expired) {
                return Err(invalid(seller.status, transition));
            }
            let end = add_months(seller.activation_end_date.unwrap_or(now), months)?;
            Ok(Plan {
                status: SellerStatus::Active,
                start: seller.activation_start_date.or(Some(now)),
                end: Some(end),
                notify_creator: true,
            })
        }
        Transition::Deactivate => {
            actor.require(Capability::GrantActivation)?;
            if !matches!(seller.status, SellerStatus::Active | SellerStatus::Expired) {
                return Err(invalid(seller.status, transition));
            }
            Ok(keep)
        }
        Transition::MoveToDraft => {
            if !can_mutate(seller, actor) {
                return Err(Error::forbidden(format!(
                    "{} may not move seller {} to draft",
                    actor.role_name(),
                    seller.id
                )));
            }
            if seller.status == SellerStatus::Draft {
                return Err(invalid(seller.status, transition));
            }
            Ok(keep)
        }
    }
}

/// Writes `plan` only if the row still carries `seller.version`.
async fn write_plan<C>(db: &C, seller: &seller::Model, plan: &Plan, now: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Seller::update_many()
        .col_expr(seller::Column::Status, Expr::value(plan.status))
        .col_expr(seller::Column::ActivationStartDate, Expr::value(plan.start))
        .col_expr(seller::Column::ActivationEndDate, Expr::value(plan.end))
        .col_expr(seller::Column::UpdatedAt, Expr::value(now))
        .col_expr(
            seller::Column::Version,
            Expr::col(seller::Column::Version).add(1),
        )
        .filter(seller::Column::Id.eq(seller.id))
        .filter(seller::Column::Version.eq(seller.version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::ConcurrentModification {
            entity: "seller",
            id: seller.id,
        });
    }
    Ok(())
}

/// Plans and writes one transition at `now`, then notifies the creator when
/// a period was granted. Returns the updated row.
pub async fn transition_at(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    actor: &Actor,
    seller_id: i64,
    transition: Transition,
    now: DateTime<Utc>,
) -> Result<seller::Model> {
    let current = load_seller(db, seller_id).await?;
    let plan = plan_transition(&current, actor, transition, now)?;
    write_plan(db, &current, &plan, now).await?;

    tracing::info!(
        seller_id,
        actor = actor.role_name(),
        from = %current.status,
        to = %plan.status,
        "seller status changed"
    );

    let updated = load_seller(db, seller_id).await?;

    if plan.notify_creator {
        if let Some(end_date) = updated.activation_end_date {
            let recipients = user_recipients_quietly(db, updated.created_by).await;
            dispatch(
                notifier,
                &recipients,
                Notification::ActivationGranted {
                    seller_name: updated.name.clone(),
                    end_date,
                },
            )
            .await;
        }
    }

    Ok(updated)
}

/// Activates a draft seller. See [`Transition::Activate`].
pub async fn activate(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    actor: &Actor,
    seller_id: i64,
    months: Option<u32>,
) -> Result<seller::Model> {
    transition_at(
        db,
        notifier,
        actor,
        seller_id,
        Transition::Activate { months },
        Utc::now(),
    )
    .await
}

/// Extends an active or expired seller by `months`.
pub async fn extend(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    actor: &Actor,
    seller_id: i64,
    months: u32,
) -> Result<seller::Model> {
    transition_at(
        db,
        notifier,
        actor,
        seller_id,
        Transition::Extend { months },
        Utc::now(),
    )
    .await
}

/// Switches off an active or expired seller.
pub async fn deactivate(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    actor: &Actor,
    seller_id: i64,
) -> Result<seller::Model> {
    transition_at(
        db,
        notifier,
        actor,
        seller_id,
        Transition::Deactivate,
        Utc::now(),
    )
    .await
}

/// Returns a seller to draft, keeping its activation dates.
pub async fn move_to_draft(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    actor: &Actor,
    seller_id: i64,
) -> Result<seller::Model> {
    transition_at(
        db,
        notifier,
        actor,
        seller_id,
        Transition::MoveToDraft,
        Utc::now(),
    )
    .await
}

/// Marks every active seller whose window ended before `now` as expired.
///
/// Each row is flipped by its own conditional update, so overlapping or
/// repeated runs never double count. Returns how many rows changed.
pub async fn sweep_expired(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<u64> {
    let candidates = Seller::find()
        .select_only()
        .column(seller::Column::Id)
        .filter(seller::Column::Status.eq(SellerStatus::Active))
        .filter(seller::Column::ActivationEndDate.lt(now))
        .into_tuple::<i64>()
        .all(db)
        .await?;

    let mut expired = 0;
    for seller_id in candidates {
        let result = Seller::update_many()
            .col_expr(seller::Column::Status, Expr::value(SellerStatus::Expired))
            .col_expr(seller::Column::UpdatedAt, Expr::value(now))
            .col_expr(
                seller::Column::Version,
                Expr::col(seller::Column::Version).add(1),
            )
            .filter(seller::Column::Id.eq(seller_id))
            .filter(seller::Column::Status.eq(SellerStatus::Active))
            .filter(seller::Column::ActivationEndDate.lt(now))
            .exec(db)
            .await?;
        if result.rows_affected > 0 {
            tracing::debug!(seller_id, "seller expired");
        }
        expired += result.rows_affected;
    }

    tracing::info!(expired, "expiration sweep finished");
    Ok(expired)
}

/// Sends an expiration reminder for every active seller whose window ends
/// within `[now, now + days]`, to the creator plus owner and admins.
/// Returns the number of sellers reminded.
pub async fn sweep_reminders(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
    days: i64,
) -> Result<u64> {
    let horizon = now + Duration::days(days);
    let sellers = Seller::find()
        .filter(seller::Column::Status.eq(SellerStatus::Active))
        .filter(seller::Column::ActivationEndDate.gte(now))
        .filter(seller::Column::ActivationEndDate.lte(horizon))
        .order_by_asc(seller::Column::ActivationEndDate)
        .all(db)
        .await?;

    let staff = staff_recipients(db).await?;
    let mut reminded = 0;

    for seller in sellers {
        let Some(end_date) = seller.activation_end_date else {
            continue;
        };
        let mut recipients = user_recipients_quietly(db, seller.created_by).await;
        for email in &staff {
            if !recipients.contains(email) {
                recipients.push(email.clone());
            }
        }

        dispatch(
            notifier,
            &recipients,
            Notification::ExpirationReminder {
                seller_name: seller.name.clone(),
                end_date,
            },
        )
        .await;
        reminded += 1;
    }

    tracing::info!(reminded, days, "reminder sweep finished");
    Ok(reminded)
}

/// Forces every non-draft seller referencing the deactivated city or global
/// category to draft in one statement. Returns how many sellers changed.
pub async fn apply_directory_event<C>(db: &C, event: DirectoryEvent) -> Result<u64>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let scope = match event {
        DirectoryEvent::CityDeactivated(city_id) => seller::Column::CityId.eq(city_id),
        DirectoryEvent::CategoryDeactivated(category_id) => seller::Column::Id.in_subquery(
            SellerGlobalCategory::find()
                .select_only()
                .column(seller_global_category::Column::SellerId)
                .filter(seller_global_category::Column::CategoryId.eq(category_id))
                .into_query(),
        ),
    };

    let result = Seller::update_many()
        .col_expr(seller::Column::Status, Expr::value(SellerStatus::Draft))
        .col_expr(seller::Column::UpdatedAt, Expr::value(now))
        .col_expr(
            seller::Column::Version,
            Expr::col(seller::Column::Version).add(1),
        )
        .filter(scope)
        .filter(seller::Column::Status.ne(SellerStatus::Draft))
        .exec(db)
        .await?;

    tracing::info!(?event, sellers = result.rows_affected, "directory cascade applied");
    Ok(result.rows_affected)
}
