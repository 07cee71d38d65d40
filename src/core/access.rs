//! Actors, capabilities and the seller visibility predicate.
//!
//! Every read path that returns sellers (or things owned by sellers) decides
//! visibility through [`can_view`] for single rows or [`visibility_condition`]
//! for queries. Both encode the same four ordered branches:
//!
//! 1. owner or admin: always visible
//! 2. manager who created the seller: always visible, any status
//! 3. any other manager: only `active` with an activation end after now
//! 4. anonymous or client: only `active` with an activation end after now
//!
//! Branch 2 must win over branch 3, which is why a manager's own draft,
//! expired and inactive sellers remain readable.

use crate::{
    entities::{Role, SellerStatus, seller},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, prelude::*};
use serde::{Deserialize, Serialize};

/// Identity resolved by the authentication layer for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Actor {
    /// No credentials
    Anonymous,
    /// The system owner
    Owner(i64),
    /// An admin user
    Admin(i64),
    /// A manager user
    Manager(i64),
    /// An end customer
    Client(i64),
}

/// Things an actor may be allowed to do, independent of any particular row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Create admin and manager accounts
    ManageUsers,
    /// Create, rename, (de)activate cities and global categories
    ManageDirectory,
    /// Approve or reject seller requests
    ReviewRequests,
    /// Activate, extend and deactivate sellers (paid time)
    GrantActivation,
    /// Mutate any seller regardless of creator
    ManageAnySeller,
    /// Create sellers without consuming an approved request
    CreateSellerFreely,
    /// Create sellers after an approved request
    CreateSellerWithRequest,
    /// Submit seller requests
    SubmitRequests,
    /// Rate and favorite sellers
    RateSellers,
}

const OWNER_CAPABILITIES: &[Capability] = &[
    Capability::ManageUsers,
    Capability::ManageDirectory,
    Capability::ReviewRequests,
    Capability::GrantActivation,
    Capability::ManageAnySeller,
    Capability::CreateSellerFreely,
];

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::ManageDirectory,
    Capability::ReviewRequests,
    Capability::GrantActivation,
    Capability::ManageAnySeller,
    Capability::CreateSellerFreely,
];

const MANAGER_CAPABILITIES: &[Capability] = &[
    Capability::CreateSellerWithRequest,
    Capability::SubmitRequests,
];

const CLIENT_CAPABILITIES: &[Capability] = &[Capability::RateSellers];

impl Actor {
    /// Builds a staff actor from a stored user role.
    #[must_use]
    pub const fn staff(role: Role, user_id: i64) -> Self {
        match role {
            Role::Owner => Self::Owner(user_id),
            Role::Admin => Self::Admin(user_id),
            Role::Manager => Self::Manager(user_id),
        }
    }

    /// Capability set of this actor's role.
    #[must_use]
    pub const fn capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Owner(_) => OWNER_CAPABILITIES,
            Self::Admin(_) => ADMIN_CAPABILITIES,
            Self::Manager(_) => MANAGER_CAPABILITIES,
            Self::Client(_) => CLIENT_CAPABILITIES,
            Self::Anonymous => &[],
        }
    }

    /// Whether the role carries `capability`.
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Fails with [`Error::Forbidden`] unless the role carries `capability`.
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "{} may not perform {capability:?}",
                self.role_name()
            )))
        }
    }

    /// Staff user id for owner, admin or manager.
    #[must_use]
    pub const fn user_id(&self) -> Option<i64> {
        match self {
            Self::Owner(id) | Self::Admin(id) | Self::Manager(id) => Some(*id),
            Self::Client(_) | Self::Anonymous => None,
        }
    }

    /// Staff user id, or [`Error::Forbidden`] for clients and anonymous callers.
    pub fn require_staff(&self) -> Result<i64> {
        self.user_id()
            .ok_or_else(|| Error::forbidden("staff account required"))
    }

    /// Client id, or [`Error::Forbidden`] for everyone else.
    pub fn require_client(&self) -> Result<i64> {
        match self {
            Self::Client(id) => Ok(*id),
            _ => Err(Error::forbidden("client account required")),
        }
    }

    /// Owner or admin.
    #[must_use]
    pub const fn is_owner_or_admin(&self) -> bool {
        matches!(self, Self::Owner(_) | Self::Admin(_))
    }

    /// Only the owner may place sellers in inactive cities or categories.
    #[must_use]
    pub const fn is_owner(&self) -> bool {
        matches!(self, Self::Owner(_))
    }

    /// Lowercase role name for messages and logs.
    #[must_use]
    pub const fn role_name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Owner(_) => "owner",
            Self::Admin(_) => "admin",
            Self::Manager(_) => "manager",
            Self::Client(_) => "client",
        }
    }
}

/// Whether `viewer` may see `seller` at instant `now`.
#[must_use]
pub fn can_view(seller: &seller::Model, viewer: &Actor, now: DateTime<Utc>) -> bool {
    match viewer {
        Actor::Owner(_) | Actor::Admin(_) => true,
        Actor::Manager(id) if seller.created_by == *id => true,
        Actor::Manager(_) | Actor::Client(_) | Actor::Anonymous => seller.is_publicly_listed(now),
    }
}

/// Whether `actor` may change `seller` (profile, media, catalogue, draft/delete).
#[must_use]
pub fn can_mutate(seller: &seller::Model, actor: &Actor) -> bool {
    match actor {
        Actor::Owner(_) | Actor::Admin(_) => true,
        Actor::Manager(id) => seller.created_by == *id,
        Actor::Client(_) | Actor::Anonymous => false,
    }
}

/// [`can_view`] as a result.
pub fn ensure_can_view(seller: &seller::Model, viewer: &Actor, now: DateTime<Utc>) -> Result<()> {
    if can_view(seller, viewer, now) {
        Ok(())
    } else {
        Err(Error::forbidden(format!(
            "seller {} is not visible to {}",
            seller.id,
            viewer.role_name()
        )))
    }
}

/// [`can_mutate`] as a result.
pub fn ensure_can_mutate(seller: &seller::Model, actor: &Actor) -> Result<()> {
    if can_mutate(seller, actor) {
        Ok(())
    } else {
        Err(Error::forbidden(format!(
            "{} may not modify seller {}",
            actor.role_name(),
            seller.id
        )))
    }
}

/// Catalogue (products, local categories) changes additionally require a
/// manager's own seller to be active; staff are unrestricted.
pub fn ensure_can_manage_catalog(seller: &seller::Model, actor: &Actor) -> Result<()> {
    ensure_can_mutate(seller, actor)?;
    if matches!(actor, Actor::Manager(_)) && seller.status != SellerStatus::Active {
        return Err(Error::forbidden(format!(
            "seller {} must be active before its catalogue can be managed",
            seller.id
        )));
    }
    Ok(())
}

fn publicly_listed_condition(now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(seller::Column::Status.eq(SellerStatus::Active))
        .add(seller::Column::ActivationEndDate.gt(now))
}

/// Query form of [`can_view`], for filtering `sellers` rows in SQL.
#[must_use]
pub fn visibility_condition(viewer: &Actor, now: DateTime<Utc>) -> Condition {
    match viewer {
        Actor::Owner(_) | Actor::Admin(_) => Condition::all(),
        Actor::Manager(id) => Condition::any()
            .add(seller::Column::CreatedBy.eq(*id))
            .add(publicly_listed_condition(now)),
        Actor::Client(_) | Actor::Anonymous => publicly_listed_condition(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::seller_fixture;
    use chrono::Duration;
    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = SellerStatus> {
        prop_oneof![
            Just(SellerStatus::Draft),
            Just(SellerStatus::Active),
            Just(SellerStatus::Expired),
            Just(SellerStatus::Inactive),
        ]
    }

    fn end_strategy() -> impl Strategy<Value = Option<i64>> {
        prop_oneof![Just(None), (-1000i64..1000).prop_map(Some)]
    }

    proptest! {
        #[test]
        fn prop_creator_always_sees_own_seller(
            status in status_strategy(),
            end_offset in end_strategy(),
            manager in 1i64..50,
        ) {
            let now = Utc::now();
            let seller = seller_fixture(manager, status, end_offset.map(|h| now + Duration::hours(h)));
            prop_assert!(can_view(&seller, &Actor::Manager(manager), now));
        }

        #[test]
        fn prop_anonymous_sees_only_open_active(
            status in status_strategy(),
            end_offset in end_strategy(),
        ) {
            let now = Utc::now();
            let end = end_offset.map(|h| now + Duration::hours(h));
            let seller = seller_fixture(1, status, end);
            let expected = status == SellerStatus::Active && end.is_some_and(|e| e > now);
            prop_assert_eq!(can_view(&seller, &Actor::Anonymous, now), expected);
            prop_assert_eq!(can_view(&seller, &Actor::Client(9), now), expected);
            prop_assert_eq!(can_view(&seller, &Actor::Manager(2), now), expected);
        }

        #[test]
        fn prop_staff_see_everything(
            status in status_strategy(),
            end_offset in end_strategy(),
        ) {
            let now = Utc::now();
            let seller = seller_fixture(3, status, end_offset.map(|h| now + Duration::hours(h)));
            prop_assert!(can_view(&seller, &Actor::Owner(1), now));
            prop_assert!(can_view(&seller, &Actor::Admin(2), now));
        }
    }

    #[test]
    fn test_own_inactive_visible_but_foreign_hidden() {
        let now = Utc::now();
        let seller = seller_fixture(5, SellerStatus::Inactive, Some(now + Duration::days(10)));
        assert!(can_view(&seller, &Actor::Manager(5), now));
        assert!(!can_view(&seller, &Actor::Manager(6), now));
        assert!(!can_view(&seller, &Actor::Anonymous, now));
    }

    #[test]
    fn test_active_with_past_end_is_hidden_publicly() {
        let now = Utc::now();
        let seller = seller_fixture(5, SellerStatus::Active, Some(now - Duration::seconds(1)));
        assert!(!can_view(&seller, &Actor::Anonymous, now));
        assert!(can_view(&seller, &Actor::Manager(5), now));
    }

    #[test]
    fn test_can_mutate() {
        let seller = seller_fixture(5, SellerStatus::Draft, None);
        assert!(can_mutate(&seller, &Actor::Owner(1)));
        assert!(can_mutate(&seller, &Actor::Admin(2)));
        assert!(can_mutate(&seller, &Actor::Manager(5)));
        assert!(!can_mutate(&seller, &Actor::Manager(6)));
        assert!(!can_mutate(&seller, &Actor::Client(5)));
        assert!(!can_mutate(&seller, &Actor::Anonymous));
    }

    #[test]
    fn test_catalog_requires_active_for_managers() {
        let draft = seller_fixture(5, SellerStatus::Draft, None);
        assert!(matches!(
            ensure_can_manage_catalog(&draft, &Actor::Manager(5)),
            Err(Error::Forbidden { .. })
        ));
        assert!(ensure_can_manage_catalog(&draft, &Actor::Admin(1)).is_ok());
    }

    #[test]
    fn test_capabilities() {
        assert!(Actor::Owner(1).can(Capability::ManageUsers));
        assert!(!Actor::Admin(1).can(Capability::ManageUsers));
        assert!(Actor::Admin(1).can(Capability::GrantActivation));
        assert!(!Actor::Manager(1).can(Capability::GrantActivation));
        assert!(Actor::Manager(1).can(Capability::SubmitRequests));
        assert!(Actor::Client(1).can(Capability::RateSellers));
        assert!(Actor::Anonymous.require(Capability::RateSellers).is_err());
    }
}
