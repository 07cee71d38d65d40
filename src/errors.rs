//! Unified error types for the marketplace core.
//!
//! Every core operation returns [`Result`]. The variants mirror the failure
//! kinds callers need to distinguish; [`Error::status_code`] gives the HTTP
//! status an outer layer should map them to.

use crate::entities::{RequestStatus, SellerStatus};
use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced seller, city, category, request, product or user does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        entity: &'static str,
        /// Identifier (id, slug or path) used for the lookup
        id: String,
    },

    /// The actor failed the visibility/ownership predicate or a role gate
    #[error("Forbidden: {reason}")]
    Forbidden {
        /// Human-readable reason
        reason: String,
    },

    /// The requested status change is not legal from the current status
    #[error("Invalid state transition: cannot move seller from {from} to {to}")]
    InvalidStateTransition {
        /// Current status
        from: SellerStatus,
        /// Requested status
        to: SellerStatus,
    },

    /// Manager tried to self-reactivate without a valid, unexpired window
    #[error("Activation window expired for seller {seller_id}; an owner or admin must grant a new period")]
    ActivationWindowExpired {
        /// Seller that could not be reactivated
        seller_id: i64,
    },

    /// Seller request was already approved or rejected
    #[error("Seller request {request_id} was already reviewed ({status})")]
    AlreadyReviewed {
        /// Request id
        request_id: i64,
        /// Status the request is in
        status: RequestStatus,
    },

    /// Manager has no approved, unused seller request to consume
    #[error("Manager {manager_id} has no approved seller request available")]
    NoApprovedRequest {
        /// Manager user id
        manager_id: i64,
    },

    /// Malformed input
    #[error("Validation error on `{field}`: {message}")]
    Validation {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// Uniqueness violation (second owner, duplicate email)
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict
        message: String,
    },

    /// Optimistic version check failed; the row changed since it was read
    #[error("{entity} {id} was modified concurrently")]
    ConcurrentModification {
        /// Kind of entity
        entity: &'static str,
        /// Row id
        id: i64,
    },

    /// Image payload could not be decoded
    #[error("Unsupported image format: {message}")]
    UnsupportedFormat {
        /// Decoder message
        message: String,
    },

    /// Image payload exceeds the configured limit
    #[error("Image too large: {size} bytes (limit {limit})")]
    TooLarge {
        /// Payload size
        size: usize,
        /// Configured maximum
        limit: usize,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::Validation`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// HTTP status an outer layer should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Forbidden { .. } => 403,
            Self::InvalidStateTransition { .. }
            | Self::ActivationWindowExpired { .. }
            | Self::AlreadyReviewed { .. }
            | Self::NoApprovedRequest { .. }
            | Self::Validation { .. }
            | Self::UnsupportedFormat { .. }
            | Self::TooLarge { .. } => 400,
            Self::Conflict { .. } | Self::ConcurrentModification { .. } => 409,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) => 500,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
