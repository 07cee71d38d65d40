//! Outbound notifications.
//!
//! Core operations describe *what* happened as a [`Notification`] and hand it
//! to a [`Notifier`]. Delivery is fire-and-log: [`dispatch`] never returns an
//! error, so a broken mail relay cannot undo a committed seller transition.

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message the system wants delivered to one or more staff addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Notification {
    /// A seller was activated or its paid period extended
    ActivationGranted {
        /// Seller display name
        seller_name: String,
        /// New end of the activation window
        end_date: DateTime<Utc>,
    },
    /// A seller's paid period ends soon
    ExpirationReminder {
        /// Seller display name
        seller_name: String,
        /// End of the activation window
        end_date: DateTime<Utc>,
    },
    /// A manager submitted a seller request
    NewRequest {
        /// Proposed seller name
        seller_name: String,
        /// Proposed business type
        business_type: String,
        /// Email of the submitting manager
        requested_by: String,
    },
    /// A seller request was approved
    RequestApproved {
        /// Proposed seller name
        seller_name: String,
    },
    /// A seller request was rejected
    RequestRejected {
        /// Proposed seller name
        seller_name: String,
        /// Reviewer's reason
        reason: String,
    },
}

impl Notification {
    /// Stable identifier of the notification kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ActivationGranted { .. } => "activation-granted",
            Self::ExpirationReminder { .. } => "expiration-reminder",
            Self::NewRequest { .. } => "new-request",
            Self::RequestApproved { .. } => "request-approved",
            Self::RequestRejected { .. } => "request-rejected",
        }
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Self::ActivationGranted { seller_name, .. } => {
                format!("Seller \"{seller_name}\" is active")
            }
            Self::ExpirationReminder { seller_name, .. } => {
                format!("Seller \"{seller_name}\" expires soon")
            }
            Self::NewRequest { seller_name, .. } => {
                format!("New seller request: \"{seller_name}\"")
            }
            Self::RequestApproved { seller_name } => {
                format!("Seller request \"{seller_name}\" approved")
            }
            Self::RequestRejected { seller_name, .. } => {
                format!("Seller request \"{seller_name}\" rejected")
            }
        }
    }

    /// Plain-text body.
    #[must_use]
    pub fn body(&self) -> String {
        match self {
            Self::ActivationGranted {
                seller_name,
                end_date,
            } => format!(
                "Seller \"{seller_name}\" is now listed publicly. The activation period ends on {}.",
                end_date.format("%Y-%m-%d")
            ),
            Self::ExpirationReminder {
                seller_name,
                end_date,
            } => format!(
                "The activation period of seller \"{seller_name}\" ends on {}. Contact an administrator to extend it.",
                end_date.format("%Y-%m-%d")
            ),
            Self::NewRequest {
                seller_name,
                business_type,
                requested_by,
            } => format!(
                "{requested_by} asked to create seller \"{seller_name}\" ({business_type}). Review it in the admin panel."
            ),
            Self::RequestApproved { seller_name } => format!(
                "Your request for seller \"{seller_name}\" was approved. You can now create the seller."
            ),
            Self::RequestRejected {
                seller_name,
                reason,
            } => format!("Your request for seller \"{seller_name}\" was rejected.\nReason: {reason}"),
        }
    }
}

/// Delivery backend for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `notification` to every address in `recipients`.
    async fn notify(&self, recipients: &[String], notification: &Notification) -> Result<()>;
}

/// Notifier that writes rendered messages to the log instead of sending mail.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipients: &[String], notification: &Notification) -> Result<()> {
        tracing::info!(
            kind = notification.kind(),
            recipients = ?recipients,
            subject = %notification.subject(),
            "notification"
        );
        tracing::debug!(body = %notification.body(), "notification body");
        Ok(())
    }
}

/// Sends `notification`, logging instead of propagating any failure.
pub async fn dispatch(notifier: &dyn Notifier, recipients: &[String], notification: Notification) {
    if recipients.is_empty() {
        tracing::debug!(kind = notification.kind(), "no recipients, skipping");
        return;
    }
    if let Err(e) = notifier.notify(recipients, &notification).await {
        tracing::warn!(kind = notification.kind(), error = %e, "notification delivery failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingNotifier;

    #[test]
    fn test_rejection_body_carries_reason() {
        let n = Notification::RequestRejected {
            seller_name: "Bakery".to_string(),
            reason: "missing tax id".to_string(),
        };
        assert_eq!(n.kind(), "request-rejected");
        assert!(n.body().contains("missing tax id"));
        assert!(n.subject().contains("Bakery"));
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let notifier = RecordingNotifier::failing();
        dispatch(
            &notifier,
            &["a@example.com".to_string()],
            Notification::RequestApproved {
                seller_name: "Bakery".to_string(),
            },
        )
        .await;
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_skips_empty_recipients() {
        let notifier = RecordingNotifier::default();
        dispatch(
            &notifier,
            &[],
            Notification::RequestApproved {
                seller_name: "Bakery".to_string(),
            },
        )
        .await;
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        let n = Notification::ExpirationReminder {
            seller_name: "Bakery".to_string(),
            end_date: Utc::now(),
        };
        assert!(LogNotifier.notify(&["x@y.z".to_string()], &n).await.is_ok());
    }
}
