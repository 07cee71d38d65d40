//! Daily background jobs: the expiration sweep and expiry reminders.

use crate::{
    config::SchedulerConfig,
    core::lifecycle::{sweep_expired, sweep_reminders},
    errors::Result,
    notify::Notifier,
};
use chrono::{DateTime, Days, NaiveTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

/// First instant strictly after `now` at `hour:00` UTC.
#[must_use]
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    }
}

async fn sleep_until(target: DateTime<Utc>) {
    let wait = (target - Utc::now()).to_std().unwrap_or_default();
    tokio::time::sleep(wait).await;
}

/// Runs the expiration sweep once.
#[instrument(skip(db))]
pub async fn run_expiration_job(db: &DatabaseConnection) -> Result<u64> {
    let expired = sweep_expired(db, Utc::now()).await?;
    info!(expired, "expiration job done");
    Ok(expired)
}

/// Runs the reminder sweep once.
#[instrument(skip(db, notifier))]
pub async fn run_reminder_job(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    days: i64,
) -> Result<u64> {
    let reminded = sweep_reminders(db, notifier, Utc::now(), days).await?;
    info!(reminded, "reminder job done");
    Ok(reminded)
}

/// Spawns both daily loops. Job failures are logged and the loop keeps going.
pub fn spawn(
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    config: &SchedulerConfig,
) -> Vec<JoinHandle<()>> {
    let expire_hour = config.expire_hour;
    let expire_db = db.clone();
    let expirations = tokio::spawn(async move {
        loop {
            sleep_until(next_run_after(Utc::now(), expire_hour)).await;
            if let Err(e) = run_expiration_job(&expire_db).await {
                error!(error = %e, "expiration job failed");
            }
        }
    });

    let reminder_hour = config.reminder_hour;
    let days = config.reminder_days;
    let reminders = tokio::spawn(async move {
        loop {
            sleep_until(next_run_after(Utc::now(), reminder_hour)).await;
            if let Err(e) = run_reminder_job(&db, notifier.as_ref(), days).await {
                error!(error = %e, "reminder job failed");
            }
        }
    });

    info!(expire_hour, reminder_hour, days, "scheduler started");
    vec![expirations, reminders]
}
