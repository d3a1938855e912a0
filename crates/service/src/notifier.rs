use chrono::Utc;
use metrics::counter;
use thiserror::Error;

use crewdeck_core::event::DomainEvent;
use crewdeck_core::policy;
use crewdeck_storage::{Database, EmployeeError, NotificationError, NotificationFeedItem};

/// Fans business events out into durable per-recipient notifications.
#[derive(Clone)]
pub struct Notifier {
    database: Database,
}

impl Notifier {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Records a durable notification for the event.
    ///
    /// Fan-out is best effort relative to the action that produced the
    /// event: failures are logged and swallowed so the primary write is
    /// never rolled back by a notification problem. The fan-out itself is
    /// one transaction, so a partial recipient set never becomes visible.
    pub async fn record(&self, event: &DomainEvent) {
        if !event.fans_out() {
            return;
        }

        match self.try_record(event).await {
            Ok(recipients) => {
                counter!("notification_fanout_total", "result" => "ok").increment(1);
                tracing::debug!(
                    event = event.event_name(),
                    recipients,
                    "notification recorded"
                );
            }
            Err(err) => {
                counter!("notification_fanout_total", "result" => "error").increment(1);
                tracing::error!(
                    event = event.event_name(),
                    error = %err,
                    "notification fan-out failed"
                );
            }
        }
    }

    async fn try_record(&self, event: &DomainEvent) -> Result<usize, NotifyError> {
        let actor_id = event.actor_id();
        let admin_ids = self.database.employees().admin_ids_except(actor_id).await?;
        let recipients =
            policy::notification_recipients(&admin_ids, actor_id, event.target_employee_id());

        let repo = self.database.notifications();
        let mut tx = repo.begin().await.map_err(NotificationError::Database)?;
        let now = Utc::now();
        let notification_id = repo.insert(&mut tx, &event.message(), actor_id, now).await?;
        for &recipient in &recipients {
            repo.insert_recipient(&mut tx, notification_id, recipient, now)
                .await?;
        }
        tx.commit().await.map_err(NotificationError::Database)?;

        Ok(recipients.len())
    }

    /// Lists the notifications still visible to an employee, newest first.
    pub async fn notifications_for(
        &self,
        employee_id: i64,
    ) -> Result<Vec<NotificationFeedItem>, NotifyError> {
        let items = self
            .database
            .notifications()
            .list_visible_for(employee_id)
            .await?;
        Ok(items)
    }

    /// Hides a notification for one recipient.
    pub async fn dismiss(&self, notification_id: i64, employee_id: i64) -> Result<(), NotifyError> {
        self.database
            .notifications()
            .dismiss_for(notification_id, employee_id, Utc::now())
            .await
            .map_err(|err| match err {
                NotificationError::MissingRecipient => NotifyError::NotFound,
                other => NotifyError::from(other),
            })
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification not found for this employee")]
    NotFound,
    #[error(transparent)]
    Employee(#[from] EmployeeError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}
