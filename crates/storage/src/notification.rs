use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

use crate::to_rfc3339;

/// Repository managing notifications and their per-recipient visibility rows.
#[derive(Clone)]
pub struct NotificationRepository {
    pub(crate) pool: SqlitePool,
}

impl NotificationRepository {
    /// Begins a SQLite transaction for a fan-out write.
    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Inserts the notification row and returns its generated id.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        message: &str,
        created_by: i64,
        created_at: DateTime<Utc>,
    ) -> Result<i64, NotificationError> {
        let result = sqlx::query(
            "INSERT INTO notifications (message, created_by, created_at) VALUES (?, ?, ?)",
        )
        .bind(message)
        .bind(created_by)
        .bind(to_rfc3339(created_at))
        .execute(&mut **tx)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Inserts one visibility row; visibility starts as `true`.
    pub async fn insert_recipient(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        notification_id: i64,
        employee_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        let now = to_rfc3339(created_at);
        let result = sqlx::query(
            "INSERT INTO employee_notification \
             (notification_id, employee_id, is_visible, created_at, updated_at) \
             VALUES (?, ?, 1, ?, ?)",
        )
        .bind(notification_id)
        .bind(employee_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("2067") => {
                Err(NotificationError::DuplicateRecipient)
            }
            Err(err) => Err(NotificationError::Database(err)),
        }
    }

    /// Lists the notifications still visible to an employee, newest first,
    /// annotated with the originating employee's name.
    pub async fn list_visible_for(
        &self,
        employee_id: i64,
    ) -> Result<Vec<NotificationFeedItem>, NotificationError> {
        let rows = sqlx::query_as::<_, NotificationFeedItem>(
            "SELECT n.id, n.message, n.created_by, e.employee_name AS created_by_name, \
                    n.created_at \
             FROM notifications AS n \
             JOIN employee_notification AS en ON en.notification_id = n.id \
             JOIN employees AS e ON e.employee_id = n.created_by \
             WHERE en.employee_id = ? AND en.is_visible = 1 \
             ORDER BY n.created_at DESC, n.id DESC",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Hides a notification for one employee without touching the
    /// notification itself or other recipients.
    ///
    /// Repeated calls land on the same row and are harmless.
    pub async fn dismiss_for(
        &self,
        notification_id: i64,
        employee_id: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        let result = sqlx::query(
            "UPDATE employee_notification SET is_visible = 0, updated_at = ? \
             WHERE notification_id = ? AND employee_id = ?",
        )
        .bind(to_rfc3339(updated_at))
        .bind(notification_id)
        .bind(employee_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::MissingRecipient);
        }
        Ok(())
    }
}

/// Notification row joined with its originating employee.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationFeedItem {
    pub id: i64,
    pub message: String,
    pub created_by: i64,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
}

/// Errors that can occur while operating on notifications.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("recipient already has a visibility row for this notification")]
    DuplicateRecipient,
    #[error("no visibility row exists for this notification and employee")]
    MissingRecipient,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
