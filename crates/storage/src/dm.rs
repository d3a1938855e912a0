use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

use crewdeck_core::types::{DirectMessage, DmThread, ThreadMember};

use crate::to_rfc3339;

/// Repository managing direct messages, their threads and membership rows.
#[derive(Clone)]
pub struct DmRepository {
    pub(crate) pool: SqlitePool,
}

impl DmRepository {
    /// Begins a SQLite transaction covering a message, its thread and the
    /// membership rows.
    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Inserts the direct message row and returns its generated id.
    pub async fn insert_dm(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        record: &NewDirectMessage<'_>,
    ) -> Result<i64, DmStoreError> {
        let now = to_rfc3339(record.created_at);
        let result = sqlx::query(
            "INSERT INTO direct_messages \
             (owner_id, title, body, replyable, start_at, created_by, updated_by, \
              created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.owner_id)
        .bind(record.title)
        .bind(record.body)
        .bind(record.replyable as i64)
        .bind(to_rfc3339(record.start_at))
        .bind(record.created_by)
        .bind(record.updated_by)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Inserts the thread row attached to a direct message.
    pub async fn insert_thread(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        record: &NewDmThread,
    ) -> Result<i64, DmStoreError> {
        let now = to_rfc3339(record.created_at);
        let result = sqlx::query(
            "INSERT INTO dm_threads \
             (direct_message_id, owner_unread, user_unread, dm_updated, created_by, \
              created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.direct_message_id)
        .bind(record.owner_unread as i64)
        .bind(record.user_unread as i64)
        .bind(record.dm_updated as i64)
        .bind(record.created_by)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Inserts a membership row; per-member read state starts as read.
    pub async fn insert_member(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        dm_thread_id: i64,
        employee_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<(), DmStoreError> {
        let now = to_rfc3339(created_at);
        sqlx::query(
            "INSERT INTO thread_employee \
             (dm_thread_id, employee_id, user_unread, created_at, updated_at) \
             VALUES (?, ?, 0, ?, ?)",
        )
        .bind(dm_thread_id)
        .bind(employee_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Removes a membership row. Missing rows are ignored so a sync can be
    /// replayed safely.
    pub async fn remove_member(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        dm_thread_id: i64,
        employee_id: i64,
    ) -> Result<(), DmStoreError> {
        sqlx::query("DELETE FROM thread_employee WHERE dm_thread_id = ? AND employee_id = ?")
            .bind(dm_thread_id)
            .bind(employee_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Loads a direct message by id.
    pub async fn fetch_dm(&self, direct_message_id: i64) -> Result<DirectMessage, DmStoreError> {
        let row = sqlx::query_as::<_, DirectMessageRow>(
            "SELECT direct_message_id, owner_id, title, body, replyable, start_at, \
                    created_by, updated_by, created_at, updated_at \
             FROM direct_messages WHERE direct_message_id = ?",
        )
        .bind(direct_message_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DmStoreError::NotFound)?;

        Ok(row.into_domain())
    }

    /// Loads a thread by id.
    pub async fn fetch_thread(&self, dm_thread_id: i64) -> Result<DmThread, DmStoreError> {
        let row = sqlx::query_as::<_, DmThreadRow>(
            "SELECT dm_thread_id, direct_message_id, owner_unread, user_unread, dm_updated, \
                    created_by, created_at, updated_at \
             FROM dm_threads WHERE dm_thread_id = ?",
        )
        .bind(dm_thread_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DmStoreError::NotFound)?;

        Ok(row.into_domain())
    }

    /// Loads the thread attached to a direct message.
    pub async fn fetch_thread_for_dm(
        &self,
        direct_message_id: i64,
    ) -> Result<DmThread, DmStoreError> {
        let row = sqlx::query_as::<_, DmThreadRow>(
            "SELECT dm_thread_id, direct_message_id, owner_unread, user_unread, dm_updated, \
                    created_by, created_at, updated_at \
             FROM dm_threads WHERE direct_message_id = ?",
        )
        .bind(direct_message_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DmStoreError::NotFound)?;

        Ok(row.into_domain())
    }

    /// Loads the direct message that a thread belongs to.
    pub async fn fetch_thread_message(
        &self,
        dm_thread_id: i64,
    ) -> Result<DirectMessage, DmStoreError> {
        let row = sqlx::query_as::<_, DirectMessageRow>(
            "SELECT dm.direct_message_id, dm.owner_id, dm.title, dm.body, dm.replyable, \
                    dm.start_at, dm.created_by, dm.updated_by, dm.created_at, dm.updated_at \
             FROM direct_messages AS dm \
             JOIN dm_threads AS t ON t.direct_message_id = dm.direct_message_id \
             WHERE t.dm_thread_id = ?",
        )
        .bind(dm_thread_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DmStoreError::NotFound)?;

        Ok(row.into_domain())
    }

    /// Lists the employee ids currently belonging to a thread.
    pub async fn member_ids(&self, dm_thread_id: i64) -> Result<Vec<i64>, DmStoreError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT employee_id FROM thread_employee \
             WHERE dm_thread_id = ? ORDER BY employee_id",
        )
        .bind(dm_thread_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Lists the full membership rows of a thread.
    pub async fn members(&self, dm_thread_id: i64) -> Result<Vec<ThreadMember>, DmStoreError> {
        let rows = sqlx::query_as::<_, ThreadMemberRow>(
            "SELECT dm_thread_id, employee_id, user_unread FROM thread_employee \
             WHERE dm_thread_id = ? ORDER BY employee_id",
        )
        .bind(dm_thread_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ThreadMemberRow::into_domain).collect())
    }

    /// Applies field edits to a direct message.
    pub async fn update_dm(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        direct_message_id: i64,
        record: &UpdateDirectMessage<'_>,
    ) -> Result<(), DmStoreError> {
        let result = sqlx::query(
            "UPDATE direct_messages \
             SET title = ?, body = ?, replyable = ?, start_at = ?, updated_by = ?, \
                 updated_at = ? \
             WHERE direct_message_id = ?",
        )
        .bind(record.title)
        .bind(record.body)
        .bind(record.replyable as i64)
        .bind(to_rfc3339(record.start_at))
        .bind(record.updated_by)
        .bind(to_rfc3339(record.updated_at))
        .bind(direct_message_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DmStoreError::NotFound);
        }
        Ok(())
    }

    /// Flags the thread so members see the message was edited.
    pub async fn mark_thread_updated(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        dm_thread_id: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DmStoreError> {
        let result = sqlx::query(
            "UPDATE dm_threads SET dm_updated = 1, updated_at = ? WHERE dm_thread_id = ?",
        )
        .bind(to_rfc3339(updated_at))
        .bind(dm_thread_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DmStoreError::NotFound);
        }
        Ok(())
    }

    /// Lists every direct message, newest first.
    pub async fn list_all(&self) -> Result<Vec<DirectMessage>, DmStoreError> {
        let rows = sqlx::query_as::<_, DirectMessageRow>(
            "SELECT direct_message_id, owner_id, title, body, replyable, start_at, \
                    created_by, updated_by, created_at, updated_at \
             FROM direct_messages \
             ORDER BY created_at DESC, direct_message_id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DirectMessageRow::into_domain).collect())
    }

    /// Lists the direct messages whose thread includes the employee, newest
    /// first.
    pub async fn list_for_member(
        &self,
        employee_id: i64,
    ) -> Result<Vec<DirectMessage>, DmStoreError> {
        let rows = sqlx::query_as::<_, DirectMessageRow>(
            "SELECT dm.direct_message_id, dm.owner_id, dm.title, dm.body, dm.replyable, \
                    dm.start_at, dm.created_by, dm.updated_by, dm.created_at, dm.updated_at \
             FROM direct_messages AS dm \
             JOIN dm_threads AS t ON t.direct_message_id = dm.direct_message_id \
             JOIN thread_employee AS te ON te.dm_thread_id = t.dm_thread_id \
             WHERE te.employee_id = ? \
             ORDER BY dm.created_at DESC, dm.direct_message_id DESC",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DirectMessageRow::into_domain).collect())
    }
}

/// Data required to create a direct message row.
pub struct NewDirectMessage<'a> {
    pub owner_id: i64,
    pub title: &'a str,
    pub body: Option<&'a str>,
    pub replyable: bool,
    pub start_at: DateTime<Utc>,
    pub created_by: i64,
    pub updated_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Data required to create a thread row.
pub struct NewDmThread {
    pub direct_message_id: i64,
    pub owner_unread: bool,
    pub user_unread: bool,
    pub dm_updated: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Field edits applied to an existing direct message.
pub struct UpdateDirectMessage<'a> {
    pub title: &'a str,
    pub body: Option<&'a str>,
    pub replyable: bool,
    pub start_at: DateTime<Utc>,
    pub updated_by: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct DirectMessageRow {
    direct_message_id: i64,
    owner_id: i64,
    title: String,
    body: Option<String>,
    replyable: i64,
    start_at: DateTime<Utc>,
    created_by: i64,
    updated_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DirectMessageRow {
    fn into_domain(self) -> DirectMessage {
        DirectMessage {
            direct_message_id: self.direct_message_id,
            owner_id: self.owner_id,
            title: self.title,
            body: self.body,
            replyable: self.replyable != 0,
            start_at: self.start_at,
            created_by: self.created_by,
            updated_by: self.updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DmThreadRow {
    dm_thread_id: i64,
    direct_message_id: i64,
    owner_unread: i64,
    user_unread: i64,
    dm_updated: i64,
    created_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DmThreadRow {
    fn into_domain(self) -> DmThread {
        DmThread {
            dm_thread_id: self.dm_thread_id,
            direct_message_id: self.direct_message_id,
            owner_unread: self.owner_unread != 0,
            user_unread: self.user_unread != 0,
            dm_updated: self.dm_updated != 0,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ThreadMemberRow {
    dm_thread_id: i64,
    employee_id: i64,
    user_unread: i64,
}

impl ThreadMemberRow {
    fn into_domain(self) -> ThreadMember {
        ThreadMember {
            dm_thread_id: self.dm_thread_id,
            employee_id: self.employee_id,
            user_unread: self.user_unread != 0,
        }
    }
}

/// Errors that can occur while operating on direct messages.
#[derive(Debug, Error)]
pub enum DmStoreError {
    #[error("direct message not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
