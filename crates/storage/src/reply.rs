use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;

use crewdeck_core::types::DmReply;

use crate::to_rfc3339;

/// Repository managing replies posted in a thread.
#[derive(Clone)]
pub struct ReplyRepository {
    pub(crate) pool: SqlitePool,
}

impl ReplyRepository {
    /// Inserts a reply and returns its generated id.
    pub async fn insert(&self, record: &NewDmReply<'_>) -> Result<i64, ReplyError> {
        let now = to_rfc3339(record.created_at);
        let result = sqlx::query(
            "INSERT INTO dm_replies \
             (dm_thread_id, body, created_by, updated_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.dm_thread_id)
        .bind(record.body)
        .bind(record.created_by)
        .bind(record.updated_by)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Loads a reply by id.
    pub async fn fetch(&self, dm_reply_id: i64) -> Result<DmReply, ReplyError> {
        let row = sqlx::query_as::<_, DmReplyRow>(
            "SELECT dm_reply_id, dm_thread_id, body, created_by, updated_by, \
                    created_at, updated_at \
             FROM dm_replies WHERE dm_reply_id = ?",
        )
        .bind(dm_reply_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ReplyError::NotFound)?;

        Ok(row.into_domain())
    }

    /// Replaces the body of an existing reply.
    pub async fn update_body(
        &self,
        dm_reply_id: i64,
        body: &str,
        updated_by: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), ReplyError> {
        let result = sqlx::query(
            "UPDATE dm_replies SET body = ?, updated_by = ?, updated_at = ? \
             WHERE dm_reply_id = ?",
        )
        .bind(body)
        .bind(updated_by)
        .bind(to_rfc3339(updated_at))
        .bind(dm_reply_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ReplyError::NotFound);
        }
        Ok(())
    }

    /// Removes a reply row.
    pub async fn delete(&self, dm_reply_id: i64) -> Result<(), ReplyError> {
        let result = sqlx::query("DELETE FROM dm_replies WHERE dm_reply_id = ?")
            .bind(dm_reply_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ReplyError::NotFound);
        }
        Ok(())
    }

    /// Lists a thread's replies in posting order.
    pub async fn list_for_thread(&self, dm_thread_id: i64) -> Result<Vec<DmReply>, ReplyError> {
        let rows = sqlx::query_as::<_, DmReplyRow>(
            "SELECT dm_reply_id, dm_thread_id, body, created_by, updated_by, \
                    created_at, updated_at \
             FROM dm_replies WHERE dm_thread_id = ? \
             ORDER BY created_at ASC, dm_reply_id ASC",
        )
        .bind(dm_thread_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DmReplyRow::into_domain).collect())
    }
}

/// Data required to create a reply row.
pub struct NewDmReply<'a> {
    pub dm_thread_id: i64,
    pub body: &'a str,
    pub created_by: i64,
    pub updated_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct DmReplyRow {
    dm_reply_id: i64,
    dm_thread_id: i64,
    body: String,
    created_by: i64,
    updated_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DmReplyRow {
    fn into_domain(self) -> DmReply {
        DmReply {
            dm_reply_id: self.dm_reply_id,
            dm_thread_id: self.dm_thread_id,
            body: self.body,
            created_by: self.created_by,
            updated_by: self.updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Errors that can occur while operating on replies.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("reply not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dm::{NewDirectMessage, NewDmThread};
    use crate::testutil::{seed_employee, setup_db};
    use crewdeck_core::types::Position;

    async fn seed_thread(db: &crate::Database, owner: i64) -> i64 {
        let repo = db.dms();
        let mut tx = repo.begin().await.expect("begin");
        let now = Utc::now();
        let dm_id = repo
            .insert_dm(
                &mut tx,
                &NewDirectMessage {
                    owner_id: owner,
                    title: "Reply testing",
                    body: None,
                    replyable: true,
                    start_at: now,
                    created_by: owner,
                    updated_by: owner,
                    created_at: now,
                },
            )
            .await
            .expect("insert dm");
        let thread_id = repo
            .insert_thread(
                &mut tx,
                &NewDmThread {
                    direct_message_id: dm_id,
                    owner_unread: true,
                    user_unread: true,
                    dm_updated: false,
                    created_by: owner,
                    created_at: now,
                },
            )
            .await
            .expect("insert thread");
        tx.commit().await.expect("commit");
        thread_id
    }

    #[tokio::test]
    async fn insert_fetch_and_list_keep_posting_order() {
        let db = setup_db().await;
        let owner = seed_employee(&db, "owner", Position::Admin).await;
        let member = seed_employee(&db, "member", Position::Member).await;
        let thread_id = seed_thread(&db, owner).await;

        let first = db
            .replies()
            .insert(&NewDmReply {
                dm_thread_id: thread_id,
                body: "first",
                created_by: member,
                updated_by: member,
                created_at: Utc::now(),
            })
            .await
            .expect("insert first");
        let second = db
            .replies()
            .insert(&NewDmReply {
                dm_thread_id: thread_id,
                body: "second",
                created_by: owner,
                updated_by: owner,
                created_at: Utc::now(),
            })
            .await
            .expect("insert second");

        let reply = db.replies().fetch(first).await.expect("fetch");
        assert_eq!(reply.body, "first");
        assert_eq!(reply.created_by, member);

        let listed = db.replies().list_for_thread(thread_id).await.expect("list");
        let ids: Vec<i64> = listed.iter().map(|r| r.dm_reply_id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn update_replaces_body_and_stamps_editor() {
        let db = setup_db().await;
        let owner = seed_employee(&db, "owner", Position::Admin).await;
        let thread_id = seed_thread(&db, owner).await;

        let id = db
            .replies()
            .insert(&NewDmReply {
                dm_thread_id: thread_id,
                body: "typo",
                created_by: owner,
                updated_by: owner,
                created_at: Utc::now(),
            })
            .await
            .expect("insert");

        db.replies()
            .update_body(id, "fixed", owner, Utc::now())
            .await
            .expect("update");

        let reply = db.replies().fetch(id).await.expect("fetch");
        assert_eq!(reply.body, "fixed");
        assert_eq!(reply.updated_by, owner);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let db = setup_db().await;
        let owner = seed_employee(&db, "owner", Position::Admin).await;
        let thread_id = seed_thread(&db, owner).await;

        let id = db
            .replies()
            .insert(&NewDmReply {
                dm_thread_id: thread_id,
                body: "gone soon",
                created_by: owner,
                updated_by: owner,
                created_at: Utc::now(),
            })
            .await
            .expect("insert");

        db.replies().delete(id).await.expect("delete");
        let err = db.replies().fetch(id).await.unwrap_err();
        assert!(matches!(err, ReplyError::NotFound));

        let err = db.replies().delete(id).await.unwrap_err();
        assert!(matches!(err, ReplyError::NotFound));
    }

    #[tokio::test]
    async fn missing_reply_operations_error() {
        let db = setup_db().await;
        let err = db.replies().fetch(-1).await.unwrap_err();
        assert!(matches!(err, ReplyError::NotFound));
        let err = db
            .replies()
            .update_body(-1, "x", 1, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReplyError::NotFound));
    }
}
