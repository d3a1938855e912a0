use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crewdeck_core::event::DomainEvent;
use crewdeck_core::membership::{dedupe_ids, MembershipDiff};
use crewdeck_core::policy;
use crewdeck_core::types::{Actor, DirectMessage, DmReply, DmThread, ThreadMember};
use crewdeck_storage::{
    Database, DmStoreError, NewDirectMessage, NewDmReply, NewDmThread, ReplyError,
    UpdateDirectMessage,
};

use crate::hub::BroadcastHub;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Direct message engine covering messages, threads, membership and replies.
#[derive(Clone)]
pub struct DmEngine {
    database: Database,
    hub: BroadcastHub,
    clock: Clock,
}

/// Request to create a direct message.
#[derive(Debug, Clone)]
pub struct NewDm {
    pub title: String,
    pub body: Option<String>,
    pub replyable: bool,
    /// Defaults to the current time when absent.
    pub start_at: Option<DateTime<Utc>>,
    pub recipients: Vec<i64>,
}

/// Request to edit a direct message.
#[derive(Debug, Clone)]
pub struct UpdateDm {
    pub title: String,
    pub body: Option<String>,
    pub replyable: bool,
    pub start_at: DateTime<Utc>,
    pub recipients: Vec<i64>,
}

/// Identifiers of a freshly created message and its thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmHandle {
    pub direct_message_id: i64,
    pub dm_thread_id: i64,
}

/// Full view of a direct message with its conversation state.
#[derive(Debug, Clone)]
pub struct DmDetail {
    pub message: DirectMessage,
    pub thread: DmThread,
    pub members: Vec<ThreadMember>,
    pub replies: Vec<DmReply>,
}

impl DmEngine {
    pub fn new(database: Database, hub: BroadcastHub) -> Self {
        Self::with_clock(database, hub, Arc::new(Utc::now))
    }

    /// Builds an engine with an injected clock so time-dependent rules can
    /// be pinned in tests.
    pub fn with_clock(database: Database, hub: BroadcastHub, clock: Clock) -> Self {
        Self {
            database,
            hub,
            clock,
        }
    }

    /// Creates a direct message, its thread and the membership rows in one
    /// transaction.
    pub async fn create(&self, actor: &Actor, request: &NewDm) -> Result<DmHandle, DmError> {
        let recipients = dedupe_ids(&request.recipients);
        if recipients.is_empty() {
            return Err(DmError::NoRecipients);
        }

        let now = (self.clock)();
        let start_at = request.start_at.unwrap_or(now);

        let repo = self.database.dms();
        let mut tx = repo.begin().await?;
        let direct_message_id = repo
            .insert_dm(
                &mut tx,
                &NewDirectMessage {
                    owner_id: actor.employee_id,
                    title: &request.title,
                    body: request.body.as_deref(),
                    replyable: request.replyable,
                    start_at,
                    created_by: actor.employee_id,
                    updated_by: actor.employee_id,
                    created_at: now,
                },
            )
            .await?;
        let dm_thread_id = repo
            .insert_thread(
                &mut tx,
                &NewDmThread {
                    direct_message_id,
                    owner_unread: true,
                    user_unread: true,
                    dm_updated: false,
                    created_by: actor.employee_id,
                    created_at: now,
                },
            )
            .await?;
        for &recipient in &recipients {
            repo.insert_member(&mut tx, dm_thread_id, recipient, now)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(
            direct_message_id,
            dm_thread_id,
            owner = actor.employee_id,
            recipients = recipients.len(),
            "direct message created"
        );

        Ok(DmHandle {
            direct_message_id,
            dm_thread_id,
        })
    }

    /// Edits a direct message and synchronizes its membership.
    ///
    /// Only the owner may edit, and only while `start_at` lies in the
    /// future. Kept members retain their read state.
    pub async fn update(
        &self,
        actor: &Actor,
        direct_message_id: i64,
        request: &UpdateDm,
    ) -> Result<(), DmError> {
        let dm = self.database.dms().fetch_dm(direct_message_id).await?;
        let now = (self.clock)();
        if !policy::can_update_dm(actor, &dm, now) {
            return Err(DmError::Forbidden);
        }

        let recipients = dedupe_ids(&request.recipients);
        if recipients.is_empty() {
            return Err(DmError::NoRecipients);
        }

        let repo = self.database.dms();
        let thread = repo.fetch_thread_for_dm(direct_message_id).await?;
        let current = repo.member_ids(thread.dm_thread_id).await?;
        let diff = MembershipDiff::compute(&current, &recipients);

        let mut tx = repo.begin().await?;
        repo.update_dm(
            &mut tx,
            direct_message_id,
            &UpdateDirectMessage {
                title: &request.title,
                body: request.body.as_deref(),
                replyable: request.replyable,
                start_at: request.start_at,
                updated_by: actor.employee_id,
                updated_at: now,
            },
        )
        .await?;
        repo.mark_thread_updated(&mut tx, thread.dm_thread_id, now)
            .await?;
        for &added in &diff.to_add {
            repo.insert_member(&mut tx, thread.dm_thread_id, added, now)
                .await?;
        }
        for &removed in &diff.to_remove {
            repo.remove_member(&mut tx, thread.dm_thread_id, removed)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(
            direct_message_id,
            added = diff.to_add.len(),
            removed = diff.to_remove.len(),
            "direct message updated"
        );

        Ok(())
    }

    /// Lists the direct messages visible to the actor. Admins see every
    /// message; members see only the threads they belong to.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<DirectMessage>, DmError> {
        let messages = if actor.is_admin() {
            self.database.dms().list_all().await?
        } else {
            self.database.dms().list_for_member(actor.employee_id).await?
        };
        Ok(messages)
    }

    /// Loads one message with its thread, membership and replies.
    pub async fn get(&self, direct_message_id: i64) -> Result<DmDetail, DmError> {
        let repo = self.database.dms();
        let message = repo.fetch_dm(direct_message_id).await?;
        let thread = repo.fetch_thread_for_dm(direct_message_id).await?;
        let members = repo.members(thread.dm_thread_id).await?;
        let replies = self
            .database
            .replies()
            .list_for_thread(thread.dm_thread_id)
            .await?;
        Ok(DmDetail {
            message,
            thread,
            members,
            replies,
        })
    }

    /// Posts a reply in a thread and announces it on the thread channel.
    pub async fn create_reply(
        &self,
        actor: &Actor,
        dm_thread_id: i64,
        body: &str,
    ) -> Result<i64, DmError> {
        let thread = self.database.dms().fetch_thread(dm_thread_id).await?;
        let message = self
            .database
            .dms()
            .fetch_thread_message(thread.dm_thread_id)
            .await?;
        if !message.replyable {
            return Err(DmError::NotReplyable);
        }

        let now = (self.clock)();
        let dm_reply_id = self
            .database
            .replies()
            .insert(&NewDmReply {
                dm_thread_id: thread.dm_thread_id,
                body,
                created_by: actor.employee_id,
                updated_by: actor.employee_id,
                created_at: now,
            })
            .await?;

        self.hub
            .publish_event(&DomainEvent::DmReplySent {
                actor_id: actor.employee_id,
                dm_thread_id: thread.dm_thread_id,
                dm_reply_id,
            })
            .await;

        Ok(dm_reply_id)
    }

    /// Edits a reply. Only its author may do so.
    pub async fn update_reply(
        &self,
        actor: &Actor,
        dm_reply_id: i64,
        body: &str,
    ) -> Result<(), DmError> {
        let reply = self.database.replies().fetch(dm_reply_id).await?;
        if !policy::can_modify_reply(actor, &reply) {
            return Err(DmError::Forbidden);
        }

        self.database
            .replies()
            .update_body(dm_reply_id, body, actor.employee_id, (self.clock)())
            .await?;

        self.hub
            .publish_event(&DomainEvent::DmReplyUpdated {
                actor_id: actor.employee_id,
                dm_thread_id: reply.dm_thread_id,
                dm_reply_id,
            })
            .await;

        Ok(())
    }

    /// Deletes a reply. Only its author may do so.
    pub async fn delete_reply(&self, actor: &Actor, dm_reply_id: i64) -> Result<(), DmError> {
        let reply = self.database.replies().fetch(dm_reply_id).await?;
        if !policy::can_modify_reply(actor, &reply) {
            return Err(DmError::Forbidden);
        }

        self.database.replies().delete(dm_reply_id).await?;

        self.hub
            .publish_event(&DomainEvent::DmReplyDeleted {
                actor_id: actor.employee_id,
                dm_thread_id: reply.dm_thread_id,
                dm_reply_id,
            })
            .await;

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DmError {
    #[error("direct message not found")]
    NotFound,
    #[error("a direct message needs at least one recipient")]
    NoRecipients,
    #[error("this thread does not accept replies")]
    NotReplyable,
    #[error("actor is not allowed to perform this action")]
    Forbidden,
    #[error("storage error: {0}")]
    Storage(DmStoreError),
    #[error("reply storage error: {0}")]
    Reply(ReplyError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<DmStoreError> for DmError {
    fn from(value: DmStoreError) -> Self {
        match value {
            DmStoreError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

impl From<ReplyError> for DmError {
    fn from(value: ReplyError) -> Self {
        match value {
            ReplyError::NotFound => Self::NotFound,
            other => Self::Reply(other),
        }
    }
}
