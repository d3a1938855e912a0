use chrono::{DateTime, Utc};

use crate::channel::ChannelId;
use crate::types::{Actor, DirectMessage, DmReply};

/// Returns `true` when the actor may edit the direct message.
///
/// Only the owner may edit, and only while the message has not started
/// sending (`start_at` still in the future).
pub fn can_update_dm(actor: &Actor, dm: &DirectMessage, now: DateTime<Utc>) -> bool {
    dm.owner_id == actor.employee_id && dm.start_at > now
}

/// Returns `true` when the actor may edit or delete the reply.
pub fn can_modify_reply(actor: &Actor, reply: &DmReply) -> bool {
    reply.created_by == actor.employee_id
}

/// Project access is admin-only across the board.
pub fn can_manage_projects(actor: &Actor) -> bool {
    actor.is_admin()
}

/// Channel join rule evaluated when a client subscribes.
///
/// `thread_members` is the thread's current membership and is only
/// consulted for [`ChannelId::DmThread`] channels.
pub fn can_join(actor: &Actor, channel: &ChannelId, thread_members: &[i64]) -> bool {
    match channel {
        ChannelId::AdminNotification => actor.is_admin(),
        ChannelId::TaskNotification => true,
        ChannelId::DmThread(_) => {
            actor.is_admin() || thread_members.contains(&actor.employee_id)
        }
    }
}

/// Computes the recipient set for a durable notification.
///
/// All admins except the acting employee are notified; the explicit direct
/// target (task assignee, report recipient) is appended when named. The
/// result is deduplicated and order-stable.
pub fn notification_recipients(
    admin_ids: &[i64],
    actor_id: i64,
    target: Option<i64>,
) -> Vec<i64> {
    let mut recipients: Vec<i64> = Vec::with_capacity(admin_ids.len() + 1);
    for &id in admin_ids {
        if id != actor_id && !recipients.contains(&id) {
            recipients.push(id);
        }
    }
    if let Some(target_id) = target {
        if !recipients.contains(&target_id) {
            recipients.push(target_id);
        }
    }
    recipients
}
