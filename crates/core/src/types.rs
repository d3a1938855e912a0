use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position of an employee, the single authorization axis of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Admin,
    Member,
}

impl Position {
    /// Returns the canonical database representation for the position.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Admin => 0,
            Self::Member => 1,
        }
    }

    /// Decodes the database representation; unknown values fall back to member.
    pub fn from_i64(value: i64) -> Self {
        match value {
            0 => Self::Admin,
            _ => Self::Member,
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Authenticated identity threaded explicitly through every operation.
///
/// Identity resolution itself (sessions, tokens) is an external collaborator;
/// callers construct an `Actor` once per request and pass it down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub employee_id: i64,
    pub employee_name: String,
    pub position: Position,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.position.is_admin()
    }
}

/// Employee record persisted for the tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: i64,
    pub employee_name: String,
    pub email: String,
    pub position: Position,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Employee {
    /// Returns the [`Actor`] identity for this employee.
    pub fn as_actor(&self) -> Actor {
        Actor {
            employee_id: self.employee_id,
            employee_name: self.employee_name.clone(),
            position: self.position,
        }
    }
}

/// Durable notification produced by the fan-out engine.
///
/// Immutable after creation; only the per-recipient visibility rows change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Direct message owned by its sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub direct_message_id: i64,
    pub owner_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub replyable: bool,
    pub start_at: DateTime<Utc>,
    pub created_by: i64,
    pub updated_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conversation thread attached 1:1 to a direct message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmThread {
    pub dm_thread_id: i64,
    pub direct_message_id: i64,
    pub owner_unread: bool,
    pub user_unread: bool,
    pub dm_updated: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership row binding an employee to a thread.
///
/// The membership set is the authoritative recipient list for a thread; the
/// message owner is not implicitly a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMember {
    pub dm_thread_id: i64,
    pub employee_id: i64,
    pub user_unread: bool,
}

/// Reply posted in a thread, mutable only by its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmReply {
    pub dm_reply_id: i64,
    pub dm_thread_id: i64,
    pub body: String,
    pub created_by: i64,
    pub updated_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_round_trips_through_db_encoding() {
        assert_eq!(Position::from_i64(Position::Admin.as_i64()), Position::Admin);
        assert_eq!(Position::from_i64(Position::Member.as_i64()), Position::Member);
    }

    #[test]
    fn unknown_position_value_defaults_to_member() {
        assert_eq!(Position::from_i64(7), Position::Member);
    }
}
