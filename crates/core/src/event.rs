use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::channel::ChannelId;

/// Business events that feed the notification fan-out and realtime dispatch.
///
/// One variant per event kind with a strongly typed payload; every consumer
/// matches exhaustively so a new kind cannot be silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    #[serde(rename_all = "snake_case")]
    EmployeeCreated {
        actor_id: i64,
        actor_name: String,
        employee_name: String,
    },
    #[serde(rename_all = "snake_case")]
    EmployeeUpdated {
        actor_id: i64,
        actor_name: String,
        employee_name: String,
    },
    #[serde(rename_all = "snake_case")]
    EmployeeDeleted {
        actor_id: i64,
        actor_name: String,
        employee_name: String,
    },
    #[serde(rename_all = "snake_case")]
    ProjectCreated {
        actor_id: i64,
        actor_name: String,
        project_name: String,
    },
    #[serde(rename_all = "snake_case")]
    ProjectUpdated {
        actor_id: i64,
        actor_name: String,
        project_name: String,
    },
    #[serde(rename_all = "snake_case")]
    ProjectDeleted {
        actor_id: i64,
        actor_name: String,
        project_name: String,
    },
    #[serde(rename_all = "snake_case")]
    TaskCreated {
        actor_id: i64,
        actor_name: String,
        project_name: String,
        assigned_member_id: i64,
    },
    #[serde(rename_all = "snake_case")]
    TaskUpdated {
        actor_id: i64,
        actor_name: String,
        task_title: String,
        assigned_member_id: i64,
    },
    #[serde(rename_all = "snake_case")]
    EmployeeReported {
        actor_id: i64,
        actor_name: String,
        reported_at: DateTime<Utc>,
        report_to: i64,
    },
    #[serde(rename_all = "snake_case")]
    DmReplySent {
        actor_id: i64,
        dm_thread_id: i64,
        dm_reply_id: i64,
    },
    #[serde(rename_all = "snake_case")]
    DmReplyUpdated {
        actor_id: i64,
        dm_thread_id: i64,
        dm_reply_id: i64,
    },
    #[serde(rename_all = "snake_case")]
    DmReplyDeleted {
        actor_id: i64,
        dm_thread_id: i64,
        dm_reply_id: i64,
    },
}

impl DomainEvent {
    /// Returns the employee that triggered the event.
    pub fn actor_id(&self) -> i64 {
        match self {
            Self::EmployeeCreated { actor_id, .. }
            | Self::EmployeeUpdated { actor_id, .. }
            | Self::EmployeeDeleted { actor_id, .. }
            | Self::ProjectCreated { actor_id, .. }
            | Self::ProjectUpdated { actor_id, .. }
            | Self::ProjectDeleted { actor_id, .. }
            | Self::TaskCreated { actor_id, .. }
            | Self::TaskUpdated { actor_id, .. }
            | Self::EmployeeReported { actor_id, .. }
            | Self::DmReplySent { actor_id, .. }
            | Self::DmReplyUpdated { actor_id, .. }
            | Self::DmReplyDeleted { actor_id, .. } => *actor_id,
        }
    }

    /// Returns the canonical event name used on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::EmployeeCreated { .. } => "employee-created",
            Self::EmployeeUpdated { .. } => "employee-updated",
            Self::EmployeeDeleted { .. } => "employee-deleted",
            Self::ProjectCreated { .. } => "project-created",
            Self::ProjectUpdated { .. } => "project-updated",
            Self::ProjectDeleted { .. } => "project-deleted",
            Self::TaskCreated { .. } => "task-created",
            Self::TaskUpdated { .. } => "task-updated",
            Self::EmployeeReported { .. } => "employee-reported",
            Self::DmReplySent { .. } => "dm-reply-sent",
            Self::DmReplyUpdated { .. } => "dm-reply-updated",
            Self::DmReplyDeleted { .. } => "dm-reply-deleted",
        }
    }

    /// Returns the employee named by the event as a direct notification
    /// target, in addition to the admin audience.
    pub fn target_employee_id(&self) -> Option<i64> {
        match self {
            Self::TaskCreated {
                assigned_member_id, ..
            }
            | Self::TaskUpdated {
                assigned_member_id, ..
            } => Some(*assigned_member_id),
            Self::EmployeeReported { report_to, .. } => Some(*report_to),
            _ => None,
        }
    }

    /// Returns the realtime channel the event is published on.
    pub fn channel(&self) -> ChannelId {
        match self {
            Self::TaskCreated { .. } | Self::TaskUpdated { .. } => ChannelId::TaskNotification,
            Self::DmReplySent { dm_thread_id, .. }
            | Self::DmReplyUpdated { dm_thread_id, .. }
            | Self::DmReplyDeleted { dm_thread_id, .. } => ChannelId::DmThread(*dm_thread_id),
            _ => ChannelId::AdminNotification,
        }
    }

    /// Returns `true` when the event also produces a durable notification.
    ///
    /// Reply events are realtime-only; the other kinds fan out to the
    /// notification table as well.
    pub fn fans_out(&self) -> bool {
        !matches!(
            self,
            Self::DmReplySent { .. } | Self::DmReplyUpdated { .. } | Self::DmReplyDeleted { .. }
        )
    }

    /// Builds the human-readable notification text for the event.
    pub fn message(&self) -> String {
        match self {
            Self::EmployeeCreated {
                actor_name,
                employee_name,
                ..
            } => format!("{actor_name} created a new employee named {employee_name}"),
            Self::EmployeeUpdated {
                actor_name,
                employee_name,
                ..
            } => format!("{actor_name} updated an employee named {employee_name}"),
            Self::EmployeeDeleted {
                actor_name,
                employee_name,
                ..
            } => format!("{actor_name} deleted an employee named {employee_name}"),
            Self::ProjectCreated {
                actor_name,
                project_name,
                ..
            } => format!("{actor_name} created a new project named {project_name}"),
            Self::ProjectUpdated {
                actor_name,
                project_name,
                ..
            } => format!("{actor_name} updated a project named {project_name}"),
            Self::ProjectDeleted {
                actor_name,
                project_name,
                ..
            } => format!("{actor_name} deleted a project named {project_name}"),
            Self::TaskCreated {
                actor_name,
                project_name,
                ..
            } => format!("{actor_name} created a new task for project named {project_name}"),
            Self::TaskUpdated {
                actor_name,
                task_title,
                ..
            } => format!("{actor_name} updated a task titled {task_title}"),
            Self::EmployeeReported {
                actor_name,
                reported_at,
                ..
            } => format!(
                "{actor_name} has reported in {}",
                reported_at.format("%d %b %Y %I:%M:%S %p")
            ),
            Self::DmReplySent { dm_thread_id, .. } => {
                format!("A reply was posted in thread {dm_thread_id}")
            }
            Self::DmReplyUpdated { dm_thread_id, .. } => {
                format!("A reply was edited in thread {dm_thread_id}")
            }
            Self::DmReplyDeleted { dm_thread_id, .. } => {
                format!("A reply was removed from thread {dm_thread_id}")
            }
        }
    }

    /// Produces the JSON payload pushed to realtime subscribers.
    pub fn payload(&self) -> Value {
        let mut value = json!({
            "message": self.message(),
            "created_by": self.actor_id(),
        });
        let extra = match self {
            Self::TaskCreated {
                assigned_member_id, ..
            }
            | Self::TaskUpdated {
                assigned_member_id, ..
            } => json!({ "task_member_id": assigned_member_id }),
            Self::EmployeeReported { report_to, .. } => json!({ "report_to": report_to }),
            Self::DmReplySent {
                dm_thread_id,
                dm_reply_id,
                ..
            }
            | Self::DmReplyUpdated {
                dm_thread_id,
                dm_reply_id,
                ..
            }
            | Self::DmReplyDeleted {
                dm_thread_id,
                dm_reply_id,
                ..
            } => json!({ "dm_thread_id": dm_thread_id, "dm_reply_id": dm_reply_id }),
            _ => Value::Null,
        };
        if let (Some(map), Value::Object(extra)) = (value.as_object_mut(), extra) {
            map.extend(extra);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_events_target_the_assigned_member() {
        let event = DomainEvent::TaskCreated {
            actor_id: 1,
            actor_name: "Aye Chan".to_string(),
            project_name: "Payroll".to_string(),
            assigned_member_id: 9,
        };
        assert_eq!(event.target_employee_id(), Some(9));
        assert_eq!(event.channel(), ChannelId::TaskNotification);
        assert!(event.fans_out());
        assert_eq!(
            event.message(),
            "Aye Chan created a new task for project named Payroll"
        );
    }

    #[test]
    fn employee_events_have_no_direct_target() {
        let event = DomainEvent::EmployeeCreated {
            actor_id: 1,
            actor_name: "Aye Chan".to_string(),
            employee_name: "Min Thu".to_string(),
        };
        assert_eq!(event.target_employee_id(), None);
        assert_eq!(event.channel(), ChannelId::AdminNotification);
    }

    #[test]
    fn reply_events_are_realtime_only() {
        let event = DomainEvent::DmReplySent {
            actor_id: 3,
            dm_thread_id: 11,
            dm_reply_id: 5,
        };
        assert!(!event.fans_out());
        assert_eq!(event.channel(), ChannelId::DmThread(11));

        let payload = event.payload();
        assert_eq!(payload["dm_thread_id"], 11);
        assert_eq!(payload["dm_reply_id"], 5);
        assert_eq!(payload["created_by"], 3);
    }

    #[test]
    fn report_event_carries_the_recipient() {
        let reported_at = DateTime::parse_from_rfc3339("2024-03-01T06:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = DomainEvent::EmployeeReported {
            actor_id: 4,
            actor_name: "Su Su".to_string(),
            reported_at,
            report_to: 2,
        };
        assert_eq!(event.target_employee_id(), Some(2));
        assert_eq!(event.message(), "Su Su has reported in 01 Mar 2024 06:30:00 AM");
    }
}
