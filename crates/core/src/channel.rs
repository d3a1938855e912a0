use std::fmt;

/// Identifier of a realtime broadcast channel.
///
/// The wire representation is the string from [`ChannelId::name`]; the
/// enum itself never crosses a serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    /// Events every admin should see.
    AdminNotification,
    /// Task activity, visible to any authenticated employee.
    TaskNotification,
    /// Per-thread conversation channel.
    DmThread(i64),
}

impl ChannelId {
    /// Returns the wire name clients subscribe with.
    pub fn name(&self) -> String {
        match self {
            Self::AdminNotification => "admin-notification".to_string(),
            Self::TaskNotification => "task-notification".to_string(),
            Self::DmThread(thread_id) => format!("dm-thread-{thread_id}"),
        }
    }

    /// Returns the channel family label used for metrics.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::AdminNotification => "admin-notification",
            Self::TaskNotification => "task-notification",
            Self::DmThread(_) => "dm-thread",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
