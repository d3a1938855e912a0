use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use crewdeck_core::channel::ChannelId;
use crewdeck_core::event::DomainEvent;
use crewdeck_core::policy;
use crewdeck_core::types::Actor;
use crewdeck_storage::{Database, DmStoreError};

/// Message delivered to realtime subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub event: &'static str,
    pub sent_at: DateTime<Utc>,
    pub payload: Value,
}

/// In-process realtime dispatcher.
///
/// Channels are created lazily on first use; a channel with no subscribers
/// simply drops published envelopes.
#[derive(Clone)]
pub struct BroadcastHub {
    database: Database,
    channels: Arc<RwLock<HashMap<ChannelId, broadcast::Sender<Arc<Envelope>>>>>,
    buffer: usize,
    counters: Arc<ClientCounters>,
}

impl BroadcastHub {
    pub fn new(database: Database, buffer: usize) -> Self {
        Self {
            database,
            channels: Arc::new(RwLock::new(HashMap::new())),
            buffer,
            counters: Arc::new(ClientCounters::new()),
        }
    }

    async fn ensure_channel(&self, channel: ChannelId) -> broadcast::Sender<Arc<Envelope>> {
        let mut guard = self.channels.write().await;
        guard
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .clone()
    }

    /// Publishes an envelope on a channel. Delivery is fire-and-forget;
    /// an empty channel is not an error.
    pub async fn publish(&self, channel: ChannelId, envelope: Envelope) {
        let sender = self.ensure_channel(channel).await;
        counter!("broadcast_publish_total", "channel" => channel.kind_str()).increment(1);
        let _ = sender.send(Arc::new(envelope));
    }

    /// Publishes a domain event on its canonical channel.
    pub async fn publish_event(&self, event: &DomainEvent) {
        let envelope = Envelope {
            event: event.event_name(),
            sent_at: Utc::now(),
            payload: event.payload(),
        };
        self.publish(event.channel(), envelope).await;
    }

    /// Evaluates the channel join rule for the actor and, when admitted,
    /// returns a live subscription.
    ///
    /// Thread membership is loaded fresh at join time so a removed member
    /// cannot rejoin with stale state.
    pub async fn subscribe(
        &self,
        actor: &Actor,
        channel: ChannelId,
    ) -> Result<Subscription, JoinError> {
        let thread_members = match channel {
            ChannelId::DmThread(thread_id) => self.database.dms().member_ids(thread_id).await?,
            _ => Vec::new(),
        };

        if !policy::can_join(actor, &channel, &thread_members) {
            counter!("broadcast_join_denied_total", "channel" => channel.kind_str()).increment(1);
            tracing::warn!(
                employee_id = actor.employee_id,
                channel = %channel,
                "channel join denied"
            );
            return Err(JoinError::Denied);
        }

        let sender = self.ensure_channel(channel).await;
        let guard = ClientGuard::new(self.counters.clone(), channel);
        Ok(Subscription {
            inner: BroadcastStream::new(sender.subscribe()),
            _guard: guard,
        })
    }
}

/// Live subscription to one channel.
///
/// Dropping the subscription detaches the client and updates the gauge.
pub struct Subscription {
    inner: BroadcastStream<Arc<Envelope>>,
    _guard: ClientGuard,
}

impl Subscription {
    /// Waits for the next envelope. Returns `None` once the channel sender
    /// is gone; lagged gaps are skipped.
    pub async fn recv(&mut self) -> Option<Arc<Envelope>> {
        while let Some(item) = self.inner.next().await {
            if let Ok(envelope) = item {
                return Some(envelope);
            }
        }
        None
    }
}

struct ClientCounters {
    admin: AtomicUsize,
    task: AtomicUsize,
    dm_thread: AtomicUsize,
}

impl ClientCounters {
    fn new() -> Self {
        Self {
            admin: AtomicUsize::new(0),
            task: AtomicUsize::new(0),
            dm_thread: AtomicUsize::new(0),
        }
    }

    fn slot(&self, channel: ChannelId) -> &AtomicUsize {
        match channel {
            ChannelId::AdminNotification => &self.admin,
            ChannelId::TaskNotification => &self.task,
            ChannelId::DmThread(_) => &self.dm_thread,
        }
    }

    fn increment(&self, channel: ChannelId) {
        let value = self.slot(channel).fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("broadcast_clients", "channel" => channel.kind_str()).set(value as f64);
    }

    fn decrement(&self, channel: ChannelId) {
        let value = self
            .slot(channel)
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1);
        gauge!("broadcast_clients", "channel" => channel.kind_str()).set(value as f64);
    }
}

struct ClientGuard {
    counters: Arc<ClientCounters>,
    channel: ChannelId,
}

impl ClientGuard {
    fn new(counters: Arc<ClientCounters>, channel: ChannelId) -> Self {
        counters.increment(channel);
        Self { counters, channel }
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.counters.decrement(self.channel);
    }
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("actor is not allowed to join this channel")]
    Denied,
    #[error("storage error: {0}")]
    Storage(#[from] DmStoreError),
}
