use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error};

use crate::db::AvailabilityNotifier;

pub const DEFAULT_BUFFER: usize = 32;

/// Server-to-viewer message. Viewers filter by `eventId` themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LiveUpdate {
    AvailabilityUpdated {
        #[serde(rename = "eventId")]
        event_id: String,
    },
}

type ChannelId = u64;

struct Registry {
    channels: Mutex<HashMap<ChannelId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    buffer: usize,
}

/// Fan-out of live updates to every connected viewer.
///
/// Cloning yields a handle to the same set of channels.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    /// `buffer` is how many undelivered messages a viewer may lag behind
    /// before further notifications skip it.
    pub fn new(buffer: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                channels: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Registers a viewer. The channel is removed again when the returned
    /// subscription is dropped.
    pub fn connect(&self) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.registry.buffer);
        self.channels().insert(id, sender);

        Subscription {
            id,
            receiver,
            broadcaster: self.clone(),
        }
    }

    pub fn connected(&self) -> usize {
        self.channels().len()
    }

    /// Delivers to every channel with room for the message and returns how
    /// many received it. Lagging channels are skipped, closed ones dropped.
    pub fn notify(&self, event_id: &str) -> usize {
        let update = LiveUpdate::AvailabilityUpdated {
            event_id: event_id.to_string(),
        };
        let payload: Arc<str> = match serde_json::to_string(&update) {
            Ok(json) => json.into(),
            Err(e) => {
                error!(error = %e, "Failed to serialize live update");
                return 0;
            }
        };

        let snapshot: Vec<(ChannelId, mpsc::Sender<Arc<str>>)> = self
            .channels()
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sender) in snapshot {
            match sender.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => debug!(channel = id, "Viewer lagging, update skipped"),
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut channels = self.channels();
            for id in closed {
                channels.remove(&id);
            }
        }

        delivered
    }

    fn disconnect(&self, id: ChannelId) {
        self.channels().remove(&id);
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<ChannelId, mpsc::Sender<Arc<str>>>> {
        // The map stays consistent even if a holder panicked.
        self.registry
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl AvailabilityNotifier for Broadcaster {
    fn availability_updated(&self, event_id: &str) {
        let delivered = self.notify(event_id);
        debug!(event_id = %event_id, delivered, "Live update sent");
    }
}

/// One viewer's end of the broadcaster.
pub struct Subscription {
    id: ChannelId,
    receiver: mpsc::Receiver<Arc<str>>,
    broadcaster: Broadcaster,
}

impl Subscription {
    /// Next serialized update, or `None` once the broadcaster dropped this channel.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.disconnect(self.id);
    }
}
