use std::{collections::HashMap, sync::atomic::{AtomicU64, Ordering}};

use parking_lot::Mutex;
use route_tracker_lib::Coordinate;

use super::{LocationSource, SampleSink, SubscriptionHandle};

/// A source whose fixes are pushed by hand. One that is never pushed behaves like a
/// device without location permission.
#[derive(Debug, Default)]
pub struct ManualLocationSource {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, SampleSink>>,
}

impl ManualLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers to every subscriber, returns how many accepted the sample.
    pub fn push(&self, coordinate: Coordinate) -> usize {
        let subscribers = self.subscribers.lock();
        subscribers.values()
            .filter(|sink| sink.deliver(coordinate))
            .count()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl LocationSource for ManualLocationSource {
    fn subscribe(&self, sink: SampleSink) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().insert(id, sink);
        tracing::debug!("Manual location subscriber {} added", id);
        SubscriptionHandle(id)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.subscribers.lock().remove(&handle.0).is_none() {
            tracing::warn!("Unsubscribe for unknown subscription {}", handle.0);
        }
    }
}
