use route_tracker_lib::Coordinate;
use tokio::sync::mpsc;

mod gpx_replay;
mod manual;
mod request;

pub use gpx_replay::*;
pub use manual::*;
pub use request::*;

/// Something that produces position fixes once subscribed.
///
/// Sources own their delivery cadence and may deliver nothing at all (for example when
/// location permission was never granted). Samples may arrive from any task or thread.
pub trait LocationSource: Send + Sync {
    fn subscribe(&self, sink: SampleSink) -> SubscriptionHandle;

    /// Stops delivery. Anything pushed afterwards is refused once the subscriber closes its queue.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Opaque ticket returned by [`LocationSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub(crate) u64);

impl SubscriptionHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Write end of the queue a subscriber drains.
#[derive(Debug, Clone)]
pub struct SampleSink {
    tx: mpsc::UnboundedSender<Coordinate>,
}

impl SampleSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Coordinate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false once the subscriber stopped accepting samples.
    pub fn deliver(&self, coordinate: Coordinate) -> bool {
        self.tx.send(coordinate).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
