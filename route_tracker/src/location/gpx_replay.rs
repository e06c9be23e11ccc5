use std::{
    collections::HashMap,
    io::{BufReader, Read},
    path::Path,
    sync::{atomic::{AtomicU64, Ordering}, Arc},
};

use parking_lot::Mutex;
use route_tracker_lib::Coordinate;
use tokio::{sync::watch, task::JoinHandle};

use super::{LocationRequest, LocationSource, SampleSink, SubscriptionHandle};

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Failed to open track file {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse GPX: {0}")]
    Gpx(String),
}

/// Plays back the track points of a GPX file as if they were live fixes.
///
/// Every subscription replays the whole file from the start, paced by the request's
/// interval and filtered by its minimum displacement. Subscribing needs a running tokio
/// runtime.
pub struct GpxReplaySource {
    points: Arc<[Coordinate]>,
    request: LocationRequest,
    next_id: AtomicU64,
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
    finished: Arc<watch::Sender<bool>>,
}

impl GpxReplaySource {
    pub fn open(path: impl AsRef<Path>, request: LocationRequest) -> Result<Self, LocationError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| LocationError::Open {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_reader(BufReader::new(file), request)
    }

    pub fn from_reader(reader: impl Read, request: LocationRequest) -> Result<Self, LocationError> {
        let gpx = gpx::read(reader).map_err(|err| LocationError::Gpx(err.to_string()))?;

        let points: Vec<Coordinate> = gpx.tracks.iter()
            .flat_map(|track| track.segments.iter())
            .flat_map(|segment| segment.points.iter())
            .map(|waypoint| Coordinate::from(waypoint.point()))
            .collect();

        tracing::info!("Loaded {} track points for replay", points.len());

        Ok(Self::from_points(points, request))
    }

    pub fn from_points(points: Vec<Coordinate>, request: LocationRequest) -> Self {
        let (finished, _) = watch::channel(false);
        Self {
            points: points.into(),
            request,
            next_id: AtomicU64::new(0),
            tasks: Mutex::new(HashMap::new()),
            finished: Arc::new(finished),
        }
    }

    /// Number of points in the file, before displacement filtering.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Resolves once some subscription has replayed every point.
    pub async fn wait_finished(&self) {
        let mut rx = self.finished.subscribe();
        let _ = rx.wait_for(|finished| *finished).await;
    }
}

impl LocationSource for GpxReplaySource {
    fn subscribe(&self, sink: SampleSink) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let points = self.points.clone();
        let request = self.request;
        let finished = self.finished.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(request.pacing());
            let mut last: Option<Coordinate> = None;

            for point in points.iter() {
                if !request.admits(last.as_ref(), point) {
                    continue;
                }

                ticker.tick().await;
                if !sink.deliver(*point) {
                    tracing::debug!("Replay {} stopped, subscriber closed", id);
                    return;
                }
                last = Some(*point);
            }

            tracing::info!("Replay {} finished", id);
            finished.send_replace(true);
        });

        self.tasks.lock().insert(id, task);
        SubscriptionHandle(id)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(task) = self.tasks.lock().remove(&handle.0) {
            task.abort();
        }
    }
}

impl Drop for GpxReplaySource {
    fn drop(&mut self) {
        for (_, task) in self.tasks.get_mut().drain() {
            task.abort();
        }
    }
}
