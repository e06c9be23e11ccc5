use std::sync::Arc;

use parking_lot::Mutex;
use route_tracker_lib::{Coordinate, Route, RouteSummary};
use tokio::{sync::{mpsc, oneshot, watch}, task::JoinHandle};

use crate::{
    location::{LocationSource, SampleSink, SubscriptionHandle},
    repository::{RepositoryError, RouteRepository},
    session::{SessionError, SessionState, SessionStatus, TrackingSession},
};

/// One-shot notifications for whoever presents the tracking screen.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    RouteSaved(Route),
    /// The recording is still available locally through [`Tracker::points`].
    SaveFailed {
        route: Route,
        cause: RepositoryError,
    },
}

pub type TrackerEvents = mpsc::UnboundedReceiver<TrackerEvent>;

struct ActiveRecording {
    subscription: SubscriptionHandle,
    close: oneshot::Sender<()>,
    pump: JoinHandle<()>,
}

/// Drives tracking sessions for a tracking screen: wires a session to the location source
/// while recording, and hands the finished route to the repository exactly once.
///
/// All samples for a session go through one queue drained by a single pump task, so
/// appends never interleave no matter which thread the source delivers on.
pub struct Tracker<L: LocationSource, R: RouteRepository> {
    source: Arc<L>,
    repository: Arc<R>,
    session: Arc<Mutex<TrackingSession>>,
    // Held across the awaits in start/stop, so transitions never overlap.
    recording: tokio::sync::Mutex<Option<ActiveRecording>>,
    status: Arc<watch::Sender<SessionStatus>>,
    events: mpsc::UnboundedSender<TrackerEvent>,
}

impl<L: LocationSource + 'static, R: RouteRepository + 'static> Tracker<L, R> {
    pub fn new(source: Arc<L>, repository: Arc<R>) -> (Self, TrackerEvents) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SessionStatus::Idle);

        let tracker = Self {
            source,
            repository,
            session: Arc::new(Mutex::new(TrackingSession::new())),
            recording: tokio::sync::Mutex::new(None),
            status: Arc::new(status),
            events,
        };

        (tracker, events_rx)
    }

    /// Begins a recording. A stopped session is replaced by a fresh one; a failed start
    /// leaves the current session untouched.
    pub async fn start(&self, name: &str) -> Result<(), SessionError> {
        let mut recording = self.recording.lock().await;

        {
            let mut session = self.session.lock();
            let result = if session.state() == SessionState::Stopped {
                let mut fresh = TrackingSession::new();
                let result = fresh.start(name);
                if result.is_ok() {
                    *session = fresh;
                }
                result
            } else {
                session.start(name)
            };

            if let Err(err) = result {
                tracing::warn!("Refused to start tracking: {}", err);
                return Err(err);
            }

            self.status.send_replace(session.status());
        }

        let (sink, samples) = SampleSink::channel();
        let subscription = self.source.subscribe(sink);
        let (close, close_rx) = oneshot::channel();
        let pump = tokio::spawn(pump_samples(
            samples,
            close_rx,
            self.session.clone(),
            self.status.clone(),
        ));

        *recording = Some(ActiveRecording {
            subscription,
            close,
            pump,
        });

        tracing::info!("Started tracking route {:?}", name);
        Ok(())
    }

    /// Stops the recording and returns the frozen route. The save runs in the background and
    /// reports through [`TrackerEvent`]; it is never retried.
    pub async fn stop(&self) -> Result<Route, SessionError> {
        let mut recording = self.recording.lock().await;

        let Some(active) = recording.take() else {
            let state = self.session.lock().state();
            tracing::warn!("Ignoring stop while {}", state);
            return Err(SessionError::InvalidTransition {
                operation: "stop",
                state,
            });
        };

        self.source.unsubscribe(active.subscription);
        // The pump keeps whatever was queued before it closes.
        let _ = active.close.send(());
        if let Err(err) = active.pump.await {
            tracing::error!("Sample pump ended abnormally: {}", err);
        }

        let route = {
            let mut session = self.session.lock();
            let route = session.stop()?;
            self.status.send_replace(session.status());
            route
        };

        tracing::info!("Stopped tracking route {:?} with {} points", route.name, route.len());
        self.spawn_save(route.clone());

        Ok(route)
    }

    fn spawn_save(&self, route: Route) {
        let repository = self.repository.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let result = repository.save(&route.name, &route.coordinates).await;
            let event = match result {
                Ok(stored) => TrackerEvent::RouteSaved(stored),
                Err(cause) => {
                    tracing::error!("Failed to save route {:?}: {}", route.name, cause);
                    TrackerEvent::SaveFailed { route, cause }
                },
            };

            // Nobody is listening any more, the result is dropped.
            let _ = events.send(event);
        });
    }

    pub fn status(&self) -> SessionStatus {
        self.session.lock().status()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn name(&self) -> String {
        self.session.lock().name().to_string()
    }

    /// Copy of the points recorded so far, or of the frozen route once stopped.
    pub fn points(&self) -> Vec<Coordinate> {
        self.session.lock().points().to_vec()
    }

    pub fn with_summary<T>(&self, f: impl FnOnce(RouteSummary<'_>) -> T) -> T {
        f(self.session.lock().summary())
    }
}

impl<L: LocationSource, R: RouteRepository> Drop for Tracker<L, R> {
    fn drop(&mut self) {
        if let Some(active) = self.recording.get_mut().take() {
            self.source.unsubscribe(active.subscription);
            active.pump.abort();
        }
    }
}

async fn pump_samples(
    mut samples: mpsc::UnboundedReceiver<Coordinate>,
    mut close: oneshot::Receiver<()>,
    session: Arc<Mutex<TrackingSession>>,
    status: Arc<watch::Sender<SessionStatus>>,
) {
    loop {
        tokio::select! {
            sample = samples.recv() => match sample {
                Some(coordinate) => record(&session, &status, coordinate),
                None => {
                    tracing::debug!("Location source released the sample queue");
                    return;
                },
            },
            _ = &mut close => break,
        }
    }

    samples.close();
    while let Some(coordinate) = samples.recv().await {
        record(&session, &status, coordinate);
    }
}

fn record(
    session: &Mutex<TrackingSession>,
    status: &watch::Sender<SessionStatus>,
    coordinate: Coordinate,
) {
    let mut session = session.lock();
    match session.on_sample(coordinate) {
        Ok(()) => {
            tracing::debug!("Sample {:?}", coordinate);
            status.send_replace(session.status());
        },
        Err(err) => tracing::debug!("Dropped sample: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        location::{GpxReplaySource, LocationRequest, ManualLocationSource},
        test_support::RecordingRepository,
    };

    type Fixture = (
        Tracker<ManualLocationSource, RecordingRepository>,
        TrackerEvents,
        Arc<ManualLocationSource>,
        Arc<RecordingRepository>,
    );

    fn tracker(repository: RecordingRepository) -> Fixture {
        let source = Arc::new(ManualLocationSource::new());
        let repository = Arc::new(repository);
        let (tracker, events) = Tracker::new(source.clone(), repository.clone());
        (tracker, events, source, repository)
    }

    async fn next_event(events: &mut TrackerEvents) -> TrackerEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv()).await
            .expect("no event within timeout")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn morning_run_is_saved_once() {
        let (tracker, mut events, source, repository) = tracker(RecordingRepository::new());

        tracker.start("Morning Run").await.unwrap();
        source.push(Coordinate::new(10.0, 20.0));
        source.push(Coordinate::new(10.001, 20.001));
        let route = tracker.stop().await.unwrap();

        let points = vec![Coordinate::new(10.0, 20.0), Coordinate::new(10.001, 20.001)];
        let expected = Route::new("Morning Run", points);
        assert_eq!(route, expected);
        assert_eq!(next_event(&mut events).await, TrackerEvent::RouteSaved(expected.clone()));
        assert_eq!(repository.saved(), vec![expected]);
    }

    #[tokio::test]
    async fn blank_name_never_subscribes_or_saves() {
        let (tracker, mut events, source, repository) = tracker(RecordingRepository::new());

        assert_eq!(tracker.start("").await, Err(SessionError::BlankName));
        assert_eq!(tracker.status(), SessionStatus::Idle);
        assert_eq!(source.subscriber_count(), 0);

        assert!(tracker.stop().await.is_err());
        tokio::task::yield_now().await;
        assert!(events.try_recv().is_err());
        assert!(repository.saved().is_empty());
    }

    #[tokio::test]
    async fn second_stop_is_refused() {
        let (tracker, mut events, _source, repository) = tracker(RecordingRepository::new());

        tracker.start("Ride").await.unwrap();
        tracker.stop().await.unwrap();
        assert_eq!(tracker.stop().await, Err(SessionError::InvalidTransition {
            operation: "stop",
            state: SessionState::Stopped,
        }));

        next_event(&mut events).await;
        tokio::task::yield_now().await;
        assert!(events.try_recv().is_err());
        assert_eq!(repository.saved().len(), 1);
    }

    #[tokio::test]
    async fn start_while_tracking_is_refused() {
        let (tracker, _events, source, _repository) = tracker(RecordingRepository::new());

        tracker.start("Ride").await.unwrap();
        assert!(tracker.start("Other").await.is_err());
        assert_eq!(tracker.name(), "Ride");
        assert_eq!(source.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn samples_after_stop_do_not_change_route() {
        let (tracker, _events, source, _repository) = tracker(RecordingRepository::new());

        tracker.start("Ride").await.unwrap();
        source.push(Coordinate::new(1., 1.));
        let route = tracker.stop().await.unwrap();

        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(source.push(Coordinate::new(2., 2.)), 0);
        assert_eq!(tracker.points(), route.coordinates);
    }

    #[tokio::test]
    async fn failed_save_keeps_points() {
        let (tracker, mut events, source, _repository) = tracker(RecordingRepository::failing());

        tracker.start("Ride").await.unwrap();
        source.push(Coordinate::new(1., 1.));
        let route = tracker.stop().await.unwrap();

        match next_event(&mut events).await {
            TrackerEvent::SaveFailed { route: failed, cause } => {
                assert_eq!(failed, route);
                assert!(matches!(cause, RepositoryError::Network(_)));
            },
            other => panic!("unexpected event {other:?}"),
        }

        assert_eq!(tracker.status(), SessionStatus::Stopped { points: 1 });
        assert_eq!(tracker.points(), vec![Coordinate::new(1., 1.)]);
        tracker.with_summary(|summary| assert_eq!(summary.focus, Coordinate::new(1., 1.)));
    }

    #[tokio::test]
    async fn no_fix_stays_tracking_and_saves_empty_route() {
        let (tracker, mut events, _source, repository) = tracker(RecordingRepository::new());

        tracker.start("Indoors").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tracker.status(), SessionStatus::AwaitingFix);
        tracker.with_summary(|summary| {
            assert_eq!(summary.focus, Coordinate::ORIGIN);
            assert!(!summary.has_fix());
        });

        let route = tracker.stop().await.unwrap();
        assert!(route.is_empty());
        assert_eq!(next_event(&mut events).await, TrackerEvent::RouteSaved(route));
        assert_eq!(repository.saved()[0].coordinates, Vec::new());
    }

    #[tokio::test]
    async fn status_observers_see_first_fix() {
        let (tracker, _events, source, _repository) = tracker(RecordingRepository::new());
        let mut status = tracker.watch_status();

        tracker.start("Ride").await.unwrap();
        assert_eq!(*status.borrow_and_update(), SessionStatus::AwaitingFix);

        source.push(Coordinate::new(5., 6.));
        let seen = tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|status| matches!(status, SessionStatus::Recording { .. })),
        ).await.unwrap().unwrap().clone();

        assert_eq!(seen, SessionStatus::Recording { last: Coordinate::new(5., 6.), points: 1 });
    }

    #[tokio::test]
    async fn restart_after_stop_begins_fresh_session() {
        let (tracker, mut events, source, repository) = tracker(RecordingRepository::new());

        tracker.start("First").await.unwrap();
        source.push(Coordinate::new(1., 1.));
        tracker.stop().await.unwrap();
        next_event(&mut events).await;

        // A refused start keeps the stopped recording viewable.
        assert!(tracker.start(" ").await.is_err());
        assert_eq!(tracker.status(), SessionStatus::Stopped { points: 1 });

        tracker.start("Second").await.unwrap();
        assert!(tracker.points().is_empty());
        source.push(Coordinate::new(2., 2.));
        let route = tracker.stop().await.unwrap();
        next_event(&mut events).await;

        assert_eq!(route, Route::new("Second", vec![Coordinate::new(2., 2.)]));
        assert_eq!(repository.saved().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_delivery_keeps_every_sample() {
        let (tracker, _events, source, _repository) = tracker(RecordingRepository::new());
        tracker.start("Busy").await.unwrap();

        let threads: Vec<_> = (0..4)
            .map(|t| {
                let source = source.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        source.push(Coordinate::new(t as f64, i as f64 * 0.001));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let route = tracker.stop().await.unwrap();
        assert_eq!(route.len(), 1000);

        // Each thread's samples keep their relative order.
        for t in 0..4 {
            let mine: Vec<f64> = route.coordinates.iter()
                .filter(|c| c.latitude == t as f64)
                .map(|c| c.longitude)
                .collect();
            assert_eq!(mine.len(), 250);
            assert!(mine.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[tokio::test]
    async fn late_save_result_is_discarded() {
        let (tracker, events, source, repository) = tracker(RecordingRepository::new());

        tracker.start("Ride").await.unwrap();
        source.push(Coordinate::new(1., 1.));
        // The screen goes away before the save completes.
        drop(events);
        tracker.stop().await.unwrap();
        drop(tracker);

        tokio::time::timeout(Duration::from_secs(5), async {
            while repository.saved().is_empty() {
                tokio::task::yield_now().await;
            }
        }).await.unwrap();
    }

    #[tokio::test]
    async fn replay_reaching_end_of_file_is_saved_whole() {
        let points: Vec<Coordinate> = (0..5)
            .map(|i| Coordinate::new(56.15 + i as f64 * 0.001, 10.21))
            .collect();
        let request = LocationRequest::new(Duration::from_millis(1), 0.);
        let source = Arc::new(GpxReplaySource::from_points(points.clone(), request));
        let repository = Arc::new(RecordingRepository::new());
        let (tracker, mut events) = Tracker::new(source.clone(), repository.clone());

        tracker.start("Harbour loop").await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), source.wait_finished()).await.unwrap();

        // The finished replay drops its sink, which ends the pump before stop is called.
        tokio::time::timeout(Duration::from_secs(5), async {
            while !tracker.recording.lock().await.as_ref().unwrap().pump.is_finished() {
                tokio::task::yield_now().await;
            }
        }).await.unwrap();
        assert_eq!(tracker.status(), SessionStatus::Recording { last: points[4], points: 5 });

        let route = tracker.stop().await.unwrap();
        let expected = Route::new("Harbour loop", points);
        assert_eq!(route, expected);
        assert_eq!(next_event(&mut events).await, TrackerEvent::RouteSaved(expected.clone()));
        assert_eq!(repository.saved(), vec![expected]);
    }

    #[tokio::test]
    async fn dropping_tracker_unsubscribes() {
        let (tracker, _events, source, _repository) = tracker(RecordingRepository::new());

        tracker.start("Ride").await.unwrap();
        assert_eq!(source.subscriber_count(), 1);
        drop(tracker);
        assert_eq!(source.subscriber_count(), 0);
    }
}
