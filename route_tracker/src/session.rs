use std::fmt;

use route_tracker_lib::{Coordinate, Route, RouteSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Tracking,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Tracking => write!(f, "tracking"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// What a tracking screen should show. Derived from a session, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionStatus {
    Idle,
    /// Tracking, but no fix has arrived yet.
    AwaitingFix,
    Recording {
        last: Coordinate,
        points: usize,
    },
    Stopped {
        points: usize,
    },
}

impl SessionStatus {
    pub fn is_tracking(&self) -> bool {
        matches!(self, SessionStatus::AwaitingFix | SessionStatus::Recording { .. })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Enter a name for the route")]
    BlankName,
    #[error("Cannot {operation} a session that is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },
}

/// One recording, from the moment a name is accepted until it is stopped.
///
/// Points only grow while tracking. Once stopped the session is spent; the next
/// recording needs a new session.
#[derive(Debug)]
pub struct TrackingSession {
    name: String,
    state: SessionState,
    points: Vec<Coordinate>,
    last_sample: Option<Coordinate>,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingSession {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            state: SessionState::Idle,
            points: Vec::new(),
            last_sample: None,
        }
    }

    pub fn start(&mut self, name: &str) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(self.invalid("start"));
        }
        if name.trim().is_empty() {
            return Err(SessionError::BlankName);
        }

        self.name = name.to_string();
        self.points.clear();
        self.last_sample = None;
        self.state = SessionState::Tracking;
        Ok(())
    }

    pub fn on_sample(&mut self, coordinate: Coordinate) -> Result<(), SessionError> {
        if self.state != SessionState::Tracking {
            return Err(self.invalid("record a sample in"));
        }

        self.points.push(coordinate);
        self.last_sample = Some(coordinate);
        Ok(())
    }

    /// Freezes the recording. The returned route is the only one this session ever produces.
    pub fn stop(&mut self) -> Result<Route, SessionError> {
        if self.state != SessionState::Tracking {
            return Err(self.invalid("stop"));
        }

        self.state = SessionState::Stopped;
        Ok(Route::new(self.name.clone(), self.points.clone()))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn last_sample(&self) -> Option<Coordinate> {
        self.last_sample
    }

    pub fn status(&self) -> SessionStatus {
        match (self.state, self.last_sample) {
            (SessionState::Idle, _) => SessionStatus::Idle,
            (SessionState::Tracking, None) => SessionStatus::AwaitingFix,
            (SessionState::Tracking, Some(last)) => SessionStatus::Recording {
                last,
                points: self.points.len(),
            },
            (SessionState::Stopped, _) => SessionStatus::Stopped {
                points: self.points.len(),
            },
        }
    }

    pub fn summary(&self) -> RouteSummary<'_> {
        RouteSummary::of_points(&self.points)
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            operation,
            state: self.state,
        }
    }
}
