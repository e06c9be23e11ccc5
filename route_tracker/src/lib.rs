pub mod browser;
pub mod config;
pub mod location;
pub mod repository;
pub mod session;
mod tracker;

#[cfg(test)]
mod test_support;

pub use browser::SavedRoutes;
pub use config::TrackerConfig;
pub use repository::{HttpRouteRepository, RepositoryError, RouteRepository};
pub use session::{SessionError, SessionState, SessionStatus, TrackingSession};
pub use tracker::*;

pub use route_tracker_lib::{Coordinate, Route, RouteSummary};
