use async_trait::async_trait;
use parking_lot::Mutex;
use route_tracker_lib::{Coordinate, Route};

use crate::repository::{RepositoryError, RouteRepository};

/// In-memory repository that remembers every save and can be told to fail.
#[derive(Default)]
pub struct RecordingRepository {
    saved: Mutex<Vec<Route>>,
    stored: Vec<Route>,
    fail: bool,
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_routes(stored: Vec<Route>) -> Self {
        Self {
            stored,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<Route> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl RouteRepository for RecordingRepository {
    async fn save(&self, name: &str, coordinates: &[Coordinate]) -> Result<Route, RepositoryError> {
        if self.fail {
            return Err(RepositoryError::Network("connection refused".into()));
        }

        let route = Route::new(name, coordinates.to_vec());
        self.saved.lock().push(route.clone());
        Ok(route)
    }

    async fn list_all(&self) -> Result<Vec<Route>, RepositoryError> {
        if self.fail {
            return Err(RepositoryError::Rejected {
                status: 500,
                message: "Internal Server Error".into(),
            });
        }

        Ok(self.stored.clone())
    }
}
