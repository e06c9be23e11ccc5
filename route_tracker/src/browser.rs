use std::sync::Arc;

use route_tracker_lib::{Route, RouteSummary};

use crate::repository::{RepositoryError, RouteRepository};

/// Model behind the saved-routes screen: the fetched list and which route is open.
pub struct SavedRoutes<R: RouteRepository> {
    repository: Arc<R>,
    routes: Vec<Route>,
    selected: Option<usize>,
}

impl<R: RouteRepository> SavedRoutes<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            routes: Vec::new(),
            selected: None,
        }
    }

    /// Replaces the list with the store's current contents. On failure the list is left
    /// empty rather than stale.
    pub async fn refresh(&mut self) -> Result<&[Route], RepositoryError> {
        self.selected = None;

        let result = self.repository.list_all().await;
        match result {
            Ok(routes) => {
                tracing::debug!("Loaded {} saved routes", routes.len());
                self.routes = routes;
                Ok(&self.routes)
            },
            Err(err) => {
                tracing::error!("Failed to load saved routes: {}", err);
                self.routes.clear();
                Err(err)
            },
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Opens a route for display. Out of range indices close the current one.
    pub fn select(&mut self, index: usize) -> Option<RouteSummary<'_>> {
        self.selected = (index < self.routes.len()).then_some(index);
        self.selected().map(|(_, summary)| summary)
    }

    pub fn selected(&self) -> Option<(&Route, RouteSummary<'_>)> {
        let route = self.routes.get(self.selected?)?;
        Some((route, RouteSummary::of_route(route)))
    }

    pub fn dismiss(&mut self) {
        self.selected = None;
    }
}
