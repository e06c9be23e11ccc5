use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use route_tracker_lib::{Coordinate, Route, ROUTES_PATH};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
    },
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RepositoryError::Decode(err.to_string())
        } else {
            RepositoryError::Network(err.to_string())
        }
    }
}

/// The remote store for finished routes. Shared between sessions, holds no session state.
#[async_trait]
pub trait RouteRepository: Send + Sync {
    /// Stores a route. Each call creates a new record, nothing is deduplicated.
    async fn save(&self, name: &str, coordinates: &[Coordinate]) -> Result<Route, RepositoryError>;

    /// Every stored route, in the order the store returns them.
    async fn list_all(&self) -> Result<Vec<Route>, RepositoryError>;
}

/// [`RouteRepository`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRouteRepository {
    client: Client,
    routes_url: String,
}

impl HttpRouteRepository {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RepositoryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                RepositoryError::Network(format!("Failed to build HTTP client: {err}"))
            })?;

        Ok(Self {
            client,
            routes_url: format!("{}{}", base_url.trim_end_matches('/'), ROUTES_PATH),
        })
    }

    pub fn routes_url(&self) -> &str {
        &self.routes_url
    }
}

#[async_trait]
impl RouteRepository for HttpRouteRepository {
    async fn save(&self, name: &str, coordinates: &[Coordinate]) -> Result<Route, RepositoryError> {
        tracing::debug!("Saving route {:?} with {} points", name, coordinates.len());

        let response = self.client.post(&self.routes_url)
            .query(&[("name", name)])
            .json(coordinates)
            .send().await?;

        let route = check_status(response).await?.json::<Route>().await?;
        tracing::info!("Saved route {:?}", route.name);
        Ok(route)
    }

    async fn list_all(&self) -> Result<Vec<Route>, RepositoryError> {
        let response = self.client.get(&self.routes_url).send().await?;
        let routes = check_status(response).await?.json::<Vec<Route>>().await?;
        tracing::debug!("Fetched {} routes", routes.len());
        Ok(routes)
    }
}

async fn check_status(response: Response) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await
        .ok()
        .filter(|body| !body.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("no reason given").to_string());

    tracing::warn!("Route request rejected with {}: {}", status, message);
    Err(RepositoryError::Rejected {
        status: status.as_u16(),
        message,
    })
}
