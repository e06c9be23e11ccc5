use std::{sync::Arc, time::Duration};

use route_tracker::HttpRouteRepository;
use server::{database::db::RouteDatabase, server_state::ServerState};

/// Starts the route server on a free local port with an empty in-memory database.
pub async fn spawn_server() -> String {
    let database = RouteDatabase::connect_in_memory().await.unwrap();
    let state = Arc::new(ServerState { database });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(server::serve(listener, state));

    format!("http://{addr}")
}

pub fn repository(base_url: &str) -> Arc<HttpRouteRepository> {
    Arc::new(HttpRouteRepository::new(base_url, Duration::from_secs(5)).unwrap())
}
