use std::sync::Arc;

use tokio::net::TcpListener;

pub mod database;
pub mod routes_endpoint;
pub mod server_state;

use server_state::ServerState;

/// Serves the route API on `listener` until the process ends.
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) -> std::io::Result<()> {
    axum::serve(listener, routes_endpoint::router(state)).await
}
