use std::{fs::OpenOptions, net::SocketAddr, path::Path, sync::Arc};

use server::{database::db::RouteDatabase, server_state::ServerState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ADDR_ENV: &str = "ROUTE_SERVER_ADDR";
const DB_ENV: &str = "ROUTE_SERVER_DB";
const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_PATH: &str = "data/routes.db";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::fs::create_dir_all("log")?;
    let log_file = "log/server.log";

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    tracing::info!("Starting server...");

    let db_path = std::env::var(DB_ENV).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    if let Some(dir) = Path::new(&db_path).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let database = RouteDatabase::connect(&db_path).await?;
    tracing::debug!("Using database {}", db_path);

    let state = Arc::new(ServerState { database });

    let addr: SocketAddr = std::env::var(ADDR_ENV)
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    server::serve(listener, state).await?;

    Ok(())
}
