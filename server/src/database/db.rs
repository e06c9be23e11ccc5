use std::{path::Path, str::FromStr};

use const_format::concatcp;
use route_tracker_lib::{Coordinate, Route};
use sqlx::{query, query_as, sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};

use super::constants::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Stored coordinates could not be read: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Route storage. Coordinates are kept as a JSON array per row.
#[derive(Clone)]
pub struct RouteDatabase {
    pool: Pool<Sqlite>,
}

impl RouteDatabase {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::init(pool).await
    }

    /// A private database that lives as long as the returned handle.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every in-memory connection is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options).await?;

        Self::init(pool).await
    }

    async fn init(pool: Pool<Sqlite>) -> Result<Self, StoreError> {
        query(concatcp!("
            CREATE TABLE IF NOT EXISTS ", ROUTES_TABLE_NAME, "(",
                ROUTE_ID,    " INTEGER PRIMARY KEY AUTOINCREMENT,",
                NAME,        " TEXT NOT NULL,",
                COORDINATES, " TEXT NOT NULL)"))
            .execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn insert_route(&self, name: &str, coordinates: &[Coordinate]) -> Result<Route, StoreError> {
        let encoded = serde_json::to_string(coordinates)?;

        let id = query_as::<_, (i64,)>(concatcp!("
            INSERT INTO ", ROUTES_TABLE_NAME, "(", NAME, ", ", COORDINATES, ")
            VALUES (?1, ?2) RETURNING ", ROUTE_ID))
                .bind(name)
                .bind(encoded)
                .fetch_one(&self.pool).await?
                .0;

        tracing::debug!("Inserted route {} ({:?}, {} points)", id, name, coordinates.len());
        Ok(Route::new(name, coordinates.to_vec()))
    }

    /// All routes, oldest first.
    pub async fn get_routes(&self) -> Result<Vec<Route>, StoreError> {
        let rows = query_as::<_, (String, String)>(concatcp!(
            "SELECT ", NAME, ", ", COORDINATES, " FROM ", ROUTES_TABLE_NAME, " ORDER BY ", ROUTE_ID))
            .fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|(name, coordinates)| -> Result<Route, StoreError> {
                Ok(Route::new(name, serde_json::from_str(&coordinates)?))
            })
            .collect()
    }
}
