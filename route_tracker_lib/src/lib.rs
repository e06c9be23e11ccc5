pub mod coordinate;
pub mod route;
pub mod summary;

pub use coordinate::Coordinate;
pub use route::Route;
pub use summary::RouteSummary;

/// Path of the route collection on the remote API.
pub const ROUTES_PATH: &str = "/api/routes";
