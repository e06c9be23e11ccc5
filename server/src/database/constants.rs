pub const ROUTES_TABLE_NAME: &str = "Routes";
pub const ROUTE_ID: &str = "route_id";
pub const NAME: &str = "name";
pub const COORDINATES: &str = "coordinates";
