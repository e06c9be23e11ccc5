use crate::database::db::RouteDatabase;

pub struct ServerState {
    pub database: RouteDatabase,
}
