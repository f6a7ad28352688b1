pub mod auth;
pub mod dashboard;
pub mod doors;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod runs;
pub mod state;
pub mod users;
