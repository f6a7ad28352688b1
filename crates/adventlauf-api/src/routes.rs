use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::middleware::{require_session, require_write};
use crate::state::AppState;
use crate::{auth, dashboard, doors, runs, users};

/// All routes. Everything except login, logout and health needs a session.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/team", get(auth::session_info).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/health", get(health));

    let write_routes = Router::new()
        .route("/add_user", post(users::add_user))
        .route("/lauf_eintragen", post(runs::log_run))
        .route("/tuer_zuruecksetzen/{door_id}", post(doors::reset_door))
        .route_layer(middleware::from_fn(require_write));

    let protected_routes = Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/lauf_erfassen_formular/{door_id}", get(runs::run_form))
        .merge(write_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
