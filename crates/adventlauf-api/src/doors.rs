use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::info;
use uuid::Uuid;

use adventlauf_db::models::DoorRow;
use adventlauf_types::api::ResetDoorResponse;

use crate::error::ApiError;
use crate::middleware::TeamContext;
use crate::state::{AppState, with_db};

/// Parse an entity id from a path or form. A malformed id cannot name
/// anything that exists, so it reads as not found.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::NotFound)
}

/// Load a door and make sure it belongs to the session's team.
pub(crate) async fn own_door(
    state: &AppState,
    ctx: &TeamContext,
    door_id: Uuid,
) -> Result<DoorRow, ApiError> {
    let id = door_id.to_string();
    let door = with_db(state, move |db| db.get_door(&id))
        .await?
        .ok_or(ApiError::NotFound)?;
    ctx.require_own(&door.team_id)?;
    Ok(door)
}

/// `POST /tuer_zuruecksetzen/{door_id}`: delete every run of one door.
pub async fn reset_door(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(door_id): Path<String>,
) -> Result<Json<ResetDoorResponse>, ApiError> {
    let door_id = parse_id(&door_id)?;
    let door = own_door(&state, &ctx, door_id).await?;

    let id = door.id.clone();
    let removed = with_db(&state, move |db| db.reset_door(&id)).await?;

    info!(team = %ctx.team_name, door = door.number, removed, "door reset");

    Ok(Json(ResetDoorResponse {
        message: format!("Alle Läufe für Türchen {} wurden zurückgesetzt.", door.number),
        door_id,
        removed,
    }))
}
