use axum::{Extension, Form, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use adventlauf_db::AddUserOutcome;
use adventlauf_types::api::{AddUserForm, AddUserResponse};
use adventlauf_types::models::MAX_NAME_LEN;

use crate::error::ApiError;
use crate::middleware::TeamContext;
use crate::state::{AppState, with_db};

/// `POST /add_user`: add a member; the color follows creation order.
pub async fn add_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Form(form): Form<AddUserForm>,
) -> Result<impl IntoResponse, ApiError> {
    let name = form.neuer_nutzer_name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("Bitte einen Namen angeben."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(format!(
            "Name ist zu lang (maximal {} Zeichen).",
            MAX_NAME_LEN
        )));
    }

    let user_id = Uuid::new_v4().to_string();
    let team_id = ctx.team_id.to_string();
    let new_name = name.clone();
    let outcome = with_db(&state, move |db| db.add_user(&user_id, &team_id, &new_name)).await?;

    let row = match outcome {
        AddUserOutcome::Added(row) => row,
        AddUserOutcome::NameTaken => return Err(ApiError::validation("Name existiert bereits.")),
        AddUserOutcome::TeamFull => {
            return Err(ApiError::validation("Maximale Teamgröße (3 Personen) erreicht."));
        }
    };

    info!(team = %ctx.team_name, user = %row.name, color = %row.color, "user added");

    Ok((
        StatusCode::CREATED,
        Json(AddUserResponse {
            message: format!("Nutzer {} hinzugefügt.", name),
            user: row.to_model()?,
        }),
    ))
}
