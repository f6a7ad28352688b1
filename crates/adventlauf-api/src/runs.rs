use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use adventlauf_db::LogRunOutcome;
use adventlauf_types::api::{LogRunForm, LogRunResponse, RunFormResponse};

use crate::doors::{own_door, parse_id};
use crate::error::ApiError;
use crate::middleware::TeamContext;
use crate::state::{AppState, with_db};

const INVALID_KM: &str = "Ungültige Kilometer-Angabe.";
const ENTRY_FAILED: &str = "Fehler beim Eintragen des Laufs.";

/// `GET /lauf_erfassen_formular/{door_id}`: what the entry form needs.
pub async fn run_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(door_id): Path<String>,
) -> Result<Json<RunFormResponse>, ApiError> {
    let door_id = parse_id(&door_id)?;
    let door = own_door(&state, &ctx, door_id).await?;

    let (id, team_id) = (door.id.clone(), ctx.team_id.to_string());
    let (reached_km, users) = with_db(&state, move |db| {
        let reached = db.door_reached_km(&id)?;
        let users = db
            .list_users(&team_id)?
            .iter()
            .map(|row| row.to_model())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok((reached, users))
    })
    .await?;

    let target_km = f64::from(door.number);
    let remaining_km = (target_km - reached_km).max(0.0);
    if remaining_km <= 0.0 {
        return Err(ApiError::validation(format!(
            "Türchen {} ist bereits voll gelaufen!",
            door.number
        )));
    }

    Ok(Json(RunFormResponse {
        door_id,
        number: door.number,
        target_km,
        reached_km,
        remaining_km,
        users,
    }))
}

/// Parse a distance the way a form sends it. Only finite, positive numbers pass.
fn parse_km(raw: Option<&str>) -> Result<f64, ApiError> {
    let km: f64 = raw
        .map(str::trim)
        .and_then(|s| s.parse().ok())
        .filter(|km: &f64| km.is_finite())
        .ok_or_else(|| ApiError::validation(INVALID_KM))?;
    if km <= 0.0 {
        return Err(ApiError::validation(ENTRY_FAILED));
    }
    Ok(km)
}

fn required_id(raw: Option<&str>) -> Result<Uuid, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation(ENTRY_FAILED))?;
    parse_id(raw)
}

/// `POST /lauf_eintragen`: log a run, capped at the door's target.
pub async fn log_run(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Form(form): Form<LogRunForm>,
) -> Result<impl IntoResponse, ApiError> {
    let km = parse_km(form.kilometer.as_deref())?;
    let user_id = required_id(form.user_id.as_deref())?;
    let door_id = required_id(form.tuer_id.as_deref())?;

    let door = own_door(&state, &ctx, door_id).await?;

    let uid = user_id.to_string();
    let user = with_db(&state, move |db| db.get_user(&uid))
        .await?
        .ok_or(ApiError::NotFound)?;
    ctx.require_own(&user.team_id)?;

    let run_id = Uuid::new_v4().to_string();
    let (did, uid) = (door.id.clone(), user.id.clone());
    let outcome =
        with_db(&state, move |db| db.log_contribution(&run_id, &did, &uid, km)).await?;

    match outcome {
        LogRunOutcome::ExceedsTarget { remaining_km } => {
            warn!(
                team = %ctx.team_name,
                door = door.number,
                km,
                remaining_km,
                "run exceeds door target"
            );
            Err(ApiError::validation(format!(
                "Fehler: Es können nur noch maximal {:.1} km eingetragen werden.",
                remaining_km
            )))
        }
        LogRunOutcome::Logged(row) => {
            info!(team = %ctx.team_name, user = %user.name, door = door.number, km, "run logged");
            Ok((
                StatusCode::CREATED,
                Json(LogRunResponse {
                    message: "Lauf erfolgreich eingetragen!".into(),
                    contribution: row.to_model()?,
                }),
            ))
        }
    }
}
