use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{info, warn};
use uuid::Uuid;

use adventlauf_types::api::{SessionClaims, SessionInfo, TeamAction, TeamLoginForm};
use adventlauf_types::models::MAX_NAME_LEN;

use crate::error::ApiError;
use crate::middleware::{clear_session_cookie, read_session, session_cookie};
use crate::state::{AppState, with_db};

/// `GET /team`: who is logged in, if anyone.
pub async fn session_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionInfo>, ApiError> {
    let Some(claims) = read_session(&headers, &state.session_secret) else {
        return Ok(Json(SessionInfo {
            team: None,
            can_write: false,
        }));
    };

    let team_id = claims.team_id.to_string();
    let team = with_db(&state, move |db| {
        db.get_team_by_id(&team_id)?.map(|row| row.to_model()).transpose()
    })
    .await?;

    // A stale session reads as logged out here; protected routes clear it.
    let can_write = team.is_some() && claims.can_write;
    Ok(Json(SessionInfo { team, can_write }))
}

/// `POST /team`: join (create or PIN login) or view a team.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<TeamLoginForm>,
) -> Result<Response, ApiError> {
    let team_name = form.team_name.trim().to_string();
    if team_name.is_empty() {
        return Err(ApiError::validation("Bitte einen Teamnamen angeben."));
    }
    if team_name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(format!(
            "Teamname ist zu lang (maximal {} Zeichen).",
            MAX_NAME_LEN
        )));
    }
    let action = TeamAction::parse(&form.action)
        .ok_or_else(|| ApiError::validation("Ungültige Aktion."))?;
    let pin = form.pin_code.trim().to_string();

    let lookup_name = team_name.clone();
    let existing = with_db(&state, move |db| db.get_team_by_name(&lookup_name)).await?;

    let (team_id, can_write) = match (existing, action) {
        (None, TeamAction::Join) => {
            if !is_valid_pin(&pin) {
                return Err(ApiError::validation("Die PIN muss aus genau 4 Ziffern bestehen."));
            }
            let pin_hash = hash_pin(&pin)?;
            let team_id = Uuid::new_v4();
            let (id, name) = (team_id.to_string(), team_name.clone());
            let created = with_db(&state, move |db| db.create_team(&id, &name, &pin_hash)).await?;
            if created.is_none() {
                return Err(ApiError::validation(format!(
                    "Team {} existiert bereits.",
                    team_name
                )));
            }
            info!(team = %team_name, "team created");
            (team_id, true)
        }
        (None, TeamAction::View) => {
            return Err(ApiError::validation(format!(
                "Team {} existiert nicht.",
                team_name
            )));
        }
        (Some(team), TeamAction::Join) => {
            let Some(pin_hash) = team.pin_hash.as_deref() else {
                warn!(team = %team.name, "join attempt on team without PIN");
                return Err(ApiError::validation(
                    "Für dieses Team ist kein Schreibzugriff eingerichtet.",
                ));
            };
            if !verify_pin(&pin, pin_hash)? {
                warn!(team = %team.name, "wrong PIN");
                return Err(ApiError::validation("Falsche PIN."));
            }
            info!(team = %team.name, "joined with write access");
            (parse_team_id(&team.id)?, true)
        }
        (Some(team), TeamAction::View) => {
            info!(team = %team.name, "viewing read-only");
            (parse_team_id(&team.id)?, false)
        }
    };

    let token = create_token(&state.session_secret, team_id, can_write, state.session_ttl_days)?;
    let ttl_days = state.session_ttl_days;
    let max_age = ttl_days
        .checked_mul(24 * 60 * 60)
        .ok_or_else(|| anyhow::anyhow!("session lifetime of {} days overflows", ttl_days))?;
    let cookie = session_cookie(&token, max_age);

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

/// `GET /logout`
pub async fn logout() -> impl IntoResponse {
    ([(header::SET_COOKIE, clear_session_cookie())], Redirect::to("/team"))
}

fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

fn hash_pin(pin: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("PIN hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_pin(pin: &str, stored: &str) -> Result<bool, ApiError> {
    let parsed_hash =
        PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("Corrupt PIN hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(pin.as_bytes(), &parsed_hash)
        .is_ok())
}

fn parse_team_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt team id '{}': {}", raw, e)))
}

fn create_token(
    secret: &str,
    team_id: Uuid,
    can_write: bool,
    ttl_days: i64,
) -> anyhow::Result<String> {
    let expires_at = chrono::Duration::try_days(ttl_days)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| anyhow::anyhow!("session lifetime of {} days is out of range", ttl_days))?;
    let claims = SessionClaims {
        team_id,
        can_write,
        exp: usize::try_from(expires_at.timestamp())?,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
