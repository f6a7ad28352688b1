use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Cookie, HeaderMapExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, info};
use uuid::Uuid;

use adventlauf_types::api::SessionClaims;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

pub const SESSION_COOKIE: &str = "adventlauf_session";

/// The resolved session: which team the request acts for and whether it may
/// change anything. Produced once by [`require_session`] and handed to the
/// handlers as a request extension.
#[derive(Debug, Clone)]
pub struct TeamContext {
    pub team_id: Uuid,
    pub team_name: String,
    pub can_write: bool,
}

impl TeamContext {
    pub fn require_write(&self) -> Result<(), ApiError> {
        if self.can_write {
            Ok(())
        } else {
            debug!(team = %self.team_name, "write attempt from read-only session");
            Err(ApiError::Forbidden)
        }
    }

    /// Rejects ids that belong to another team.
    pub fn require_own(&self, team_id: &str) -> Result<(), ApiError> {
        if self.team_id.to_string() == team_id {
            Ok(())
        } else {
            debug!(team = %self.team_name, other = team_id, "cross-team access rejected");
            Err(ApiError::Forbidden)
        }
    }
}

pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

pub fn clear_session_cookie() -> String {
    session_cookie("", 0)
}

/// Decode the session cookie, if there is a valid one.
pub fn read_session(headers: &HeaderMap, secret: &str) -> Option<SessionClaims> {
    let cookie = headers.typed_get::<Cookie>()?;
    let token = cookie.get(SESSION_COOKIE).filter(|t| !t.is_empty())?;

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| debug!("Rejected session token: {}", e))
    .ok()
    .map(|data| data.claims)
}

/// Resolve the session cookie to a [`TeamContext`]. Requests without a
/// session go to the login page; sessions of deleted teams are cleared.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims =
        read_session(req.headers(), &state.session_secret).ok_or(ApiError::LoginRequired)?;

    let team_id = claims.team_id.to_string();
    let team = with_db(&state, move |db| db.get_team_by_id(&team_id)).await?;
    let Some(team) = team else {
        info!(team_id = %claims.team_id, "session refers to a deleted team, clearing it");
        return Err(ApiError::StaleSession);
    };

    req.extensions_mut().insert(TeamContext {
        team_id: claims.team_id,
        team_name: team.name,
        can_write: claims.can_write,
    });
    Ok(next.run(req).await)
}

/// Gate for mutating routes. Runs after [`require_session`] and before any
/// body extraction, so a read-only session is refused whatever it sends.
pub async fn require_write(req: Request, next: Next) -> Result<Response, ApiError> {
    req.extensions()
        .get::<TeamContext>()
        .ok_or(ApiError::LoginRequired)?
        .require_write()?;
    Ok(next.run(req).await)
}
