use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Contribution, Team, User};

// -- Session --

/// What a login form submission asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamAction {
    /// Create the team or log in with its PIN (write access).
    Join,
    /// Read-only access, no PIN needed.
    View,
}

impl TeamAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "join" => Some(Self::Join),
            "view" => Some(Self::View),
            _ => None,
        }
    }
}

/// Form fields are kept as raw strings so missing or malformed input can be
/// reported with a readable message instead of a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct TeamLoginForm {
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub pin_code: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub team: Option<Team>,
    pub can_write: bool,
}

/// Session token claims stored in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub team_id: Uuid,
    pub can_write: bool,
    pub exp: usize,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
pub struct AddUserForm {
    #[serde(default)]
    pub neuer_nutzer_name: String,
}

#[derive(Debug, Serialize)]
pub struct AddUserResponse {
    pub message: String,
    pub user: User,
}

// -- Dashboard --

/// One user's share of a door.
#[derive(Debug, Clone, Serialize)]
pub struct UserShare {
    pub user_id: Uuid,
    pub user_name: String,
    pub km: f64,
    pub percent: f64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoorProgress {
    pub id: Uuid,
    pub number: u32,
    pub target_km: f64,
    pub reached_km: f64,
    pub done: bool,
    pub shares: Vec<UserShare>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub team_name: String,
    pub can_write: bool,
    pub doors: Vec<DoorProgress>,
    pub total_target_km: f64,
    pub total_reached_km: f64,
    pub users: Vec<User>,
}

// -- Runs --

#[derive(Debug, Serialize)]
pub struct RunFormResponse {
    pub door_id: Uuid,
    pub number: u32,
    pub target_km: f64,
    pub reached_km: f64,
    pub remaining_km: f64,
    pub users: Vec<User>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogRunForm {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tuer_id: Option<String>,
    #[serde(default)]
    pub kilometer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogRunResponse {
    pub message: String,
    pub contribution: Contribution,
}

// -- Doors --

#[derive(Debug, Serialize)]
pub struct ResetDoorResponse {
    pub message: String,
    pub door_id: Uuid,
    pub removed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
