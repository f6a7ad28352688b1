use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of doors every team gets. Door `n` has a target of `n` km.
pub const DOOR_COUNT: u32 = 24;

/// Maximum number of members per team.
pub const MAX_TEAM_SIZE: usize = 3;

/// Longest team or member name, in characters.
pub const MAX_NAME_LEN: usize = 50;

/// Member colors, indexed by creation order within the team.
pub const PALETTE: [&str; MAX_TEAM_SIZE] = [
    "#007bff", // blue
    "#28a745", // green
    "#ff9800", // orange
];

/// Color for the member at `ordinal` (0-based creation order).
/// `None` once the team is full.
pub fn color_for_slot(ordinal: usize) -> Option<&'static str> {
    PALETTE.get(ordinal).copied()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Door {
    pub id: Uuid,
    pub team_id: Uuid,
    pub number: u32,
}

impl Door {
    /// A door's target distance equals its number.
    pub fn target_km(&self) -> f64 {
        f64::from(self.number)
    }
}

/// One logged run ("Lauf") against a door.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub id: Uuid,
    pub door_id: Uuid,
    pub user_id: Uuid,
    pub km: f64,
    pub created_at: DateTime<Utc>,
}
