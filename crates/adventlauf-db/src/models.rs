//! Database row types: these map directly to SQLite rows.
//! Distinct from adventlauf-types models to keep the DB layer independent;
//! ids stay TEXT here and are parsed on conversion.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use adventlauf_types::models::{Contribution, Door, Team, User};

pub struct TeamRow {
    pub id: String,
    pub name: String,
    pub pin_hash: Option<String>,
    pub created_at: String,
}

pub struct UserRow {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub color: String,
}

pub struct DoorRow {
    pub id: String,
    pub team_id: String,
    pub number: u32,
}

pub struct ContributionRow {
    pub id: String,
    pub door_id: String,
    pub user_id: String,
    pub km: f64,
    pub created_at: String,
}

/// Sum of one user's runs on one door.
#[derive(Debug, Clone, PartialEq)]
pub struct DoorUserTotal {
    pub door_id: String,
    pub user_id: String,
    pub km: f64,
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("Corrupt id '{}'", raw))
}

/// SQLite's `datetime('now')` has no timezone; rows written from Rust are RFC 3339.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}

impl TeamRow {
    pub fn to_model(&self) -> Result<Team> {
        Ok(Team {
            id: parse_id(&self.id)?,
            name: self.name.clone(),
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl UserRow {
    pub fn to_model(&self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            team_id: parse_id(&self.team_id)?,
            name: self.name.clone(),
            color: self.color.clone(),
        })
    }
}

impl DoorRow {
    pub fn to_model(&self) -> Result<Door> {
        Ok(Door {
            id: parse_id(&self.id)?,
            team_id: parse_id(&self.team_id)?,
            number: self.number,
        })
    }
}

impl ContributionRow {
    pub fn to_model(&self) -> Result<Contribution> {
        Ok(Contribution {
            id: parse_id(&self.id)?,
            door_id: parse_id(&self.door_id)?,
            user_id: parse_id(&self.user_id)?,
            km: self.km,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
