use std::collections::HashMap;

use axum::{Extension, Json, extract::State};
use uuid::Uuid;

use adventlauf_types::api::{DashboardResponse, DoorProgress, UserShare};
use adventlauf_types::models::{Door, User};

use crate::error::ApiError;
use crate::middleware::TeamContext;
use crate::state::{AppState, with_db};

/// Kilometers per (door, user), as summed by the database.
pub type DoorUserKm = HashMap<(Uuid, Uuid), f64>;

/// Per-door progress for the dashboard. Doors come out in the order given
/// (the store returns them by number); shares follow user order.
pub fn door_progress(doors: &[Door], users: &[User], totals: &DoorUserKm) -> Vec<DoorProgress> {
    let mut reached_by_door: HashMap<Uuid, f64> = HashMap::new();
    for ((door_id, _), km) in totals {
        *reached_by_door.entry(*door_id).or_default() += km;
    }

    doors
        .iter()
        .map(|door| {
            let target_km = door.target_km();
            let reached_km = reached_by_door.get(&door.id).copied().unwrap_or(0.0);

            let shares = if reached_km > 0.0 {
                users
                    .iter()
                    .filter_map(|user| {
                        let km = totals.get(&(door.id, user.id)).copied().unwrap_or(0.0);
                        (km > 0.0).then(|| UserShare {
                            user_id: user.id,
                            user_name: user.name.clone(),
                            km,
                            percent: km / reached_km * 100.0,
                            color: user.color.clone(),
                        })
                    })
                    .collect()
            } else {
                Vec::new()
            };

            DoorProgress {
                id: door.id,
                number: door.number,
                target_km,
                reached_km,
                done: reached_km >= target_km,
                shares,
            }
        })
        .collect()
}

/// `GET /`: the team dashboard. Recomputed on every request.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let team_id = ctx.team_id.to_string();

    let (doors, users, totals, total_reached_km) = with_db(&state, move |db| {
        let doors = db
            .list_doors(&team_id)?
            .iter()
            .map(|row| row.to_model())
            .collect::<anyhow::Result<Vec<_>>>()?;
        let users = db
            .list_users(&team_id)?
            .iter()
            .map(|row| row.to_model())
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut totals = DoorUserKm::new();
        for row in db.door_user_totals(&team_id)? {
            totals.insert((row.door_id.parse::<Uuid>()?, row.user_id.parse::<Uuid>()?), row.km);
        }
        let total_reached_km = db.team_reached_km(&team_id)?;

        Ok((doors, users, totals, total_reached_km))
    })
    .await?;

    let doors_progress = door_progress(&doors, &users, &totals);
    let total_target_km: f64 = doors.iter().map(Door::target_km).sum();

    Ok(Json(DashboardResponse {
        team_name: ctx.team_name,
        can_write: ctx.can_write,
        doors: doors_progress,
        total_target_km,
        total_reached_km,
        users,
    }))
}
