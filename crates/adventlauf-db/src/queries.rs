use crate::models::{ContributionRow, DoorRow, DoorUserTotal, TeamRow, UserRow};
use crate::Database;
use adventlauf_types::models::{DOOR_COUNT, MAX_TEAM_SIZE, color_for_slot};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

/// Result of trying to add a user to a team.
pub enum AddUserOutcome {
    Added(UserRow),
    NameTaken,
    TeamFull,
}

/// Result of trying to log a run against a door.
pub enum LogRunOutcome {
    Logged(ContributionRow),
    /// The run would push the door past its target. Carries what is still open.
    ExceedsTarget { remaining_km: f64 },
}

impl Database {
    // -- Teams --

    /// Create a team together with its 24 doors in one transaction.
    /// Returns `None` when the name is already taken.
    pub fn create_team(&self, id: &str, name: &str, pin_hash: &str) -> Result<Option<TeamRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO teams (id, name, pin_hash) VALUES (?1, ?2, ?3)",
                (id, name, pin_hash),
            )?;
            if inserted == 0 {
                return Ok(None);
            }

            {
                let mut stmt =
                    tx.prepare("INSERT INTO doors (id, team_id, number) VALUES (?1, ?2, ?3)")?;
                for number in 1..=DOOR_COUNT {
                    stmt.execute((Uuid::new_v4().to_string(), id, number))?;
                }
            }

            let team = query_team(&tx, "id", id)?
                .ok_or_else(|| anyhow!("Team vanished after insert: {}", id))?;
            tx.commit()?;
            Ok(Some(team))
        })
    }

    pub fn get_team_by_name(&self, name: &str) -> Result<Option<TeamRow>> {
        self.with_conn(|conn| query_team(conn, "name", name))
    }

    pub fn get_team_by_id(&self, id: &str) -> Result<Option<TeamRow>> {
        self.with_conn(|conn| query_team(conn, "id", id))
    }

    /// Remove a team with everything it owns. Not reachable over HTTP;
    /// sessions of a deleted team are invalidated on their next request.
    pub fn delete_team(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM teams WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    // -- Users --

    /// Add a user, assigning the palette color of its creation slot.
    pub fn add_user(&self, id: &str, team_id: &str, name: &str) -> Result<AddUserOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE team_id = ?1 AND name = ?2)",
                (team_id, name),
                |row| row.get(0),
            )?;
            if taken {
                return Ok(AddUserOutcome::NameTaken);
            }

            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM users WHERE team_id = ?1",
                [team_id],
                |row| row.get(0),
            )?;
            let count = count as usize;
            if count >= MAX_TEAM_SIZE {
                return Ok(AddUserOutcome::TeamFull);
            }
            let color = color_for_slot(count)
                .ok_or_else(|| anyhow!("No palette slot for user #{}", count))?;

            tx.execute(
                "INSERT INTO users (id, team_id, name, color) VALUES (?1, ?2, ?3, ?4)",
                (id, team_id, name, color),
            )?;
            tx.commit()?;

            Ok(AddUserOutcome::Added(UserRow {
                id: id.to_string(),
                team_id: team_id.to_string(),
                name: name.to_string(),
                color: color.to_string(),
            }))
        })
    }

    /// Users of a team in creation order.
    pub fn list_users(&self, team_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, team_id, name, color FROM users WHERE team_id = ?1 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([team_id], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, team_id, name, color FROM users WHERE id = ?1",
                [id],
                map_user,
            )
            .optional()
        })
    }

    // -- Doors --

    /// Doors of a team ordered by number.
    pub fn list_doors(&self, team_id: &str) -> Result<Vec<DoorRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, team_id, number FROM doors WHERE team_id = ?1 ORDER BY number",
            )?;
            let rows = stmt
                .query_map([team_id], map_door)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_door(&self, id: &str) -> Result<Option<DoorRow>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id, team_id, number FROM doors WHERE id = ?1", [id], map_door)
                .optional()
        })
    }

    /// Kilometers logged so far on one door.
    pub fn door_reached_km(&self, door_id: &str) -> Result<f64> {
        self.with_conn(|conn| query_reached(conn, door_id))
    }

    /// Delete every run of a door. Returns how many were removed.
    pub fn reset_door(&self, door_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM contributions WHERE door_id = ?1", [door_id])?;
            Ok(removed)
        })
    }

    // -- Contributions --

    /// Check the door's remaining capacity and insert the run, both inside
    /// one IMMEDIATE transaction so two submissions cannot overshoot together.
    pub fn log_contribution(
        &self,
        id: &str,
        door_id: &str,
        user_id: &str,
        km: f64,
    ) -> Result<LogRunOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let number: u32 = tx
                .query_row("SELECT number FROM doors WHERE id = ?1", [door_id], |row| row.get(0))
                .optional()?
                .ok_or_else(|| anyhow!("Door not found: {}", door_id))?;
            let target = f64::from(number);
            let reached = query_reached(&tx, door_id)?;

            if reached + km > target {
                debug!(door_id, reached, km, target, "run rejected, door capacity exceeded");
                return Ok(LogRunOutcome::ExceedsTarget {
                    remaining_km: target - reached,
                });
            }

            let created_at = chrono::Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO contributions (id, door_id, user_id, km, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, door_id, user_id, km, created_at],
            )?;
            tx.commit()?;

            Ok(LogRunOutcome::Logged(ContributionRow {
                id: id.to_string(),
                door_id: door_id.to_string(),
                user_id: user_id.to_string(),
                km,
                created_at,
            }))
        })
    }

    /// Per door and user kilometer sums for a whole team, in one query.
    pub fn door_user_totals(&self, team_id: &str) -> Result<Vec<DoorUserTotal>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.door_id, c.user_id, SUM(c.km)
                 FROM contributions c
                 JOIN doors d ON d.id = c.door_id
                 WHERE d.team_id = ?1
                 GROUP BY c.door_id, c.user_id",
            )?;
            let rows = stmt
                .query_map([team_id], |row| {
                    Ok(DoorUserTotal {
                        door_id: row.get(0)?,
                        user_id: row.get(1)?,
                        km: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Kilometers logged across all doors of a team.
    pub fn team_reached_km(&self, team_id: &str) -> Result<f64> {
        self.with_conn(|conn| {
            let total = conn.query_row(
                "SELECT COALESCE(SUM(c.km), 0.0)
                 FROM contributions c
                 JOIN doors d ON d.id = c.door_id
                 WHERE d.team_id = ?1",
                [team_id],
                |row| row.get(0),
            )?;
            Ok(total)
        })
    }
}

fn query_team(conn: &Connection, column: &str, value: &str) -> Result<Option<TeamRow>> {
    let sql = format!(
        "SELECT id, name, pin_hash, created_at FROM teams WHERE {} = ?1",
        column
    );
    conn.query_row(&sql, [value], |row| {
        Ok(TeamRow {
            id: row.get(0)?,
            name: row.get(1)?,
            pin_hash: row.get(2)?,
            created_at: row.get(3)?,
        })
    })
    .optional()
}

fn query_reached(conn: &Connection, door_id: &str) -> Result<f64> {
    let reached = conn.query_row(
        "SELECT COALESCE(SUM(km), 0.0) FROM contributions WHERE door_id = ?1",
        [door_id],
        |row| row.get(0),
    )?;
    Ok(reached)
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        team_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
    })
}

fn map_door(row: &rusqlite::Row<'_>) -> rusqlite::Result<DoorRow> {
    Ok(DoorRow {
        id: row.get(0)?,
        team_id: row.get(1)?,
        number: row.get(2)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
