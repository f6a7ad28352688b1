use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS teams (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            pin_hash    TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            team_id     TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            name        TEXT NOT NULL,
            color       TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(team_id, name)
        );

        CREATE INDEX IF NOT EXISTS idx_users_team
            ON users(team_id);

        -- The target of a door is its number; no separate column.
        CREATE TABLE IF NOT EXISTS doors (
            id          TEXT PRIMARY KEY,
            team_id     TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            number      INTEGER NOT NULL CHECK (number BETWEEN 1 AND 24),
            UNIQUE(team_id, number)
        );

        CREATE TABLE IF NOT EXISTS contributions (
            id          TEXT PRIMARY KEY,
            door_id     TEXT NOT NULL REFERENCES doors(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            km          REAL NOT NULL CHECK (km > 0),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_contributions_door
            ON contributions(door_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
