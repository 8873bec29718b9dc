use rusqlite::Connection;

use crate::error::Result;
use crate::types::User;

pub(crate) const USER_SELECT_SQL: &str =
    "SELECT id, name, surname, email, nationality, birthdate, gender,
            timezone, role, active, created_at, updated_at
     FROM users";

/// Map a SELECT row (column order from USER_SELECT_SQL) to a User.
/// Centralised here so every query in this crate stays consistent.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    use std::str::FromStr;
    let gender = crate::types::Gender::from_str(&row.get::<_, String>(6)?).unwrap_or_default();
    let role = routinely_core::types::Role::from_str(&row.get::<_, String>(8)?).unwrap_or_default();
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        surname: row.get(2)?,
        email: row.get(3)?,
        nationality: row.get(4)?,
        birthdate: row.get(5)?,
        gender,
        timezone: row.get(7)?,
        role,
        active: row.get::<_, i32>(9)? != 0,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Initialise the users table. Safe to call on every startup —
/// CREATE IF NOT EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            surname     TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            nationality TEXT NOT NULL,
            birthdate   TEXT NOT NULL,               -- YYYY-MM-DD
            gender      TEXT NOT NULL DEFAULT 'none',
            timezone    TEXT NOT NULL DEFAULT 'UTC', -- IANA zone name
            role        TEXT NOT NULL DEFAULT 'user',
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );",
    )?;
    Ok(())
}

/// `(user_id, timezone)` for every active user — the reset engine's per-tick
/// working set. Inactive users keep their rows but are never re-armed.
pub fn active_timezones(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT id, timezone FROM users WHERE active = 1")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
