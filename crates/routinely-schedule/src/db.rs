use rusqlite::{params, Connection};

use crate::error::Result;
use crate::interval::TimeInterval;
use crate::routine::Routine;
use crate::types::{Activity, CompletedActivity};

/// Initialise the scheduling schema. Safe to call on every startup —
/// CREATE IF NOT EXISTS throughout.
///
/// `routines` is the unit of optimistic mutation: one row per user with the
/// seven embedded activity arrays as JSON columns and a `version` counter
/// driving the conditional replace. `activities` mirrors each activity as a
/// separately addressable row for direct lookup, the completion toggle, the
/// bulk midnight reset and the stats rollups.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS routines (
            id                  TEXT PRIMARY KEY NOT NULL,
            user_id             TEXT NOT NULL UNIQUE,
            all_time_activities INTEGER NOT NULL DEFAULT 0,
            monday              TEXT NOT NULL DEFAULT '[]',  -- JSON Activity array
            tuesday             TEXT NOT NULL DEFAULT '[]',
            wednesday           TEXT NOT NULL DEFAULT '[]',
            thursday            TEXT NOT NULL DEFAULT '[]',
            friday              TEXT NOT NULL DEFAULT '[]',
            saturday            TEXT NOT NULL DEFAULT '[]',
            sunday              TEXT NOT NULL DEFAULT '[]',
            version             INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS activities (
            id               TEXT PRIMARY KEY NOT NULL,
            routine_id       TEXT NOT NULL REFERENCES routines(id),
            user_id          TEXT NOT NULL,
            weekday          TEXT NOT NULL,
            start_time       TEXT NOT NULL,  -- HH:MM
            end_time         TEXT NOT NULL,  -- HH:MM
            duration_minutes INTEGER NOT NULL,
            label            TEXT NOT NULL,
            category         TEXT NOT NULL,
            color            TEXT NOT NULL,
            is_completed     INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_activities_user ON activities (user_id);

        CREATE TABLE IF NOT EXISTS completed_activities (
            id               TEXT PRIMARY KEY NOT NULL,
            activity_id      TEXT NOT NULL,
            label            TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            category         TEXT NOT NULL,
            completed_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_completed_activity
            ON completed_activities (activity_id, completed_at);",
    )?;
    Ok(())
}

/// A routine document plus the version its conditional replace must match.
#[derive(Debug, Clone)]
pub struct StoredRoutine {
    pub routine: Routine,
    pub version: i64,
}

const ROUTINE_SELECT_SQL: &str =
    "SELECT id, user_id, all_time_activities, monday, tuesday, wednesday,
            thursday, friday, saturday, sunday, version
     FROM routines";

/// Wrap a column parse failure so row-mapping closures can stay on
/// `rusqlite::Result` like every other query in the crate.
fn column_parse_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn row_to_stored_routine(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRoutine> {
    let bucket = |idx: usize| -> rusqlite::Result<crate::bucket::DayBucket> {
        let json: String = row.get(idx)?;
        serde_json::from_str(&json).map_err(|e| column_parse_err(idx, e))
    };
    Ok(StoredRoutine {
        routine: Routine {
            id: row.get(0)?,
            user_id: row.get(1)?,
            all_time_activities: row.get::<_, i64>(2)? as u64,
            monday: bucket(3)?,
            tuesday: bucket(4)?,
            wednesday: bucket(5)?,
            thursday: bucket(6)?,
            friday: bucket(7)?,
            saturday: bucket(8)?,
            sunday: bucket(9)?,
        },
        version: row.get(10)?,
    })
}

pub(crate) fn fetch_routine(conn: &Connection, user_id: &str) -> Result<Option<StoredRoutine>> {
    let sql = format!("{ROUTINE_SELECT_SQL} WHERE user_id = ?1");
    match conn.query_row(&sql, params![user_id], row_to_stored_routine) {
        Ok(r) => Ok(Some(r)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Insert a brand-new routine row at version 0.
///
/// Returns false when another writer created the row first (the UNIQUE
/// user_id constraint is the race detector) — callers reload and retry.
pub(crate) fn insert_routine(conn: &Connection, routine: &Routine, now: &str) -> Result<bool> {
    let result = conn.execute(
        "INSERT INTO routines
            (id, user_id, all_time_activities, monday, tuesday, wednesday,
             thursday, friday, saturday, sunday, version, created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,0,?11,?11)",
        params![
            routine.id,
            routine.user_id,
            routine.all_time_activities as i64,
            serde_json::to_string(&routine.monday)?,
            serde_json::to_string(&routine.tuesday)?,
            serde_json::to_string(&routine.wednesday)?,
            serde_json::to_string(&routine.thursday)?,
            serde_json::to_string(&routine.friday)?,
            serde_json::to_string(&routine.saturday)?,
            serde_json::to_string(&routine.sunday)?,
            now,
        ],
    );
    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Conditional replace: write the document only if `expected_version` still
/// matches. Returns false when a concurrent writer won the race.
pub(crate) fn replace_routine(
    conn: &Connection,
    routine: &Routine,
    expected_version: i64,
    now: &str,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE routines SET
            all_time_activities=?1, monday=?2, tuesday=?3, wednesday=?4,
            thursday=?5, friday=?6, saturday=?7, sunday=?8,
            version=version+1, updated_at=?9
         WHERE user_id=?10 AND version=?11",
        params![
            routine.all_time_activities as i64,
            serde_json::to_string(&routine.monday)?,
            serde_json::to_string(&routine.tuesday)?,
            serde_json::to_string(&routine.wednesday)?,
            serde_json::to_string(&routine.thursday)?,
            serde_json::to_string(&routine.friday)?,
            serde_json::to_string(&routine.saturday)?,
            serde_json::to_string(&routine.sunday)?,
            now,
            routine.user_id,
            expected_version,
        ],
    )?;
    Ok(rows > 0)
}

/// Unconditional document write (version still advances). Used by the
/// midnight reset where last-write-wins is the accepted outcome.
fn force_replace_routine(conn: &Connection, routine: &Routine, now: &str) -> Result<()> {
    conn.execute(
        "UPDATE routines SET
            monday=?1, tuesday=?2, wednesday=?3, thursday=?4,
            friday=?5, saturday=?6, sunday=?7,
            version=version+1, updated_at=?8
         WHERE user_id=?9",
        params![
            serde_json::to_string(&routine.monday)?,
            serde_json::to_string(&routine.tuesday)?,
            serde_json::to_string(&routine.wednesday)?,
            serde_json::to_string(&routine.thursday)?,
            serde_json::to_string(&routine.friday)?,
            serde_json::to_string(&routine.saturday)?,
            serde_json::to_string(&routine.sunday)?,
            now,
            routine.user_id,
        ],
    )?;
    Ok(())
}

pub(crate) fn count_routines(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM routines", [], |row| row.get(0))?;
    Ok(n as u64)
}

pub(crate) fn list_routines(conn: &Connection, offset: u64, limit: u32) -> Result<Vec<Routine>> {
    let sql = format!("{ROUTINE_SELECT_SQL} ORDER BY created_at LIMIT ?1 OFFSET ?2");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![limit as i64, offset as i64], row_to_stored_routine)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|s| s.routine).collect())
}

// ── activity rows ─────────────────────────────────────────────────────────────

const ACTIVITY_SELECT_SQL: &str =
    "SELECT id, routine_id, user_id, weekday, start_time, end_time,
            duration_minutes, label, category, color, is_completed, created_at
     FROM activities";

fn row_to_activity(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Activity, String)> {
    use std::str::FromStr;

    let weekday = routinely_core::types::Weekday::from_str(&row.get::<_, String>(3)?)
        .map_err(|e| column_parse_err(3, std::io::Error::other(e)))?;
    let start = crate::interval::WallClock::from_str(&row.get::<_, String>(4)?)
        .map_err(|e| column_parse_err(4, e))?;
    let end = crate::interval::WallClock::from_str(&row.get::<_, String>(5)?)
        .map_err(|e| column_parse_err(5, e))?;
    let interval = TimeInterval::new(start, end).map_err(|e| column_parse_err(5, e))?;
    let category = routinely_core::types::Category::from_str(&row.get::<_, String>(8)?)
        .map_err(|e| column_parse_err(8, std::io::Error::other(e)))?;

    let user_id: String = row.get(2)?;
    let activity = Activity {
        id: row.get(0)?,
        routine_id: row.get(1)?,
        weekday,
        interval,
        duration_minutes: row.get::<_, i64>(6)? as u32,
        label: row.get(7)?,
        category,
        color: row.get(9)?,
        is_completed: row.get::<_, i32>(10)? != 0,
        created_at: row.get(11)?,
    };
    Ok((activity, user_id))
}

pub(crate) fn insert_activity_row(
    conn: &Connection,
    activity: &Activity,
    user_id: &str,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO activities
            (id, routine_id, user_id, weekday, start_time, end_time,
             duration_minutes, label, category, color, is_completed,
             created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
        params![
            activity.id,
            activity.routine_id,
            user_id,
            activity.weekday.to_string(),
            activity.interval().start().to_string(),
            activity.interval().end().to_string(),
            activity.duration_minutes as i64,
            activity.label,
            activity.category.to_string(),
            activity.color,
            activity.is_completed as i32,
            activity.created_at,
            now,
        ],
    )?;
    Ok(())
}

pub(crate) fn update_activity_row(conn: &Connection, activity: &Activity, now: &str) -> Result<()> {
    conn.execute(
        "UPDATE activities SET
            start_time=?2, end_time=?3, duration_minutes=?4,
            label=?5, category=?6, color=?7, is_completed=?8, updated_at=?9
         WHERE id=?1",
        params![
            activity.id,
            activity.interval().start().to_string(),
            activity.interval().end().to_string(),
            activity.duration_minutes as i64,
            activity.label,
            activity.category.to_string(),
            activity.color,
            activity.is_completed as i32,
            now,
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_activity_row(conn: &Connection, activity_id: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM activities WHERE id = ?1", params![activity_id])?;
    Ok(rows > 0)
}

/// Direct id lookup. Returns the activity plus its owner's user id for the
/// engine-side ownership check on completion toggles.
pub(crate) fn fetch_activity_row(
    conn: &Connection,
    activity_id: &str,
) -> Result<Option<(Activity, String)>> {
    let sql = format!("{ACTIVITY_SELECT_SQL} WHERE id = ?1");
    match conn.query_row(&sql, params![activity_id], row_to_activity) {
        Ok(pair) => Ok(Some(pair)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn set_activity_completed_row(
    conn: &Connection,
    activity_id: &str,
    completed: bool,
    now: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE activities SET is_completed = ?2, updated_at = ?3 WHERE id = ?1",
        params![activity_id, completed as i32, now],
    )?;
    Ok(())
}

// ── archival records ──────────────────────────────────────────────────────────

pub(crate) fn insert_completed_row(conn: &Connection, record: &CompletedActivity) -> Result<()> {
    conn.execute(
        "INSERT INTO completed_activities
            (id, activity_id, label, duration_minutes, category, completed_at)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            record.id,
            record.activity_id,
            record.label,
            record.duration_minutes as i64,
            record.category.to_string(),
            record.completed_at,
        ],
    )?;
    Ok(())
}

/// Delete the most recent archival record for an activity. Returns false when
/// none exists (a caller double-unmarking), which is not an error.
pub(crate) fn delete_latest_completed_row(conn: &Connection, activity_id: &str) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM completed_activities WHERE id =
            (SELECT id FROM completed_activities
             WHERE activity_id = ?1
             ORDER BY completed_at DESC, id DESC
             LIMIT 1)",
        params![activity_id],
    )?;
    Ok(rows > 0)
}

// ── midnight reset ────────────────────────────────────────────────────────────

/// Re-arm every activity a user owns: clear the flag on all activity rows and
/// inside the routine document. Archival records are untouched. Returns the
/// number of activity rows that were completed.
///
/// Racing a concurrent `set_completed` is last-write-wins; the reset only
/// ever clears flags, so the worst case is one lost mark just before midnight.
pub fn reset_completed_for_user(conn: &Connection, user_id: &str, now: &str) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE activities SET is_completed = 0, updated_at = ?2
         WHERE user_id = ?1 AND is_completed = 1",
        params![user_id, now],
    )?;

    if let Some(stored) = fetch_routine(conn, user_id)? {
        let mut routine = stored.routine;
        routine.set_all_completed(false);
        force_replace_routine(conn, &routine, now)?;
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_COLOR;
    use routinely_core::types::{Category, Weekday};

    const NOW: &str = "2026-01-05T06:00:00+00:00";

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn
    }

    #[test]
    fn replace_requires_matching_version() {
        let conn = conn();
        let mut routine = Routine::new("u1");
        assert!(insert_routine(&conn, &routine, NOW).unwrap());

        routine.all_time_activities = 1;
        // Stale version: a concurrent writer would see zero affected rows.
        assert!(!replace_routine(&conn, &routine, 7, NOW).unwrap());
        assert!(replace_routine(&conn, &routine, 0, NOW).unwrap());

        // The successful write advanced the version, so replaying it loses.
        assert!(!replace_routine(&conn, &routine, 0, NOW).unwrap());
        let stored = fetch_routine(&conn, "u1").unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.routine.all_time_activities, 1);
    }

    #[test]
    fn duplicate_user_insert_reports_lost_race() {
        let conn = conn();
        assert!(insert_routine(&conn, &Routine::new("u1"), NOW).unwrap());
        assert!(!insert_routine(&conn, &Routine::new("u1"), NOW).unwrap());
    }

    #[test]
    fn latest_archival_record_is_deleted_first() {
        let conn = conn();
        let activity = Activity::new(
            "r1",
            Weekday::Monday,
            TimeInterval::parse("07:00", "07:30").unwrap(),
            "Run",
            Category::Health,
            DEFAULT_COLOR,
            NOW,
        );
        let first = CompletedActivity::snapshot(&activity, "2026-01-05T20:00:00+00:00");
        let second = CompletedActivity::snapshot(&activity, "2026-01-06T20:00:00+00:00");
        insert_completed_row(&conn, &first).unwrap();
        insert_completed_row(&conn, &second).unwrap();

        assert!(delete_latest_completed_row(&conn, &activity.id).unwrap());
        let remaining: String = conn
            .query_row(
                "SELECT completed_at FROM completed_activities WHERE activity_id = ?1",
                params![activity.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, "2026-01-05T20:00:00+00:00");

        assert!(delete_latest_completed_row(&conn, &activity.id).unwrap());
        assert!(!delete_latest_completed_row(&conn, &activity.id).unwrap());
    }
}
