use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use routinely_core::config::DEFAULT_CAS_MAX_RETRIES;
use routinely_core::page::{self, Page};
use routinely_core::types::{Category, Weekday};

use crate::db;
use crate::error::{Result, ScheduleError};
use crate::interval::TimeInterval;
use crate::routine::Routine;
use crate::types::{
    validate_color, Activity, ActivityPatch, CompletedActivity, NewActivity, ValidatedPatch,
    DEFAULT_COLOR,
};

/// The scheduling engine's public contract.
///
/// Every operation independently loads, mutates and persists the target
/// user's routine document. Writes go through a conditional replace keyed on
/// the document version; a lost race reloads fresh state and re-runs the full
/// validation, bounded by `max_retries`, then surfaces [`ScheduleError::Contention`].
///
/// Which target user a caller may address is the transport/authorization
/// collaborator's decision. The engine itself enforces ownership only on the
/// completion toggle, which is addressed by bare activity id.
pub struct ScheduleService {
    db: Arc<Mutex<Connection>>,
    max_retries: u32,
}

impl ScheduleService {
    /// Wrap a shared connection, initialising the schema if needed.
    pub fn new(db: Arc<Mutex<Connection>>) -> Result<Self> {
        {
            let conn = db.lock().unwrap();
            db::init_db(&conn)?;
        }
        Ok(Self {
            db,
            max_retries: DEFAULT_CAS_MAX_RETRIES,
        })
    }

    /// Override the conditional-write retry bound (config: `engine.cas_max_retries`).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// The user's full week. A routine that exists but has every bucket empty
    /// counts as absent — the lifetime counter deliberately has no say here.
    pub fn routine(&self, user_id: &str) -> Result<Routine> {
        let conn = self.db.lock().unwrap();
        match db::fetch_routine(&conn, user_id)? {
            Some(stored) if stored.routine.has_activities() => Ok(stored.routine),
            _ => Err(ScheduleError::NotFound(format!(
                "no routine found for user {user_id}"
            ))),
        }
    }

    /// All activities for one weekday, in start-time order.
    pub fn list_day(&self, user_id: &str, weekday: Weekday) -> Result<Vec<Activity>> {
        let conn = self.db.lock().unwrap();
        let not_found = || ScheduleError::NotFound(format!("no activity found for {weekday}"));
        let stored = db::fetch_routine(&conn, user_id)?.ok_or_else(not_found)?;
        let bucket = stored.routine.day(weekday);
        if bucket.is_empty() {
            return Err(not_found());
        }
        Ok(bucket.activities().to_vec())
    }

    /// Direct lookup inside one day bucket.
    pub fn activity(&self, user_id: &str, weekday: Weekday, activity_id: &str) -> Result<Activity> {
        let conn = self.db.lock().unwrap();
        let stored = db::fetch_routine(&conn, user_id)?.ok_or_else(|| {
            ScheduleError::NotFound(format!("no activity found for {weekday}"))
        })?;
        stored
            .routine
            .day(weekday)
            .find(activity_id)
            .cloned()
            .ok_or_else(|| ScheduleError::NotFound(format!("activity {activity_id}")))
    }

    /// Insert a new activity, lazily creating the routine on first write.
    ///
    /// All field validation happens before any store access; the conflict
    /// check runs against the freshly loaded bucket on every attempt. The
    /// routine document and the activity row commit in one transaction, and
    /// the lifetime counter moves only when that commit succeeds.
    pub fn create_activity(
        &self,
        user_id: &str,
        weekday: Weekday,
        input: NewActivity,
    ) -> Result<Activity> {
        let (interval, label, category, color) = validate_new(&input)?;

        for attempt in 0..self.max_retries {
            let mut conn = self.db.lock().unwrap();
            let stored = db::fetch_routine(&conn, user_id)?;
            let (mut routine, version) = match stored {
                Some(s) => (s.routine, Some(s.version)),
                None => (Routine::new(user_id), None),
            };

            let now = Utc::now().to_rfc3339();
            let activity = Activity::new(
                &routine.id,
                weekday,
                interval,
                &label,
                category,
                &color,
                &now,
            );
            let inserted = routine.day_mut(weekday).insert(activity)?;
            routine.all_time_activities += 1;

            let tx = conn.transaction()?;
            let written = match version {
                None => db::insert_routine(&tx, &routine, &now)?,
                Some(v) => db::replace_routine(&tx, &routine, v, &now)?,
            };
            if !written {
                drop(tx);
                warn!(user_id, attempt, "routine write lost to concurrent writer; retrying");
                continue;
            }
            db::insert_activity_row(&tx, &inserted, user_id, &now)?;
            tx.commit()?;

            info!(user_id, activity_id = %inserted.id, day = %weekday, "activity created");
            return Ok(inserted);
        }

        Err(ScheduleError::Contention {
            attempts: self.max_retries,
        })
    }

    /// Patch an existing activity. The patch must name at least one field;
    /// the patched interval is re-validated against every sibling (self
    /// excluded) on every attempt.
    pub fn update_activity(
        &self,
        user_id: &str,
        weekday: Weekday,
        activity_id: &str,
        patch: &ActivityPatch,
    ) -> Result<Activity> {
        let validated = validate_patch(patch)?;

        for attempt in 0..self.max_retries {
            let mut conn = self.db.lock().unwrap();
            let stored = db::fetch_routine(&conn, user_id)?.ok_or_else(|| {
                ScheduleError::NotFound(format!("no routine found for user {user_id}"))
            })?;
            let mut routine = stored.routine;
            let updated = routine.day_mut(weekday).update(activity_id, &validated)?;

            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            if !db::replace_routine(&tx, &routine, stored.version, &now)? {
                drop(tx);
                warn!(user_id, attempt, "routine write lost to concurrent writer; retrying");
                continue;
            }
            db::update_activity_row(&tx, &updated, &now)?;
            tx.commit()?;

            info!(user_id, activity_id, day = %weekday, "activity updated");
            return Ok(updated);
        }

        Err(ScheduleError::Contention {
            attempts: self.max_retries,
        })
    }

    /// Remove an activity from its bucket and the activity store. Archival
    /// records and the lifetime counter are both left alone. A repeat delete
    /// of the same id returns `NotFound`.
    pub fn delete_activity(
        &self,
        user_id: &str,
        weekday: Weekday,
        activity_id: &str,
    ) -> Result<()> {
        for attempt in 0..self.max_retries {
            let mut conn = self.db.lock().unwrap();
            let stored = db::fetch_routine(&conn, user_id)?.ok_or_else(|| {
                ScheduleError::NotFound(format!("no activity found for {weekday}"))
            })?;
            let mut routine = stored.routine;
            let removed = routine.day_mut(weekday).remove(activity_id)?;

            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            if !db::replace_routine(&tx, &routine, stored.version, &now)? {
                drop(tx);
                warn!(user_id, attempt, "routine write lost to concurrent writer; retrying");
                continue;
            }
            db::delete_activity_row(&tx, &removed.id)?;
            tx.commit()?;

            info!(user_id, activity_id, day = %weekday, "activity deleted");
            return Ok(());
        }

        Err(ScheduleError::Contention {
            attempts: self.max_retries,
        })
    }

    /// Toggle the completion flag on an activity addressed by bare id.
    ///
    /// The engine enforces ownership here: `caller_id` must match the
    /// activity's owner. Marking complete writes one archival snapshot;
    /// unmarking deletes the most recent one. The side effect always runs:
    /// a caller double-marking gets duplicate archival rows, a caller
    /// double-unmarking finds none to delete.
    pub fn set_completed(
        &self,
        caller_id: &str,
        activity_id: &str,
        completed: bool,
    ) -> Result<Activity> {
        for attempt in 0..self.max_retries {
            let mut conn = self.db.lock().unwrap();
            let (activity, owner_id) = db::fetch_activity_row(&conn, activity_id)?
                .ok_or_else(|| ScheduleError::NotFound(format!("activity {activity_id}")))?;
            if owner_id != caller_id {
                return Err(ScheduleError::Forbidden(
                    "you do not have permission to modify this activity".to_string(),
                ));
            }

            let stored = db::fetch_routine(&conn, &owner_id)?.ok_or_else(|| {
                ScheduleError::NotFound(format!("no routine found for user {owner_id}"))
            })?;
            let mut routine = stored.routine;
            let updated = routine
                .day_mut(activity.weekday)
                .set_completed(activity_id, completed)
                .ok_or_else(|| ScheduleError::NotFound(format!("activity {activity_id}")))?;

            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            if !db::replace_routine(&tx, &routine, stored.version, &now)? {
                drop(tx);
                warn!(user_id = %owner_id, attempt, "routine write lost to concurrent writer; retrying");
                continue;
            }
            db::set_activity_completed_row(&tx, activity_id, completed, &now)?;
            if completed {
                db::insert_completed_row(&tx, &CompletedActivity::snapshot(&updated, &now))?;
            } else {
                db::delete_latest_completed_row(&tx, activity_id)?;
            }
            tx.commit()?;

            info!(activity_id, completed, "completion flag toggled");
            return Ok(updated);
        }

        Err(ScheduleError::Contention {
            attempts: self.max_retries,
        })
    }

    /// Admin listing: every routine, ordered by creation, offset-paginated.
    pub fn all_routines(&self, page: u32, limit: u32) -> Result<Page<Routine>> {
        let conn = self.db.lock().unwrap();
        let total = db::count_routines(&conn)?;
        let window = page::window(page, limit, total)?;
        let routines = db::list_routines(&conn, window.offset, window.limit)?;
        Ok(Page::new(routines, page, window))
    }
}

fn validate_new(input: &NewActivity) -> Result<(TimeInterval, String, Category, String)> {
    if input.start.is_empty()
        || input.end.is_empty()
        || input.label.trim().is_empty()
        || input.category.is_empty()
    {
        return Err(ScheduleError::InvalidInput(
            "all fields (start, end, label, category) are required, except color".to_string(),
        ));
    }
    let category = Category::from_str(&input.category)
        .map_err(|_| ScheduleError::InvalidInput(format!("unknown category {:?}", input.category)))?;
    let interval = TimeInterval::parse(&input.start, &input.end)?;
    let color = match &input.color {
        Some(c) => {
            validate_color(c)?;
            c.clone()
        }
        None => DEFAULT_COLOR.to_string(),
    };
    Ok((interval, input.label.trim().to_string(), category, color))
}

fn validate_patch(patch: &ActivityPatch) -> Result<ValidatedPatch> {
    if patch.is_empty() {
        return Err(ScheduleError::InvalidInput(
            "at least one of start, end, label, category or color must be provided".to_string(),
        ));
    }

    let mut validated = ValidatedPatch::default();
    if let Some(start) = &patch.start {
        validated.start = Some(start.parse()?);
    }
    if let Some(end) = &patch.end {
        validated.end = Some(end.parse()?);
    }
    if let Some(label) = &patch.label {
        if label.trim().is_empty() {
            return Err(ScheduleError::InvalidInput("label must not be empty".to_string()));
        }
        validated.label = Some(label.trim().to_string());
    }
    if let Some(category) = &patch.category {
        validated.category = Some(
            Category::from_str(category)
                .map_err(|_| ScheduleError::InvalidInput(format!("unknown category {category:?}")))?,
        );
    }
    if let Some(color) = &patch.color {
        validate_color(color)?;
        validated.color = Some(color.clone());
    }
    Ok(validated)
}
