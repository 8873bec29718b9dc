use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection};

use routinely_core::page::{self, Page};
use routinely_core::types::{Category, Weekday};

use crate::error::{Result, StatsError};
use crate::types::{
    BirthYearStats, CategoryDuration, CategoryStats, DayStats, NationalityStats,
    RegistrationStats, SummaryStats,
};

/// Read-only rollups over the engine's tables.
///
/// Operates on the schema owned by `routinely-schedule` and `routinely-users`;
/// construct those stores first so the tables exist.
pub struct StatsAggregator {
    db: Arc<Mutex<Connection>>,
}

impl StatsAggregator {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Headline totals plus today's registration and completion counts
    /// (both on the UTC calendar day).
    pub fn summary(&self) -> Result<SummaryStats> {
        let conn = self.db.lock().unwrap();
        let count = |sql: &str| -> Result<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let new_registrations_today: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE substr(created_at, 1, 10) = ?1",
            params![today],
            |row| row.get(0),
        )?;
        let activities_completed_today: i64 = conn.query_row(
            "SELECT COUNT(*) FROM activities
             WHERE is_completed = 1 AND substr(updated_at, 1, 10) = ?1",
            params![today],
            |row| row.get(0),
        )?;

        Ok(SummaryStats {
            total_users: count("SELECT COUNT(*) FROM users")?,
            active_activities: count("SELECT COUNT(*) FROM activities")?,
            completed_activities: count("SELECT COUNT(*) FROM completed_activities")?,
            all_time_activities: count(
                "SELECT COALESCE(SUM(all_time_activities), 0) FROM routines",
            )?,
            new_registrations_today: new_registrations_today as u64,
            activities_completed_today: activities_completed_today as u64,
        })
    }

    /// Count, summed duration and mean duration per category, sorted
    /// descending by total duration.
    pub fn category_stats(&self) -> Result<Vec<CategoryStats>> {
        let conn = self.db.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*), SUM(duration_minutes)
             FROM activities
             GROUP BY category
             ORDER BY SUM(duration_minutes) DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(StatsError::NotFound("no activities found".to_string()));
        }

        rows.into_iter()
            .map(|(category, count, duration)| {
                let category = parse_category(&category)?;
                let mean = duration as f64 / count as f64;
                Ok(CategoryStats {
                    category,
                    total_activities: count as u64,
                    total_duration_minutes: duration as u64,
                    duration_per_activity: (mean * 100.0).round() / 100.0,
                })
            })
            .collect()
    }

    /// Per-weekday activity volume with the category breakdown. Days are
    /// emitted in fixed Monday-first order; days with no activities are
    /// omitted; categories within a day sort descending by duration.
    pub fn day_stats(&self) -> Result<Vec<DayStats>> {
        let conn = self.db.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT weekday, category, COUNT(*), SUM(duration_minutes)
             FROM activities
             GROUP BY weekday, category",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(StatsError::NotFound("no activities found".to_string()));
        }

        let mut per_day: HashMap<Weekday, (u64, Vec<CategoryDuration>)> = HashMap::new();
        for (weekday, category, count, duration) in rows {
            let weekday = Weekday::from_str(&weekday)
                .map_err(StatsError::InvalidInput)?;
            let category = parse_category(&category)?;
            let entry = per_day.entry(weekday).or_default();
            entry.0 += count as u64;
            entry.1.push(CategoryDuration {
                category,
                duration_minutes: duration as u64,
            });
        }

        let mut out = Vec::new();
        for day in Weekday::ALL {
            if let Some((total, mut categories)) = per_day.remove(&day) {
                categories.sort_by(|a, b| b.duration_minutes.cmp(&a.duration_minutes));
                out.push(DayStats {
                    day,
                    total_activities: total,
                    categories,
                });
            }
        }
        Ok(out)
    }

    /// Nationality × gender counts, one row per nationality (alphabetical —
    /// pagination needs a stable order), paginated.
    pub fn nationality_stats(&self, page: u32, limit: u32) -> Result<Page<NationalityStats>> {
        let conn = self.db.lock().unwrap();
        let total: i64 =
            conn.query_row("SELECT COUNT(DISTINCT nationality) FROM users", [], |row| {
                row.get(0)
            })?;
        let window = page::window(page, limit, total as u64)?;

        let mut stmt = conn.prepare(
            "SELECT nationality, gender, COUNT(*)
             FROM users
             WHERE nationality IN (
                 SELECT DISTINCT nationality FROM users
                 ORDER BY nationality LIMIT ?1 OFFSET ?2)
             GROUP BY nationality, gender
             ORDER BY nationality",
        )?;
        let rows = stmt
            .query_map(params![window.limit as i64, window.offset as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut results: Vec<NationalityStats> = Vec::new();
        for (nationality, gender, count) in rows {
            if results.last().map(|r| r.nationality.as_str()) != Some(nationality.as_str()) {
                results.push(NationalityStats {
                    nationality,
                    total: 0,
                    male: 0,
                    female: 0,
                    none: 0,
                });
            }
            if let Some(entry) = results.last_mut() {
                entry.total += count as u64;
                match gender.as_str() {
                    "male" => entry.male += count as u64,
                    "female" => entry.female += count as u64,
                    _ => entry.none += count as u64,
                }
            }
        }
        Ok(Page::new(results, page, window))
    }

    /// Users per birth year, ascending, paginated.
    pub fn birth_year_stats(&self, page: u32, limit: u32) -> Result<Page<BirthYearStats>> {
        let conn = self.db.lock().unwrap();
        let total: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT substr(birthdate, 1, 4)) FROM users",
            [],
            |row| row.get(0),
        )?;
        let window = page::window(page, limit, total as u64)?;

        let mut stmt = conn.prepare(
            "SELECT CAST(substr(birthdate, 1, 4) AS INTEGER) AS year, COUNT(*)
             FROM users
             GROUP BY year
             ORDER BY year ASC
             LIMIT ?1 OFFSET ?2",
        )?;
        let results = stmt
            .query_map(params![window.limit as i64, window.offset as i64], |row| {
                Ok(BirthYearStats {
                    year: row.get(0)?,
                    user_count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Page::new(results, page, window))
    }

    /// Users per (year, month) of registration, paginated. Year ascends,
    /// months within a year descend.
    pub fn registration_stats(&self, page: u32, limit: u32) -> Result<Page<RegistrationStats>> {
        let conn = self.db.lock().unwrap();
        let total: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT substr(created_at, 1, 7)) FROM users",
            [],
            |row| row.get(0),
        )?;
        let window = page::window(page, limit, total as u64)?;

        let mut stmt = conn.prepare(
            "SELECT CAST(substr(created_at, 1, 4) AS INTEGER) AS year,
                    CAST(substr(created_at, 6, 2) AS INTEGER) AS month,
                    COUNT(*)
             FROM users
             GROUP BY year, month
             ORDER BY year ASC, month DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let results = stmt
            .query_map(params![window.limit as i64, window.offset as i64], |row| {
                Ok(RegistrationStats {
                    year: row.get(0)?,
                    month: row.get::<_, i64>(1)? as u32,
                    user_count: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Page::new(results, page, window))
    }
}

fn parse_category(s: &str) -> Result<Category> {
    Category::from_str(s).map_err(StatsError::InvalidInput)
}
