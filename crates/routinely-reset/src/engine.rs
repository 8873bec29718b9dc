use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rusqlite::Connection;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::Result;

/// True when `now` rendered in `zone` reads `00:00`.
///
/// Zone names that do not resolve fall back to UTC, so a user with a
/// corrupted zone still gets re-armed once a day rather than never.
pub fn is_local_midnight(now: DateTime<Utc>, zone: &str) -> bool {
    let tz: Tz = match zone.parse() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(zone, "unknown timezone; falling back to UTC");
            chrono_tz::UTC
        }
    };
    now.with_timezone(&tz).format("%H:%M").to_string() == "00:00"
}

/// Drives the nightly completion re-arm on a fixed tick, independent of
/// request traffic.
///
/// The tick cadence should match the one-minute resolution of the midnight
/// check (config: `engine.reset_tick_secs`). The engine holds only a store
/// handle — no process-wide state.
pub struct ResetEngine {
    db: Arc<Mutex<Connection>>,
    tick_secs: u64,
}

impl ResetEngine {
    pub fn new(db: Arc<Mutex<Connection>>, tick_secs: u64) -> Self {
        Self {
            db,
            tick_secs: tick_secs.max(1),
        }
    }

    /// Main loop. Ticks until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_secs = self.tick_secs, "reset engine started");

        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.tick_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_at(Utc::now()) {
                        error!("reset sweep error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("reset engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One sweep over all active users at instant `now`. Returns how many
    /// users were re-armed. Split out from the loop so the midnight logic is
    /// drivable with a pinned clock.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.db.lock().unwrap();
        let targets = routinely_users::db::active_timezones(&conn)?;

        let now_str = now.to_rfc3339();
        let mut reset_users = 0;
        for (user_id, zone) in targets {
            if !is_local_midnight(now, &zone) {
                continue;
            }
            // One failing user must not starve the rest of the sweep.
            match routinely_schedule::db::reset_completed_for_user(&conn, &user_id, &now_str) {
                Ok(count) => {
                    reset_users += 1;
                    info!(%user_id, %zone, count, "activities re-armed at local midnight");
                }
                Err(e) => error!(%user_id, "reset failed: {e}"),
            }
        }
        Ok(reset_users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn utc_midnight_matches_only_the_zero_minute() {
        let midnight = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 30).unwrap();
        assert!(is_local_midnight(midnight, "UTC"));
        let one_past = Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap();
        assert!(!is_local_midnight(one_past, "UTC"));
    }

    #[test]
    fn offset_zones_hit_midnight_at_their_own_hour() {
        // 23:00 UTC in winter is 00:00 in Berlin (CET, +01:00).
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 23, 0, 0).unwrap();
        assert!(is_local_midnight(now, "Europe/Berlin"));
        assert!(!is_local_midnight(now, "UTC"));
    }

    #[test]
    fn unknown_zone_falls_back_to_utc() {
        let midnight = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(is_local_midnight(midnight, "Mars/Olympus_Mons"));
    }
}
