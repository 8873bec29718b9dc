//! Full reset-path tests: service, user store and reset engine sharing one
//! in-memory database.

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use rusqlite::Connection;

use routinely_core::types::Weekday;
use routinely_reset::ResetEngine;
use routinely_schedule::{NewActivity, ScheduleService};
use routinely_users::{Gender, NewUser, UserStore};

struct Fixture {
    db: Arc<Mutex<Connection>>,
    users: UserStore,
    service: ScheduleService,
    engine: ResetEngine,
}

fn fixture() -> Fixture {
    let db = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
    Fixture {
        users: UserStore::new(db.clone()).unwrap(),
        service: ScheduleService::new(db.clone()).unwrap(),
        engine: ResetEngine::new(db.clone(), 60),
        db,
    }
}

fn register(users: &UserStore, email: &str, timezone: &str) -> String {
    users
        .create(NewUser {
            name: "Test".into(),
            surname: "User".into(),
            email: email.into(),
            nationality: "Norway".into(),
            birthdate: "1990-06-15".into(),
            gender: Gender::None,
            timezone: Some(timezone.into()),
        })
        .unwrap()
        .id
}

fn run_input() -> NewActivity {
    NewActivity {
        start: "07:00".into(),
        end: "07:30".into(),
        label: "Run".into(),
        category: "health".into(),
        color: None,
    }
}

fn archival_count(db: &Arc<Mutex<Connection>>) -> i64 {
    let conn = db.lock().unwrap();
    conn.query_row("SELECT COUNT(*) FROM completed_activities", [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn midnight_sweep_rearms_activities_and_keeps_archive() {
    let f = fixture();
    let user_id = register(&f.users, "a@example.com", "UTC");
    let activity = f
        .service
        .create_activity(&user_id, Weekday::Monday, run_input())
        .unwrap();
    f.service.set_completed(&user_id, &activity.id, true).unwrap();
    assert_eq!(archival_count(&f.db), 1);

    let midnight = Utc.with_ymd_and_hms(2026, 1, 6, 0, 0, 10).unwrap();
    let reset_users = f.engine.sweep_at(midnight).unwrap();
    assert_eq!(reset_users, 1);

    // The flag is re-armed both in the bucket and on the addressable row.
    let reread = f
        .service
        .activity(&user_id, Weekday::Monday, &activity.id)
        .unwrap();
    assert!(!reread.is_completed);
    let routine = f.service.routine(&user_id).unwrap();
    assert!(!routine.day(Weekday::Monday).activities()[0].is_completed);

    // The archival snapshot survives the reset.
    assert_eq!(archival_count(&f.db), 1);
}

#[test]
fn sweep_only_touches_users_at_their_own_midnight() {
    let f = fixture();
    let utc_user = register(&f.users, "utc@example.com", "UTC");
    let berlin_user = register(&f.users, "berlin@example.com", "Europe/Berlin");
    for user in [&utc_user, &berlin_user] {
        let a = f
            .service
            .create_activity(user, Weekday::Monday, run_input())
            .unwrap();
        f.service.set_completed(user, &a.id, true).unwrap();
    }

    // 00:00 UTC in winter is 01:00 in Berlin — only the UTC user resets.
    let utc_midnight = Utc.with_ymd_and_hms(2026, 1, 6, 0, 0, 0).unwrap();
    assert_eq!(f.engine.sweep_at(utc_midnight).unwrap(), 1);

    let utc_day = f.service.list_day(&utc_user, Weekday::Monday).unwrap();
    assert!(!utc_day[0].is_completed);
    let berlin_day = f.service.list_day(&berlin_user, Weekday::Monday).unwrap();
    assert!(berlin_day[0].is_completed);
}

#[test]
fn off_midnight_sweep_is_a_no_op() {
    let f = fixture();
    let user_id = register(&f.users, "a@example.com", "UTC");
    let a = f
        .service
        .create_activity(&user_id, Weekday::Monday, run_input())
        .unwrap();
    f.service.set_completed(&user_id, &a.id, true).unwrap();

    let noon = Utc.with_ymd_and_hms(2026, 1, 6, 12, 0, 0).unwrap();
    assert_eq!(f.engine.sweep_at(noon).unwrap(), 0);
    let day = f.service.list_day(&user_id, Weekday::Monday).unwrap();
    assert!(day[0].is_completed);
}

#[test]
fn inactive_users_are_skipped() {
    let f = fixture();
    let user_id = register(&f.users, "a@example.com", "UTC");
    let a = f
        .service
        .create_activity(&user_id, Weekday::Monday, run_input())
        .unwrap();
    f.service.set_completed(&user_id, &a.id, true).unwrap();
    f.users.set_active(&user_id, false).unwrap();

    let midnight = Utc.with_ymd_and_hms(2026, 1, 6, 0, 0, 0).unwrap();
    assert_eq!(f.engine.sweep_at(midnight).unwrap(), 0);
    let day = f.service.list_day(&user_id, Weekday::Monday).unwrap();
    assert!(day[0].is_completed);
}
