//! Aggregation tests over a seeded in-memory database.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use routinely_core::types::{Category, Weekday};
use routinely_schedule::{NewActivity, ScheduleService};
use routinely_stats::{StatsAggregator, StatsError};
use routinely_users::{Gender, NewUser, UserStore};

struct Fixture {
    users: UserStore,
    service: ScheduleService,
    stats: StatsAggregator,
}

fn fixture() -> Fixture {
    let db = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
    Fixture {
        users: UserStore::new(db.clone()).unwrap(),
        service: ScheduleService::new(db.clone()).unwrap(),
        stats: StatsAggregator::new(db),
    }
}

fn register(
    users: &UserStore,
    email: &str,
    nationality: &str,
    gender: Gender,
    birthdate: &str,
) -> String {
    users
        .create(NewUser {
            name: "Test".into(),
            surname: "User".into(),
            email: email.into(),
            nationality: nationality.into(),
            birthdate: birthdate.into(),
            gender,
            timezone: None,
        })
        .unwrap()
        .id
}

fn input(start: &str, end: &str, category: &str) -> NewActivity {
    NewActivity {
        start: start.into(),
        end: end.into(),
        label: "x".into(),
        category: category.into(),
        color: None,
    }
}

fn seed_activities(service: &ScheduleService, user: &str) {
    service
        .create_activity(user, Weekday::Monday, input("07:00", "08:00", "health"))
        .unwrap();
    service
        .create_activity(user, Weekday::Monday, input("09:00", "09:30", "work"))
        .unwrap();
    service
        .create_activity(user, Weekday::Tuesday, input("10:00", "11:30", "work"))
        .unwrap();
}

#[test]
fn category_stats_sort_descending_by_total_duration() {
    let f = fixture();
    seed_activities(&f.service, "u1");

    let stats = f.stats.category_stats().unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].category, Category::Work);
    assert_eq!(stats[0].total_activities, 2);
    assert_eq!(stats[0].total_duration_minutes, 120);
    assert_eq!(stats[0].duration_per_activity, 60.0);
    assert_eq!(stats[1].category, Category::Health);
    assert_eq!(stats[1].total_duration_minutes, 60);
}

#[test]
fn category_stats_on_empty_store_is_not_found() {
    let f = fixture();
    assert!(matches!(
        f.stats.category_stats(),
        Err(StatsError::NotFound(_))
    ));
}

#[test]
fn day_stats_emit_monday_first_with_categories_by_duration() {
    let f = fixture();
    seed_activities(&f.service, "u1");

    let days = f.stats.day_stats().unwrap();
    // Only days with activities appear, in fixed weekday order.
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].day, Weekday::Monday);
    assert_eq!(days[0].total_activities, 2);
    // Within Monday: health (60) outranks work (30).
    assert_eq!(days[0].categories[0].category, Category::Health);
    assert_eq!(days[0].categories[1].category, Category::Work);
    assert_eq!(days[1].day, Weekday::Tuesday);
    assert_eq!(days[1].total_activities, 1);
}

#[test]
fn nationality_stats_split_counts_by_gender() {
    let f = fixture();
    register(&f.users, "a@x.com", "Norway", Gender::Male, "1990-01-01");
    register(&f.users, "b@x.com", "Norway", Gender::Female, "1992-05-20");
    register(&f.users, "c@x.com", "Sweden", Gender::None, "1990-07-07");

    let page = f.stats.nationality_stats(1, 10).unwrap();
    assert_eq!(page.total_results, 2);
    assert_eq!(page.results.len(), 2);

    let norway = &page.results[0];
    assert_eq!(norway.nationality, "Norway");
    assert_eq!(norway.total, 2);
    assert_eq!(norway.male, 1);
    assert_eq!(norway.female, 1);
    assert_eq!(norway.none, 0);

    let sweden = &page.results[1];
    assert_eq!(sweden.nationality, "Sweden");
    assert_eq!(sweden.none, 1);
}

#[test]
fn nationality_pagination_windows_alphabetically() {
    let f = fixture();
    register(&f.users, "a@x.com", "Chile", Gender::Male, "1990-01-01");
    register(&f.users, "b@x.com", "Austria", Gender::Male, "1990-01-01");
    register(&f.users, "c@x.com", "Brazil", Gender::Male, "1990-01-01");

    let first = f.stats.nationality_stats(1, 2).unwrap();
    let names: Vec<&str> = first.results.iter().map(|r| r.nationality.as_str()).collect();
    assert_eq!(names, ["Austria", "Brazil"]);
    assert_eq!(first.total_pages, 2);

    let second = f.stats.nationality_stats(2, 2).unwrap();
    assert_eq!(second.results[0].nationality, "Chile");

    assert!(matches!(
        f.stats.nationality_stats(3, 2),
        Err(StatsError::NotFound(_))
    ));
    assert!(matches!(
        f.stats.nationality_stats(0, 2),
        Err(StatsError::InvalidInput(_))
    ));
}

#[test]
fn birth_years_ascend() {
    let f = fixture();
    register(&f.users, "a@x.com", "Norway", Gender::Male, "1992-01-01");
    register(&f.users, "b@x.com", "Norway", Gender::Male, "1985-03-03");
    register(&f.users, "c@x.com", "Norway", Gender::Male, "1992-12-31");

    let page = f.stats.birth_year_stats(1, 10).unwrap();
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.results[0].year, 1985);
    assert_eq!(page.results[0].user_count, 1);
    assert_eq!(page.results[1].year, 1992);
    assert_eq!(page.results[1].user_count, 2);
}

#[test]
fn registration_stats_group_by_month() {
    let f = fixture();
    register(&f.users, "a@x.com", "Norway", Gender::Male, "1990-01-01");
    register(&f.users, "b@x.com", "Norway", Gender::Male, "1990-01-01");

    // Both registrations happened "now", so one (year, month) group exists.
    let page = f.stats.registration_stats(1, 10).unwrap();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].user_count, 2);
    assert!(page.results[0].month >= 1 && page.results[0].month <= 12);
}

#[test]
fn summary_counts_live_archived_and_lifetime_separately() {
    let f = fixture();
    let user = register(&f.users, "a@x.com", "Norway", Gender::Male, "1990-01-01");
    let a = f
        .service
        .create_activity(&user, Weekday::Monday, input("07:00", "07:30", "health"))
        .unwrap();
    let b = f
        .service
        .create_activity(&user, Weekday::Monday, input("08:00", "08:30", "work"))
        .unwrap();
    f.service.set_completed(&user, &a.id, true).unwrap();
    f.service.delete_activity(&user, Weekday::Monday, &b.id).unwrap();

    let summary = f.stats.summary().unwrap();
    assert_eq!(summary.total_users, 1);
    assert_eq!(summary.active_activities, 1);
    assert_eq!(summary.completed_activities, 1);
    // Lifetime counter ignores the delete.
    assert_eq!(summary.all_time_activities, 2);
    assert_eq!(summary.new_registrations_today, 1);
    assert_eq!(summary.activities_completed_today, 1);
}
