use routinely_core::types::Weekday;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bucket::DayBucket;

/// The seven day buckets for one user plus the lifetime counter.
///
/// One routine per user, created lazily on the first activity write.
/// `all_time_activities` counts every successful insertion and is never
/// decremented by deletes — "does this user have a routine" is answered by
/// [`Routine::has_activities`], not by the counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routine {
    /// UUIDv7 string — primary key.
    pub id: String,
    pub user_id: String,
    pub all_time_activities: u64,
    #[serde(default)]
    pub monday: DayBucket,
    #[serde(default)]
    pub tuesday: DayBucket,
    #[serde(default)]
    pub wednesday: DayBucket,
    #[serde(default)]
    pub thursday: DayBucket,
    #[serde(default)]
    pub friday: DayBucket,
    #[serde(default)]
    pub saturday: DayBucket,
    #[serde(default)]
    pub sunday: DayBucket,
}

impl Routine {
    pub fn new(user_id: &str) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            all_time_activities: 0,
            monday: DayBucket::default(),
            tuesday: DayBucket::default(),
            wednesday: DayBucket::default(),
            thursday: DayBucket::default(),
            friday: DayBucket::default(),
            saturday: DayBucket::default(),
            sunday: DayBucket::default(),
        }
    }

    pub fn day(&self, day: Weekday) -> &DayBucket {
        match day {
            Weekday::Monday => &self.monday,
            Weekday::Tuesday => &self.tuesday,
            Weekday::Wednesday => &self.wednesday,
            Weekday::Thursday => &self.thursday,
            Weekday::Friday => &self.friday,
            Weekday::Saturday => &self.saturday,
            Weekday::Sunday => &self.sunday,
        }
    }

    pub fn day_mut(&mut self, day: Weekday) -> &mut DayBucket {
        match day {
            Weekday::Monday => &mut self.monday,
            Weekday::Tuesday => &mut self.tuesday,
            Weekday::Wednesday => &mut self.wednesday,
            Weekday::Thursday => &mut self.thursday,
            Weekday::Friday => &mut self.friday,
            Weekday::Saturday => &mut self.saturday,
            Weekday::Sunday => &mut self.sunday,
        }
    }

    /// `(weekday, bucket)` pairs in fixed Monday-first order.
    pub fn days(&self) -> impl Iterator<Item = (Weekday, &DayBucket)> {
        Weekday::ALL.iter().map(move |d| (*d, self.day(*d)))
    }

    /// True when any bucket holds at least one activity.
    pub fn has_activities(&self) -> bool {
        self.days().any(|(_, bucket)| !bucket.is_empty())
    }

    /// Flip the completion flag on every activity in every bucket.
    pub fn set_all_completed(&mut self, completed: bool) {
        for day in Weekday::ALL {
            self.day_mut(day).set_all_completed(completed);
        }
    }
}
