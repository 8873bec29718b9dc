use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::interval::TimeInterval;
use crate::types::{Activity, ValidatedPatch};

/// The ordered, conflict-free activity list for one weekday.
///
/// Invariants held after every mutation: no two activities overlap, and the
/// list is sorted ascending by start time (stable — equal starts cannot occur
/// since they would overlap, but stability keeps the code order-preserving
/// for the remove path). Sorting happens at write time, so reads never
/// re-sort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayBucket(Vec<Activity>);

impl DayBucket {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn activities(&self) -> &[Activity] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Activity> {
        self.0.iter()
    }

    pub fn find(&self, activity_id: &str) -> Option<&Activity> {
        self.0.iter().find(|a| a.id == activity_id)
    }

    /// Append an activity if it conflicts with nothing already here.
    ///
    /// On `TimeConflict` the bucket is untouched. On success the bucket is
    /// re-sorted and a copy of the stored activity is returned.
    pub fn insert(&mut self, activity: Activity) -> Result<Activity> {
        self.check_conflict(activity.interval(), None)?;
        let stored = activity.clone();
        self.0.push(activity);
        self.sort();
        Ok(stored)
    }

    /// Apply a validated patch to the activity with `activity_id`.
    ///
    /// The patched interval is re-checked against every *other* activity;
    /// on conflict (or an inverted interval) the bucket is left unchanged.
    pub fn update(&mut self, activity_id: &str, patch: &ValidatedPatch) -> Result<Activity> {
        let idx = self
            .0
            .iter()
            .position(|a| a.id == activity_id)
            .ok_or_else(|| ScheduleError::NotFound(format!("activity {activity_id}")))?;

        let mut candidate = self.0[idx].clone();
        let start = patch.start.unwrap_or_else(|| candidate.interval().start());
        let end = patch.end.unwrap_or_else(|| candidate.interval().end());
        candidate.set_interval(TimeInterval::new(start, end)?);
        if let Some(label) = &patch.label {
            candidate.label = label.clone();
        }
        if let Some(category) = patch.category {
            candidate.category = category;
        }
        if let Some(color) = &patch.color {
            candidate.color = color.clone();
        }

        self.check_conflict(candidate.interval(), Some(activity_id))?;
        self.0[idx] = candidate.clone();
        self.sort();
        Ok(candidate)
    }

    /// Remove by id, preserving the order of the remainder.
    pub fn remove(&mut self, activity_id: &str) -> Result<Activity> {
        let idx = self
            .0
            .iter()
            .position(|a| a.id == activity_id)
            .ok_or_else(|| ScheduleError::NotFound(format!("activity {activity_id}")))?;
        Ok(self.0.remove(idx))
    }

    /// Flip the completion flag on one activity. Returns the updated copy,
    /// or None if the id is not in this bucket.
    pub fn set_completed(&mut self, activity_id: &str, completed: bool) -> Option<Activity> {
        let activity = self.0.iter_mut().find(|a| a.id == activity_id)?;
        activity.is_completed = completed;
        Some(activity.clone())
    }

    /// Bulk re-arm for the midnight reset.
    pub fn set_all_completed(&mut self, completed: bool) {
        for activity in &mut self.0 {
            activity.is_completed = completed;
        }
    }

    fn check_conflict(&self, interval: &TimeInterval, exclude_id: Option<&str>) -> Result<()> {
        let conflict = self
            .0
            .iter()
            .filter(|a| exclude_id != Some(a.id.as_str()))
            .any(|a| a.interval().overlaps(interval));
        if conflict {
            return Err(ScheduleError::TimeConflict);
        }
        Ok(())
    }

    fn sort(&mut self) {
        self.0.sort_by_key(|a| a.interval().start());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_COLOR;
    use routinely_core::types::{Category, Weekday};

    fn activity(start: &str, end: &str, label: &str) -> Activity {
        Activity::new(
            "r1",
            Weekday::Monday,
            TimeInterval::parse(start, end).unwrap(),
            label,
            Category::Health,
            DEFAULT_COLOR,
            "2026-01-05T06:00:00+00:00",
        )
    }

    fn starts(bucket: &DayBucket) -> Vec<String> {
        bucket
            .iter()
            .map(|a| a.interval().start().to_string())
            .collect()
    }

    #[test]
    fn overlapping_insert_leaves_bucket_untouched() {
        let mut bucket = DayBucket::default();
        bucket.insert(activity("07:00", "07:30", "Run")).unwrap();
        let err = bucket.insert(activity("07:15", "07:45", "Call")).unwrap_err();
        assert!(matches!(err, ScheduleError::TimeConflict));
        assert_eq!(bucket.len(), 1);
    }

    #[test]
    fn inserts_keep_bucket_sorted_by_start() {
        let mut bucket = DayBucket::default();
        bucket.insert(activity("07:00", "07:30", "a")).unwrap();
        bucket.insert(activity("08:00", "08:30", "b")).unwrap();
        bucket.insert(activity("06:00", "06:30", "c")).unwrap();
        assert_eq!(starts(&bucket), ["06:00", "07:00", "08:00"]);
    }

    #[test]
    fn update_does_not_conflict_with_itself() {
        let mut bucket = DayBucket::default();
        let a = bucket.insert(activity("07:00", "07:30", "Run")).unwrap();
        let patch = ValidatedPatch {
            category: Some(Category::Work),
            ..Default::default()
        };
        let updated = bucket.update(&a.id, &patch).unwrap();
        assert_eq!(updated.category, Category::Work);
        assert_eq!(updated.duration_minutes, 30);
    }

    #[test]
    fn update_conflicting_with_sibling_is_rejected_and_bucket_unchanged() {
        let mut bucket = DayBucket::default();
        let a = bucket.insert(activity("07:00", "07:30", "Run")).unwrap();
        bucket.insert(activity("08:00", "08:30", "Call")).unwrap();
        let patch = ValidatedPatch {
            end: Some("08:15".parse().unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            bucket.update(&a.id, &patch),
            Err(ScheduleError::TimeConflict)
        ));
        assert_eq!(bucket.find(&a.id).unwrap().duration_minutes, 30);
    }

    #[test]
    fn update_end_only_recomputes_duration() {
        let mut bucket = DayBucket::default();
        let a = bucket.insert(activity("07:00", "07:30", "Run")).unwrap();
        let patch = ValidatedPatch {
            end: Some("08:00".parse().unwrap()),
            ..Default::default()
        };
        let updated = bucket.update(&a.id, &patch).unwrap();
        assert_eq!(updated.duration_minutes, 60);
    }

    #[test]
    fn update_can_invert_interval_and_fails() {
        let mut bucket = DayBucket::default();
        let a = bucket.insert(activity("07:00", "07:30", "Run")).unwrap();
        let patch = ValidatedPatch {
            end: Some("06:00".parse().unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            bucket.update(&a.id, &patch),
            Err(ScheduleError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn update_resorts_when_start_moves() {
        let mut bucket = DayBucket::default();
        let a = bucket.insert(activity("07:00", "07:30", "Run")).unwrap();
        bucket.insert(activity("08:00", "08:30", "Call")).unwrap();
        let patch = ValidatedPatch {
            start: Some("09:00".parse().unwrap()),
            end: Some("09:30".parse().unwrap()),
            ..Default::default()
        };
        bucket.update(&a.id, &patch).unwrap();
        assert_eq!(starts(&bucket), ["08:00", "09:00"]);
    }

    #[test]
    fn remove_unknown_id_is_not_found() {
        let mut bucket = DayBucket::default();
        assert!(matches!(
            bucket.remove("nope"),
            Err(ScheduleError::NotFound(_))
        ));
    }

    #[test]
    fn remove_preserves_remaining_order() {
        let mut bucket = DayBucket::default();
        bucket.insert(activity("06:00", "06:30", "a")).unwrap();
        let b = bucket.insert(activity("07:00", "07:30", "b")).unwrap();
        bucket.insert(activity("08:00", "08:30", "c")).unwrap();
        bucket.remove(&b.id).unwrap();
        assert_eq!(starts(&bucket), ["06:00", "08:00"]);
    }

    #[test]
    fn no_overlap_after_mixed_mutations() {
        let mut bucket = DayBucket::default();
        let a = bucket.insert(activity("07:00", "07:30", "a")).unwrap();
        bucket.insert(activity("08:00", "08:30", "b")).unwrap();
        bucket.insert(activity("09:00", "09:30", "c")).unwrap();
        bucket
            .update(
                &a.id,
                &ValidatedPatch {
                    start: Some("07:30".parse().unwrap()),
                    end: Some("08:00".parse().unwrap()),
                    ..Default::default()
                },
            )
            .unwrap();

        let all = bucket.activities();
        for (i, x) in all.iter().enumerate() {
            for y in &all[i + 1..] {
                assert!(!x.interval().overlaps(y.interval()));
            }
        }
    }
}
