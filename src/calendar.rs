use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};

/// Whether a diary entry or a reminder falls on `day` of the given month.
///
/// Reminder instants are compared by the calendar date of their own timezone, so convert them
/// to the device timezone first. Time of day is ignored.
pub fn has_activity<Tz: TimeZone>(
    day: u32,
    diary_dates: &[NaiveDate],
    reminder_dates: &[DateTime<Tz>],
    month: u32,
    year: i32,
) -> bool {
    let Some(target) = NaiveDate::from_ymd_opt(year, month, day) else {
        return false;
    };

    diary_dates.iter().any(|date| *date == target)
        || reminder_dates
            .iter()
            .any(|instant| instant.date_naive() == target)
}

/// Days of the month that have any activity.
pub fn month_activity<Tz: TimeZone>(
    diary_dates: &[NaiveDate],
    reminder_dates: &[DateTime<Tz>],
    month: u32,
    year: i32,
) -> BTreeSet<u32> {
    let in_month = |date: &NaiveDate| date.year() == year && date.month() == month;

    diary_dates
        .iter()
        .copied()
        .chain(reminder_dates.iter().map(|instant| instant.date_naive()))
        .filter(in_month)
        .map(|date| date.day())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{FixedOffset, Utc};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn diary_entry_marks_its_day() {
        let diary = [date(2025, 11, 11)];
        let reminders: [DateTime<Utc>; 0] = [];

        assert!(has_activity(11, &diary, &reminders, 11, 2025));
        assert!(!has_activity(12, &diary, &reminders, 11, 2025));
    }

    #[test]
    fn reminder_matches_by_day_only() {
        let reminders = [Utc.with_ymd_and_hms(2025, 11, 20, 23, 59, 0).unwrap()];

        assert!(has_activity(20, &[], &reminders, 11, 2025));
        assert!(!has_activity(20, &[], &reminders, 12, 2025));
        assert!(!has_activity(20, &[], &reminders, 11, 2024));
    }

    #[test]
    fn reminder_day_follows_its_timezone() {
        let bogota = FixedOffset::west_opt(5 * 3600).unwrap();
        let late_evening = bogota.with_ymd_and_hms(2025, 11, 20, 22, 0, 0).unwrap();

        assert!(has_activity(20, &[], &[late_evening], 11, 2025));
        assert!(has_activity(21, &[], &[late_evening.with_timezone(&Utc)], 11, 2025));
    }

    #[test]
    fn impossible_day_has_no_activity() {
        let diary = [date(2025, 11, 30)];
        let reminders: [DateTime<Utc>; 0] = [];

        assert!(!has_activity(31, &diary, &reminders, 11, 2025));
        assert!(!has_activity(0, &diary, &reminders, 11, 2025));
    }

    #[test]
    fn month_projection_collects_both_sources() {
        let diary = [date(2025, 11, 11), date(2025, 10, 11), date(2025, 11, 3)];
        let reminders = [
            Utc.with_ymd_and_hms(2025, 11, 20, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 11, 11, 8, 0, 0).unwrap(),
        ];

        let days = month_activity(&diary, &reminders, 11, 2025);

        assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![3, 11, 20]);
    }
}
