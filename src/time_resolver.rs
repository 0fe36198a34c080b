use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike,
};

use crate::error::ReminderError;

/// Parses a strict 24-hour `HH:MM` string.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime, ReminderError> {
    let invalid = || ReminderError::invalid_input("time", format!("\"{input}\" is not in HH:MM format"));

    let (hours, minutes) = input.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 {
        return Err(ReminderError::invalid_input("time", format!("hour {hours} is out of range 00-23")));
    }
    if minutes > 59 {
        return Err(ReminderError::invalid_input("time", format!("minute {minutes} is out of range 00-59")));
    }

    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// Resolves a day of the current month and an `HH:MM` string into the next instant to fire at.
///
/// Input comes from a bare text field, so "02:19" typed in the afternoon usually means 14:19.
/// When the candidate is already past, the time is shifted by twelve hours and adopted if that
/// lands in the future on the same day. This is a guess at the user's intent, not a guarantee:
/// an entry that really is overdue may be moved to the evening. When the guess does not apply
/// the error carries the 24-hour suggestion for hours before noon.
pub fn resolve(
    day_of_month: u32,
    time_of_day: &str,
    now: NaiveDateTime,
) -> Result<NaiveDateTime, ReminderError> {
    let time = parse_time_of_day(time_of_day)?;
    let date = day_in_current_month(day_of_month, now)?;

    let candidate = date.and_time(time);
    let now = floor_to_minute(now);
    if candidate > now {
        return Ok(candidate);
    }

    let shifted = candidate + TimeDelta::hours(12);
    if shifted > now && shifted.date() == candidate.date() {
        log::info!(
            "Requested time {} already passed, assuming {}",
            candidate.format("%H:%M"),
            shifted.format("%H:%M")
        );
        return Ok(shifted);
    }

    let suggestion =
        (time.hour() < 12).then(|| format!("{:02}:{:02}", time.hour() + 12, time.minute()));
    Err(ReminderError::PastTime { suggestion })
}

/// Fire instant for the "remind me in N seconds" shortcut. No correction is needed.
pub fn resolve_quick<Tz: TimeZone>(
    now: DateTime<Tz>,
    seconds: u32,
) -> Result<DateTime<Tz>, ReminderError> {
    if seconds == 0 {
        return Err(ReminderError::invalid_input("seconds", "must be at least 1"));
    }

    Ok(now + TimeDelta::seconds(i64::from(seconds)))
}

/// Next occurrence of a daily time: today if still ahead, otherwise exactly one day later.
pub fn next_daily_occurrence(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let time = time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time);
    let today = now.date().and_time(time);
    if today > floor_to_minute(now) {
        today
    } else {
        today + TimeDelta::days(1)
    }
}

/// Pins a wall-clock time to the device timezone. Times skipped by a DST jump are rejected.
pub fn to_local_instant<Tz: TimeZone>(
    tz: &Tz,
    local: NaiveDateTime,
) -> Result<DateTime<Tz>, ReminderError> {
    tz.from_local_datetime(&local).earliest().ok_or_else(|| {
        ReminderError::invalid_input(
            "time",
            format!("{} does not exist in the device timezone", local.format("%Y-%m-%d %H:%M")),
        )
    })
}

fn day_in_current_month(day_of_month: u32, now: NaiveDateTime) -> Result<NaiveDate, ReminderError> {
    if !(1..=31).contains(&day_of_month) {
        return Err(ReminderError::invalid_input(
            "day",
            format!("{day_of_month} is out of range 1-31"),
        ));
    }

    NaiveDate::from_ymd_opt(now.year(), now.month(), day_of_month).ok_or_else(|| {
        ReminderError::invalid_input(
            "day",
            format!("{day_of_month} does not exist in {}", now.format("%Y-%m")),
        )
    })
}

fn floor_to_minute(instant: NaiveDateTime) -> NaiveDateTime {
    instant
        .with_second(0)
        .and_then(|i| i.with_nanosecond(0))
        .unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use proptest::prelude::*;
    use proptest_arbitrary_interop::arb;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    pub fn morning_time_typed_in_the_afternoon_is_shifted_to_the_evening() {
        let now = at(15, 14, 18);

        let resolved = resolve(15, "02:19", now).unwrap();

        assert_eq!(resolved, at(15, 14, 19));
    }

    #[test]
    pub fn future_time_is_returned_unchanged() {
        let now = at(15, 9, 0);

        assert_eq!(resolve(15, "10:30", now).unwrap(), at(15, 10, 30));
        assert_eq!(resolve(20, "07:00", now).unwrap(), at(20, 7, 0));
    }

    #[test]
    pub fn afternoon_time_already_passed_fails_without_suggestion() {
        let now = at(15, 20, 0);

        let error = resolve(15, "14:00", now).unwrap_err();

        assert_eq!(error, ReminderError::PastTime { suggestion: None });
    }

    #[test]
    pub fn morning_time_passed_twice_suggests_the_evening_time() {
        let now = at(15, 22, 0);

        let error = resolve(15, "09:05", now).unwrap_err();

        assert_eq!(
            error,
            ReminderError::PastTime {
                suggestion: Some("21:05".to_string())
            }
        );
    }

    #[test]
    pub fn earlier_day_of_month_is_in_the_past() {
        let now = at(15, 8, 0);

        let error = resolve(14, "23:00", now).unwrap_err();

        assert!(matches!(error, ReminderError::PastTime { .. }));
    }

    #[test]
    pub fn current_minute_counts_as_passed() {
        let now = at(15, 14, 19) + TimeDelta::seconds(30);

        let error = resolve(15, "14:19", now).unwrap_err();

        assert!(matches!(error, ReminderError::PastTime { .. }));
    }

    #[test]
    pub fn malformed_time_strings_are_rejected() {
        let now = at(15, 0, 0);
        for input in ["25:00", "9:5", "", "12:60", "ab:cd", "12:345", " 12:30", "12-30", "+1:30"] {
            let error = resolve(20, input, now).unwrap_err();
            assert!(
                matches!(error, ReminderError::InvalidInput { field: "time", .. }),
                "input = {input:?}, error = {error:?}"
            );
        }
    }

    #[test]
    pub fn day_outside_month_is_rejected() {
        let now = at(15, 0, 0);

        for day in [0, 31, 32] {
            let error = resolve(day, "10:00", now).unwrap_err();
            assert!(
                matches!(error, ReminderError::InvalidInput { field: "day", .. }),
                "day = {day}, error = {error:?}"
            );
        }
    }

    #[test]
    pub fn quick_reminder_adds_seconds() {
        let now = chrono::Utc::now();

        assert_eq!(resolve_quick(now, 5).unwrap(), now + TimeDelta::seconds(5));
        assert!(resolve_quick(now, 0).is_err());
    }

    #[test]
    pub fn daily_occurrence_rolls_forward_once() {
        let now = at(15, 12, 0);

        assert_eq!(
            next_daily_occurrence(NaiveTime::from_hms_opt(13, 0, 0).unwrap(), now),
            at(15, 13, 0)
        );
        assert_eq!(
            next_daily_occurrence(NaiveTime::from_hms_opt(11, 0, 0).unwrap(), now),
            at(16, 11, 0)
        );
    }

    #[test]
    pub fn local_instant_rejects_dst_gap() {
        let tz = chrono_tz::Europe::Madrid;
        let gap = NaiveDate::from_ymd_opt(2025, 3, 30)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();

        assert!(to_local_instant(&tz, gap).is_err());
        assert!(to_local_instant(&tz, at(15, 10, 0)).is_ok());
    }

    fn now_strategy() -> impl Strategy<Value = NaiveDateTime> {
        (2000..2100i32, 1..=12u32, 1..=28u32, 0..24u32, 0..60u32, 0..60u32).prop_map(
            |(year, month, day, hour, minute, second)| {
                NaiveDate::from_ymd_opt(year, month, day)
                    .unwrap()
                    .and_hms_opt(hour, minute, second)
                    .unwrap()
            },
        )
    }

    proptest! {
        #[test]
        fn future_candidates_are_not_modified(
            now in now_strategy(),
            day in 1..=28u32,
            hour in 0..24u32,
            minute in 0..60u32,
        ) {
            let candidate = now.date().with_day(day).unwrap().and_hms_opt(hour, minute, 0).unwrap();
            prop_assume!(candidate > floor_to_minute(now));

            let resolved = resolve(day, &format!("{hour:02}:{minute:02}"), now).unwrap();

            prop_assert_eq!(resolved, candidate);
        }

        #[test]
        fn past_morning_candidates_shift_by_twelve_hours(
            date in now_strategy().prop_map(|now| now.date()),
            candidate_minute in 0..12 * 60u32,
            elapsed in 0..12 * 60u32,
            second in 0..60u32,
        ) {
            // Now lies less than twelve hours after a morning candidate on the same day.
            let now_minute = candidate_minute + elapsed;
            let now = date.and_hms_opt(now_minute / 60, now_minute % 60, second).unwrap();
            let (hour, minute) = (candidate_minute / 60, candidate_minute % 60);
            let candidate = date.and_hms_opt(hour, minute, 0).unwrap();

            let resolved = resolve(now.day(), &format!("{hour:02}:{minute:02}"), now).unwrap();

            prop_assert_eq!(resolved, candidate + TimeDelta::hours(12));
            prop_assert_eq!(resolved.date(), date);
        }

        #[test]
        fn uncorrectable_candidates_fail_with_past_time(
            now in now_strategy(),
            day in 1..=28u32,
            hour in 0..24u32,
            minute in 0..60u32,
        ) {
            let candidate = now.date().with_day(day).unwrap().and_hms_opt(hour, minute, 0).unwrap();
            let shifted = candidate + TimeDelta::hours(12);
            prop_assume!(candidate <= floor_to_minute(now));
            prop_assume!(shifted <= floor_to_minute(now) || shifted.date() != candidate.date());

            let error = resolve(day, &format!("{hour:02}:{minute:02}"), now).unwrap_err();

            let is_past_time = matches!(error, ReminderError::PastTime { .. });
            prop_assert!(is_past_time);
        }

        #[test]
        fn daily_occurrence_is_within_a_day(
            now in arb::<NaiveDateTime>(),
            time in arb::<NaiveTime>(),
        ) {
            let time = time.with_second(0).unwrap().with_nanosecond(0).unwrap();
            prop_assume!(now.date() < NaiveDate::MAX.pred_opt().unwrap());

            let next = next_daily_occurrence(time, now);

            prop_assert!(next > now, "Next occurrence should be in the future");
            prop_assert_eq!(next.time(), time);
            prop_assert!(next - now <= TimeDelta::days(1));
        }
    }
}
