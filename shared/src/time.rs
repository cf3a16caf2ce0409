//! MSK (Europe/Moscow, fixed UTC+3) time helpers.
//!
//! Russia abolished DST in 2014, so a fixed offset is sufficient here and
//! keeps the dependency footprint at plain `chrono` (no `chrono-tz`).

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Timelike, Weekday};

/// Hours east of UTC for the institution's timezone.
pub const MSK_OFFSET_HOURS: i32 = 3;

pub fn msk_offset() -> FixedOffset {
    FixedOffset::east_opt(MSK_OFFSET_HOURS * 3600).expect("fixed offset in range")
}

/// Convert any timezone-aware timestamp to MSK.
pub fn to_msk<Tz: TimeZone>(dt: DateTime<Tz>) -> DateTime<FixedOffset> {
    dt.with_timezone(&msk_offset())
}

/// Weekday between 08:00 and 19:00 MSK, inclusive of boundary behavior matching
/// the original rules service: intervals that only touch the restricted window
/// at an endpoint still count as restricted.
///
/// Assumes `start < end`; behavior for multi-day spans is endpoint-based, not
/// exhaustive over every day in between (ported as-is from the source system).
pub fn is_restricted_daytime<Tz: TimeZone>(start: DateTime<Tz>, end: DateTime<Tz>) -> bool {
    let start = to_msk(start);
    let end = to_msk(end);

    let restricted_start = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
    let restricted_end = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
    let started_on_weekday = is_weekday(start.weekday());
    let ended_on_weekday = is_weekday(end.weekday());

    if start.date_naive() == end.date_naive() {
        if started_on_weekday {
            if start.time() <= end.time() && end.time() <= restricted_start {
                return false;
            }
            if restricted_end <= start.time() && start.time() <= end.time() {
                return false;
            }
        } else {
            return false;
        }
    } else if (!started_on_weekday || restricted_end <= start.time())
        && (!ended_on_weekday || end.time() <= restricted_start)
    {
        return false;
    }
    true
}

fn is_weekday(day: Weekday) -> bool {
    day.num_days_from_monday() <= 4
}

/// Truncate `DateTime` to midnight MSK of the same calendar day, the MSK
/// equivalent of the original's `datetime.combine(date.today(), time.min)`.
pub fn msk_midnight(dt: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    dt.date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_local_timezone(msk_offset())
        .single()
        .expect("MSK has no DST gaps")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn msk(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        msk_offset()
            .with_ymd_and_hms(y, m, d, h, mi, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn weekday_inside_working_hours_is_restricted() {
        // Tuesday 10:00-11:00
        let start = msk(2025, 3, 11, 10, 0);
        let end = start + Duration::hours(1);
        assert!(is_restricted_daytime(start, end));
    }

    #[test]
    fn weekend_is_never_restricted() {
        // Saturday 10:00-11:00
        let start = msk(2025, 3, 15, 10, 0);
        let end = start + Duration::hours(1);
        assert!(!is_restricted_daytime(start, end));
    }

    #[test]
    fn early_morning_weekday_before_8_is_unrestricted() {
        let start = msk(2025, 3, 11, 6, 0);
        let end = msk(2025, 3, 11, 7, 30);
        assert!(!is_restricted_daytime(start, end));
    }

    #[test]
    fn late_evening_weekday_after_19_is_unrestricted() {
        let start = msk(2025, 3, 11, 20, 0);
        let end = msk(2025, 3, 11, 22, 0);
        assert!(!is_restricted_daytime(start, end));
    }

    #[test]
    fn straddling_8am_boundary_is_restricted() {
        let start = msk(2025, 3, 11, 7, 30);
        let end = msk(2025, 3, 11, 8, 30);
        assert!(is_restricted_daytime(start, end));
    }

    #[test]
    fn to_msk_converts_from_other_offsets() {
        let utc = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 11, 7, 0, 0)
            .single()
            .unwrap();
        let converted = to_msk(utc);
        assert_eq!(converted.hour(), 10);
    }
}
