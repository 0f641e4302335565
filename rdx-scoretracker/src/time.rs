//! Sources of "now" and the zone-aware calendar math the scheduler builds on.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::MINUTES_PER_DAY;

/// A capability that answers "what time is it".
///
/// The tracker never reads the wall clock directly; it asks its `Clock`, which
/// lets tests pin every computation to a known instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The current instant expressed in `tz`.
    fn now_in(&self, tz: &Tz) -> DateTime<Tz> {
        self.now().with_timezone(tz)
    }
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Freezes the clock at a wall-clock reading in `tz`.
    ///
    /// Returns `None` when the reading does not exist in that zone (a DST gap).
    /// An ambiguous reading resolves to the earlier instant.
    pub fn at_local(tz: Tz, local: NaiveDateTime) -> Option<Self> {
        tz.from_local_datetime(&local)
            .earliest()
            .map(|instant| Self(instant.with_timezone(&Utc)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The first instant of `date` in `tz`.
///
/// Zones that skip midnight on a DST transition start the day at the first
/// local time that exists.
pub fn local_midnight(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..i64::from(MINUTES_PER_DAY))
        .find_map(|offset| {
            tz.from_local_datetime(&(midnight + Duration::minutes(offset)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// The next daily wake-up: today's midnight plus `cutoff_minutes` if that is
/// still ahead of `now`, otherwise the same point tomorrow.
///
/// A reading taken between midnight and the cutoff therefore targets the cutoff
/// later the same calendar day. The result is always after `now`, including on
/// days where a DST change repeats or skips the cutoff hour.
pub fn next_cutoff(now: &DateTime<Tz>, cutoff_minutes: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    let cutoff = Duration::minutes(i64::from(cutoff_minutes));
    let today = now.date_naive();
    let candidate = local_midnight(&tz, today) + cutoff;
    if *now < candidate {
        return candidate;
    }
    let tomorrow = today.succ_opt().unwrap_or(NaiveDate::MAX);
    local_midnight(&tz, tomorrow) + cutoff
}

/// Milliseconds from `from` until `to`, never less than one.
pub fn millis_until(from: &DateTime<Tz>, to: &DateTime<Tz>) -> u64 {
    let millis = to.signed_duration_since(*from).num_milliseconds();
    u64::try_from(millis).unwrap_or(0).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const NEW_YORK: Tz = Tz::America__New_York;

    fn local(date: (i32, u32, u32), time: (u32, u32)) -> DateTime<Tz> {
        NEW_YORK
            .with_ymd_and_hms(date.0, date.1, date.2, time.0, time.1, 0)
            .unwrap()
    }

    #[test]
    fn fixed_clock_reports_the_same_instant() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2015, 3, 19, 16, 0, 0).unwrap());
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now_in(&NEW_YORK), local((2015, 3, 19), (12, 0)));
    }

    #[test]
    fn fixed_clock_from_local_reading() {
        let naive = NaiveDate::from_ymd_opt(2015, 3, 19)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        let clock = FixedClock::at_local(NEW_YORK, naive).unwrap();
        assert_eq!(clock.now_in(&NEW_YORK), local((2015, 3, 19), (7, 0)));
    }

    #[test]
    fn fixed_clock_rejects_times_inside_a_dst_gap() {
        let naive = NaiveDate::from_ymd_opt(2015, 3, 8)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        assert!(FixedClock::at_local(NEW_YORK, naive).is_none());
    }

    #[test]
    fn cutoff_after_noon_targets_next_calendar_day() {
        let now = local((2015, 3, 19), (12, 0));
        assert_eq!(next_cutoff(&now, 180), local((2015, 3, 20), (3, 0)));
    }

    #[test]
    fn cutoff_late_evening_targets_next_calendar_day() {
        let now = local((2015, 3, 19), (23, 59));
        assert_eq!(next_cutoff(&now, 180), local((2015, 3, 20), (3, 0)));
    }

    #[test]
    fn cutoff_before_the_cutoff_hour_targets_later_today() {
        let now = local((2015, 3, 20), (0, 45));
        assert_eq!(next_cutoff(&now, 180), local((2015, 3, 20), (3, 0)));
    }

    #[test]
    fn cutoff_exactly_at_the_cutoff_rolls_a_full_day() {
        let now = local((2015, 3, 20), (3, 0));
        assert_eq!(next_cutoff(&now, 180), local((2015, 3, 21), (3, 0)));
    }

    #[test]
    fn zero_cutoff_is_next_midnight() {
        let now = local((2015, 3, 19), (18, 30));
        assert_eq!(next_cutoff(&now, 0), local((2015, 3, 20), (0, 0)));
    }

    #[test]
    fn cutoff_across_spring_forward_adds_elapsed_minutes() {
        // 2015-03-08 02:00 EST jumps to 03:00 EDT; three elapsed hours past
        // midnight land at 04:00 local.
        let now = local((2015, 3, 7), (20, 0));
        let wake = next_cutoff(&now, 180);
        assert_eq!(wake.hour(), 4);
        assert_eq!(wake.signed_duration_since(local((2015, 3, 8), (0, 0))), Duration::hours(3));
    }

    #[test]
    fn cutoff_during_the_repeated_fall_back_hour_is_in_the_future() {
        // 2015-11-01 02:00 EDT falls back to 01:00 EST; midnight plus three
        // elapsed hours is 02:00 EST.
        let first_pass = Utc.with_ymd_and_hms(2015, 11, 1, 6, 30, 0).unwrap().with_timezone(&NEW_YORK);
        let second_pass = Utc.with_ymd_and_hms(2015, 11, 1, 7, 30, 0).unwrap().with_timezone(&NEW_YORK);
        let after_cutoff = Utc.with_ymd_and_hms(2015, 11, 1, 7, 59, 0).unwrap().with_timezone(&NEW_YORK);

        for now in [first_pass, second_pass, after_cutoff] {
            let wake = next_cutoff(&now, 180);
            assert!(wake > now, "{now} targeted {wake}");
            assert!(millis_until(&now, &wake) > 1);
        }
        assert_eq!(next_cutoff(&second_pass, 180), local((2015, 11, 2), (3, 0)));
    }

    #[test]
    fn midnight_skipped_by_dst_starts_at_first_valid_time() {
        // Sao Paulo used to spring forward at midnight.
        let tz = Tz::America__Sao_Paulo;
        let date = NaiveDate::from_ymd_opt(2018, 11, 4).unwrap();
        let start = local_midnight(&tz, date);
        assert_eq!(start.hour(), 1);
        assert_eq!(start.minute(), 0);
    }

    #[test]
    fn millis_until_is_never_zero() {
        let now = local((2015, 3, 19), (12, 0));
        assert_eq!(millis_until(&now, &local((2015, 3, 19), (19, 0))), 7 * 3_600_000);
        assert_eq!(millis_until(&now, &now), 1);
        assert_eq!(millis_until(&now, &local((2015, 3, 19), (11, 0))), 1);
    }
}
