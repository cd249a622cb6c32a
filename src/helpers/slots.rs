use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::ConfigError;
use crate::models::entry::TimeInterval;

/// Split a working day into the two intervals around its break.
///
/// The start time is drawn uniformly from `start_options` using the injected
/// generator so runs are reproducible under a fixed seed. The break sits on
/// the midpoint of the working span, rounded to the nearest minute. A span
/// that cannot fit the break is a configuration error, never clamped.
pub fn generate_slots<R: Rng>(
    day: NaiveDate,
    start_options: &[NaiveTime],
    end_time: NaiveTime,
    break_minutes: i64,
    timezone: Tz,
    rng: &mut R,
) -> Result<(TimeInterval, TimeInterval), ConfigError> {
    let start = *start_options.choose(rng).ok_or(ConfigError::NoStartOptions)?;

    let utc_start = to_utc(day, start, timezone)?;
    let utc_end = to_utc(day, end_time, timezone)?;

    let span = utc_end - utc_start;
    if span <= Duration::minutes(break_minutes) {
        return Err(ConfigError::DayTooShort {
            day,
            start,
            break_minutes,
        });
    }

    // Midpoint of the span, rounded to the nearest minute.
    let half_minutes = (span.num_seconds() + 60) / 120;
    let midpoint = utc_start + Duration::minutes(half_minutes);

    let break_start = midpoint - Duration::seconds(break_minutes * 30);
    let break_end = break_start + Duration::minutes(break_minutes);

    // Rounding can still push the break against either edge.
    if break_start <= utc_start || break_end >= utc_end {
        return Err(ConfigError::DayTooShort {
            day,
            start,
            break_minutes,
        });
    }

    debug!(
        "Slots for {}: start {}, break {} - {}, end {}",
        day, start, break_start, break_end, end_time
    );

    Ok((
        TimeInterval {
            start: utc_start,
            end: break_start,
        },
        TimeInterval {
            start: break_end,
            end: utc_end,
        },
    ))
}

/// Anchor a local wall-clock time on `day` and convert it to UTC.
///
/// Times that do not exist (or exist twice) because of a DST transition are
/// rejected rather than silently resolved.
fn to_utc(day: NaiveDate, time: NaiveTime, timezone: Tz) -> Result<DateTime<Utc>, ConfigError> {
    timezone
        .from_local_datetime(&day.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or(ConfigError::InvalidLocalTime {
            day,
            time,
            timezone,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, h, m, 0).unwrap()
    }

    #[test]
    fn break_sits_on_the_midpoint() {
        let mut rng = Mcg128Xsl64::seed_from_u64(7);

        let (before, after) = generate_slots(
            day(),
            &[time(13, 30)],
            time(23, 30),
            30,
            chrono_tz::UTC,
            &mut rng,
        )
        .unwrap();

        assert_eq!(before.start, utc(13, 30));
        assert_eq!(before.end, utc(18, 15));
        assert_eq!(after.start, utc(18, 45));
        assert_eq!(after.end, utc(23, 30));
    }

    #[test]
    fn intervals_are_ordered_and_non_empty_for_all_options() {
        let options = [time(11, 0), time(11, 30), time(12, 0)];
        let mut rng = Mcg128Xsl64::seed_from_u64(42);

        for _ in 0..100 {
            let (before, after) =
                generate_slots(day(), &options, time(21, 0), 30, chrono_tz::UTC, &mut rng).unwrap();

            assert!(before.start < before.end);
            assert!(after.start < after.end);
            assert!(before.end < after.start);
            assert_eq!(after.start - before.end, Duration::minutes(30));
            assert!(options.contains(&before.start.with_timezone(&chrono_tz::UTC).time()));
            assert_eq!(after.end, utc(21, 0));
        }
    }

    #[test]
    fn local_times_convert_through_the_timezone() {
        let mut rng = Mcg128Xsl64::seed_from_u64(1);

        // Berlin is UTC+2 on 2025-05-01.
        let (before, after) = generate_slots(
            day(),
            &[time(11, 0)],
            time(21, 0),
            30,
            chrono_tz::Europe::Berlin,
            &mut rng,
        )
        .unwrap();

        assert_eq!(before.start, utc(9, 0));
        assert_eq!(after.end, utc(19, 0));
    }

    #[test]
    fn span_shorter_than_break_is_fatal() {
        let mut rng = Mcg128Xsl64::seed_from_u64(1);

        let result = generate_slots(
            day(),
            &[time(20, 45)],
            time(21, 0),
            30,
            chrono_tz::UTC,
            &mut rng,
        );

        assert!(matches!(result, Err(ConfigError::DayTooShort { .. })));
    }

    #[test]
    fn span_barely_over_break_still_needs_room_on_both_sides() {
        let mut rng = Mcg128Xsl64::seed_from_u64(1);

        // 31 minutes of span around a 30 minute break leaves no usable
        // second interval once the midpoint is rounded.
        let result = generate_slots(
            day(),
            &[time(20, 29)],
            time(21, 0),
            30,
            chrono_tz::UTC,
            &mut rng,
        );

        assert!(matches!(result, Err(ConfigError::DayTooShort { .. })));
    }

    #[test]
    fn empty_start_options_are_rejected() {
        let mut rng = Mcg128Xsl64::seed_from_u64(1);

        let result = generate_slots(day(), &[], time(21, 0), 30, chrono_tz::UTC, &mut rng);

        assert!(matches!(result, Err(ConfigError::NoStartOptions)));
    }

    #[test]
    fn fixed_seed_fixes_the_start_choice() {
        let options = [time(11, 0), time(11, 30), time(12, 0)];

        let mut first_rng = Mcg128Xsl64::seed_from_u64(99);
        let mut second_rng = Mcg128Xsl64::seed_from_u64(99);

        for _ in 0..20 {
            let first =
                generate_slots(day(), &options, time(21, 0), 30, chrono_tz::UTC, &mut first_rng)
                    .unwrap();
            let second =
                generate_slots(day(), &options, time(21, 0), 30, chrono_tz::UTC, &mut second_rng)
                    .unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn nonexistent_local_time_is_rejected() {
        let mut rng = Mcg128Xsl64::seed_from_u64(1);

        // Berlin skips 02:00-03:00 on 2025-03-30.
        let result = generate_slots(
            NaiveDate::from_ymd_opt(2025, 3, 30).unwrap(),
            &[time(2, 30)],
            time(21, 0),
            30,
            chrono_tz::Europe::Berlin,
            &mut rng,
        );

        assert!(matches!(result, Err(ConfigError::InvalidLocalTime { .. })));
    }
}
