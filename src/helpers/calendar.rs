use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};

/// Expand the closed range `[start, end]` into the ascending sequence of
/// working days.
///
/// Weekends, dates in `excluded` and dates the injected `is_holiday`
/// predicate flags are dropped. A start after the end is not an error, it
/// just produces an empty sequence.
pub fn eligible_days<F>(
    start: NaiveDate,
    end: NaiveDate,
    excluded: &BTreeSet<NaiveDate>,
    mut is_holiday: F,
) -> Vec<NaiveDate>
where
    F: FnMut(NaiveDate) -> bool,
{
    let mut days = Vec::new();
    let mut current = start;

    while current <= end {
        let weekend = matches!(current.weekday(), Weekday::Sat | Weekday::Sun);
        if !weekend && !excluded.contains(&current) && !is_holiday(current) {
            days.push(current);
        }

        current = match current.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    days
}
