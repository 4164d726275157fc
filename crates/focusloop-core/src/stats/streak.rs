use chrono::NaiveDate;

/// Current and longest run of consecutive days in `days`.
///
/// `days` must be sorted ascending without duplicates. The current run only
/// counts if it reaches `today` or yesterday, so a streak survives until the
/// end of the day after the last focus day.
pub(crate) fn day_streaks(days: &[NaiveDate], today: NaiveDate) -> (u32, u32) {
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for &day in days {
        run = match prev {
            Some(p) if p.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }

    let current = match prev {
        Some(last) if last == today || last.succ_opt() == Some(today) => run,
        _ => 0,
    };
    (current, longest)
}
