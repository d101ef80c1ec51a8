//! Compact "last seen" age strings.

use chrono::{DateTime, Utc};

const MINUTES_PER_YEAR: i64 = 525_600;
const MINUTES_PER_MONTH: i64 = 43_800;
const MINUTES_PER_DAY: i64 = 1_440;
const MINUTES_PER_HOUR: i64 = 60;

/// Format how long ago `at` was, relative to now.
///
/// See [`age_string_at`].
pub fn age_string(at: Option<DateTime<Utc>>) -> String {
    age_string_at(at, Utc::now())
}

/// Format the age of `at` relative to `now` using the largest whole unit.
///
/// Units are `y`, `M` (months), `d`, `h` and `m` (minutes). Anything under a
/// minute renders as `< 1m`, and a missing timestamp as `?`.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use tenancy_org::age::age_string_at;
///
/// let now = Utc::now();
/// assert_eq!(age_string_at(Some(now - Duration::hours(3)), now), "3h");
/// assert_eq!(age_string_at(Some(now - Duration::days(40)), now), "1M");
/// assert_eq!(age_string_at(None, now), "?");
/// ```
pub fn age_string_at(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return "?".to_string();
    };

    let minutes = (now - at).num_minutes();

    let years = minutes / MINUTES_PER_YEAR;
    let months = minutes / MINUTES_PER_MONTH;
    let days = minutes / MINUTES_PER_DAY;
    let hours = minutes / MINUTES_PER_HOUR;

    if years > 0 {
        format!("{years}y")
    } else if months > 0 {
        format!("{months}M")
    } else if days > 0 {
        format!("{days}d")
    } else if hours > 0 {
        format!("{hours}h")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        "< 1m".to_string()
    }
}
