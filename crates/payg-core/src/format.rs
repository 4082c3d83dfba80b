//! Human-granularity durations for reminder and unlock messages.
//!
//! Seconds under a minute, minutes under two hours, hours and minutes under
//! a day, then days and hours. Sub-unit remainders are truncated, never
//! rounded up.

const SECS_PER_MINUTE: u64 = 60;
const MINUTES_PER_HOUR: u64 = 60;
const HOURS_PER_DAY: u64 = 24;

/// Show minutes (not hours) until this many minutes.
const MINUTES_ONLY_BELOW: u64 = 120;

/// Format `seconds` at the precision a person wants to read.
///
/// ```
/// use payg_core::format::time_to_string;
///
/// assert_eq!(time_to_string(45), "45 seconds");
/// assert_eq!(time_to_string(8640), "2 hours 24 minutes");
/// assert_eq!(time_to_string(115200), "1 day 8 hours");
/// ```
pub fn time_to_string(seconds: u64) -> String {
    if seconds < SECS_PER_MINUTE {
        return count(seconds, "second", "seconds");
    }

    let minutes = seconds / SECS_PER_MINUTE;
    if minutes < MINUTES_ONLY_BELOW {
        return count(minutes, "minute", "minutes");
    }

    let hours = minutes / MINUTES_PER_HOUR;
    if hours < HOURS_PER_DAY {
        return with_remainder(
            count(hours, "hour", "hours"),
            minutes % MINUTES_PER_HOUR,
            "minute",
            "minutes",
        );
    }

    let days = hours / HOURS_PER_DAY;
    with_remainder(
        count(days, "day", "days"),
        hours % HOURS_PER_DAY,
        "hour",
        "hours",
    )
}

/// English singular/plural selection. Translation catalogs plug in here.
pub fn plural<'a>(n: u64, singular: &'a str, plural: &'a str) -> &'a str {
    if n == 1 {
        singular
    } else {
        plural
    }
}

fn count(n: u64, singular: &str, plural_form: &str) -> String {
    format!("{n} {}", plural(n, singular, plural_form))
}

fn with_remainder(head: String, rest: u64, singular: &str, plural_form: &str) -> String {
    if rest == 0 {
        head
    } else {
        format!("{head} {}", count(rest, singular, plural_form))
    }
}
