// ── Display formatting ──
//
// Pure conversions from wire encodings to the strings shown on screen.

use chrono::{Datelike, Local, NaiveDate};

use loadshed_api::PackedTime;

/// Shown in place of a slot boundary the server did not send.
pub const MISSING_TIME: &str = "??:??";

/// Format a packed time-of-day as `HH:MM`.
///
/// Absent values render as [`MISSING_TIME`]. Zero is a real hour
/// (midnight), not a missing value. A missing minute component reads as
/// `00`; components past the minute (seconds) are ignored.
pub fn format_time(value: Option<&PackedTime>) -> String {
    match value {
        None => MISSING_TIME.to_owned(),
        Some(PackedTime::Hour(hour)) => format!("{hour:02}:00"),
        Some(PackedTime::Parts(parts)) => match parts.as_slice() {
            [] => MISSING_TIME.to_owned(),
            [hour] => format!("{hour:02}:00"),
            [hour, minute, ..] => format!("{hour:02}:{minute:02}"),
        },
        Some(PackedTime::Text(text)) => format_text_time(text),
    }
}

/// `"h,m"` or `"h:m"`, each component left-padded with zeros.
fn format_text_time(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return MISSING_TIME.to_owned();
    }

    let mut parts = text.split([',', ':']).map(str::trim);
    let hour = parts.next().unwrap_or_default();
    let minute = parts.next().unwrap_or_default();
    format!("{}:{}", pad2(hour), pad2(minute))
}

fn pad2(component: &str) -> String {
    format!("{component:0>2}")
}

/// `"<start> - <end>"` for one schedule slot.
pub fn format_slot_range(start: Option<&PackedTime>, end: Option<&PackedTime>) -> String {
    format!("{} - {}", format_time(start), format_time(end))
}

/// Day header date: `D/M/YYYY`, no zero padding.
pub fn format_day_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// Calendar dates for `count` consecutive days starting at `start`.
///
/// Each date is the previous one plus a day; a date past the end of the
/// calendar repeats the last representable one.
pub fn day_dates(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut current = start;
    for _ in 0..count {
        dates.push(current);
        current = current.succ_opt().unwrap_or(current);
    }
    dates
}

/// The current local date-time, formatted for the "last updated" readout.
pub fn timestamp_now() -> String {
    Local::now().format("%-d/%-m/%Y, %H:%M:%S").to_string()
}

/// Today's local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
