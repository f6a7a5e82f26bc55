//! RFC 3339 date/time formatting for literal values.
//!
//! Converts internal temporal representations into their literal text:
//! - Date: days since Unix epoch (1970-01-01), no offset
//! - TimeOfDay: microseconds since midnight, no offset
//! - DateTimeOffset: microseconds since Unix epoch plus offset in minutes
//! - Duration: signed microseconds as an ISO 8601 duration

const MICROSECONDS_PER_SECOND: i64 = 1_000_000;
const MICROSECONDS_PER_MINUTE: i64 = 60 * MICROSECONDS_PER_SECOND;
const MICROSECONDS_PER_HOUR: i64 = 60 * MICROSECONDS_PER_MINUTE;
const MICROSECONDS_PER_DAY: i64 = 24 * MICROSECONDS_PER_HOUR;

/// Formats an offset in minutes as a timezone string (Z, +HH:MM, -HH:MM).
fn format_timezone_offset(offset_min: i16) -> String {
    if offset_min == 0 {
        return "Z".to_string();
    }

    let sign = if offset_min >= 0 { '+' } else { '-' };
    let abs_offset = offset_min.unsigned_abs();
    format!("{}{:02}:{:02}", sign, abs_offset / 60, abs_offset % 60)
}

/// Formats microseconds as fractional seconds, omitting if zero.
fn format_fractional_seconds(us: i64) -> String {
    if us == 0 {
        return String::new();
    }

    let digits = format!("{:06}", us);
    format!(".{}", digits.trim_end_matches('0'))
}

/// Converts days since Unix epoch to (year, month, day).
fn days_to_date(days: i32) -> (i32, u32, u32) {
    // Howard Hinnant's civil_from_days
    let z = days as i64 + 719468;
    let era = z.div_euclid(146097);
    let doe = z.rem_euclid(146097) as u32; // day of era
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // year of era
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year
    let mp = (5 * doy + 2) / 153; // month index
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };

    let year = if m <= 2 { y + 1 } else { y } as i32;
    (year, m, d)
}

fn format_clock(time_micros: i64) -> String {
    let hours = time_micros / MICROSECONDS_PER_HOUR;
    let minutes = (time_micros % MICROSECONDS_PER_HOUR) / MICROSECONDS_PER_MINUTE;
    let seconds = (time_micros % MICROSECONDS_PER_MINUTE) / MICROSECONDS_PER_SECOND;
    let frac = format_fractional_seconds(time_micros % MICROSECONDS_PER_SECOND);
    format!("{:02}:{:02}:{:02}{}", hours, minutes, seconds, frac)
}

/// Formats days since Unix epoch as `YYYY-MM-DD`.
pub fn format_date(days: i32) -> String {
    let (year, month, day) = days_to_date(days);
    format!("{:04}-{:02}-{:02}", year, month, day)
}

/// Formats microseconds since midnight as `HH:MM:SS[.ffffff]`.
///
/// Values outside one day wrap around midnight.
pub fn format_time_of_day(time_micros: i64) -> String {
    format_clock(time_micros.rem_euclid(MICROSECONDS_PER_DAY))
}

/// Local time in microseconds for an instant observed at `offset_min`.
///
/// Returns `None` when the shifted instant leaves the `i64` range.
pub fn local_micros(epoch_micros: i64, offset_min: i16) -> Option<i64> {
    epoch_micros.checked_add(i64::from(offset_min) * MICROSECONDS_PER_MINUTE)
}

/// Formats microseconds since Unix epoch in the given offset.
///
/// Returns `None` when the local time is not representable.
pub fn format_datetime_offset(epoch_micros: i64, offset_min: i16) -> Option<String> {
    let local_us = local_micros(epoch_micros, offset_min)?;
    let days = local_us.div_euclid(MICROSECONDS_PER_DAY) as i32;
    let time_micros = local_us.rem_euclid(MICROSECONDS_PER_DAY);

    Some(format!(
        "{}T{}{}",
        format_date(days),
        format_clock(time_micros),
        format_timezone_offset(offset_min)
    ))
}

/// Formats a signed duration in microseconds as `[-]PnDTnHnMn[.f]S`.
pub fn format_duration(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs() as i128;
    let day = MICROSECONDS_PER_DAY as i128;
    let hour = MICROSECONDS_PER_HOUR as i128;
    let minute = MICROSECONDS_PER_MINUTE as i128;
    let second = MICROSECONDS_PER_SECOND as i128;

    let days = abs / day;
    let hours = (abs % day) / hour;
    let minutes = (abs % hour) / minute;
    let seconds = (abs % minute) / second;
    let frac = format_fractional_seconds((abs % second) as i64);

    format!(
        "{}P{}DT{}H{}M{}{}S",
        sign, days, hours, minutes, seconds, frac
    )
}
