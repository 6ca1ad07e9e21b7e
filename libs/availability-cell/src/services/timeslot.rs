// libs/availability-cell/src/services/timeslot.rs
//
// Conversions between the 12-hour display form ("H:MM AM/PM") guardians
// submit and the canonical zero-padded 24-hour form ("HH:MM:SS") every row
// stores and compares.

use std::sync::OnceLock;

use chrono::{NaiveTime, Timelike};
use regex::Regex;

use crate::models::AvailabilityError;

fn display_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2}):(\d{2})\s(AM|PM)$").expect("display time pattern is valid")
    })
}

/// Parses a 12-hour display time. Hour 12 stays 12 on PM and becomes 0 on
/// AM; hours 1-11 gain 12 on PM; minutes pass through; seconds are fixed
/// at zero.
pub fn to_24_hour(display: &str) -> Result<NaiveTime, AvailabilityError> {
    let captures = display_pattern()
        .captures(display.trim())
        .ok_or_else(|| AvailabilityError::ParseError(format!("invalid time: {}", display)))?;

    let hour: u32 = captures[1]
        .parse()
        .map_err(|_| AvailabilityError::ParseError(format!("invalid hour in: {}", display)))?;
    let minute: u32 = captures[2]
        .parse()
        .map_err(|_| AvailabilityError::ParseError(format!("invalid minute in: {}", display)))?;
    let period = &captures[3];

    if !(1..=12).contains(&hour) {
        return Err(AvailabilityError::ParseError(format!(
            "hour out of range in: {}",
            display
        )));
    }

    let hour24 = match (period, hour) {
        ("PM", 12) => 12,
        ("PM", h) => h + 12,
        ("AM", 12) => 0,
        ("AM", h) => h,
        _ => unreachable!("pattern only admits AM|PM"),
    };

    NaiveTime::from_hms_opt(hour24, minute, 0)
        .ok_or_else(|| AvailabilityError::ParseError(format!("invalid time: {}", display)))
}

/// Renders the 12-hour display form, e.g. `"9:05 AM"` or `"12:30 PM"`.
pub fn to_12_hour(time: NaiveTime) -> String {
    let (hour, minute) = (time.hour(), time.minute());
    let (display_hour, period) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };
    format!("{}:{:02} {}", display_hour, minute, period)
}

/// Parses a time in either representation: canonical `HH:MM:SS` first,
/// falling back to the 12-hour display form.
pub fn parse_time(value: &str) -> Result<NaiveTime, AvailabilityError> {
    if let Ok(time) = NaiveTime::parse_from_str(value, "%H:%M:%S") {
        return Ok(time);
    }
    to_24_hour(value)
}

/// Canonical label for a slot range. Padding is explicit `HH:MM:SS`
/// formatting on each side, not inferred from string length.
pub fn format_label(start: NaiveTime, end: NaiveTime) -> String {
    format!("{} - {}", start.format("%H:%M:%S"), end.format("%H:%M:%S"))
}

/// Normalizes a stored or requested label to canonical form, accepting
/// either representation per side. Rows written by the two historical
/// booking paths disagree on representation, so raw labels are never
/// compared directly.
pub fn normalize_label(label: &str) -> Result<String, AvailabilityError> {
    let parts: Vec<&str> = label.split(" - ").collect();
    if parts.len() != 2 {
        return Err(AvailabilityError::ParseError(format!(
            "malformed slot label: {}",
            label
        )));
    }
    let start = parse_time(parts[0].trim())?;
    let end = parse_time(parts[1].trim())?;
    if start >= end {
        return Err(AvailabilityError::InvalidSlot(format!(
            "slot start {} is not before end {}",
            start, end
        )));
    }
    Ok(format_label(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn converts_morning_times() {
        assert_eq!(to_24_hour("9:00 AM").unwrap(), t(9, 0, 0));
        assert_eq!(to_24_hour("11:45 AM").unwrap(), t(11, 45, 0));
    }

    #[test]
    fn converts_noon_and_midnight() {
        assert_eq!(to_24_hour("12:00 PM").unwrap(), t(12, 0, 0));
        assert_eq!(to_24_hour("12:00 AM").unwrap(), t(0, 0, 0));
        assert_eq!(to_24_hour("12:59 AM").unwrap(), t(0, 59, 0));
    }

    #[test]
    fn converts_afternoon_times() {
        assert_eq!(to_24_hour("1:30 PM").unwrap(), t(13, 30, 0));
        assert_eq!(to_24_hour("11:59 PM").unwrap(), t(23, 59, 0));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_matches!(to_24_hour("not a time"), Err(AvailabilityError::ParseError(_)));
        assert_matches!(to_24_hour("13:00 PM"), Err(AvailabilityError::ParseError(_)));
        assert_matches!(to_24_hour("0:30 AM"), Err(AvailabilityError::ParseError(_)));
        assert_matches!(to_24_hour("9:75 AM"), Err(AvailabilityError::ParseError(_)));
        assert_matches!(to_24_hour("9:00"), Err(AvailabilityError::ParseError(_)));
        assert_matches!(to_24_hour(""), Err(AvailabilityError::ParseError(_)));
    }

    #[test]
    fn round_trips_display_form() {
        for display in ["9:00 AM", "12:00 AM", "12:00 PM", "1:05 PM", "11:59 PM"] {
            let time = to_24_hour(display).unwrap();
            assert_eq!(to_12_hour(time), display);
        }
    }

    #[test]
    fn round_trips_every_minute_of_the_day() {
        for hour in 0..24 {
            for minute in [0, 15, 30, 59] {
                let time = t(hour, minute, 0);
                assert_eq!(to_24_hour(&to_12_hour(time)).unwrap(), time);
            }
        }
    }

    #[test]
    fn formats_canonical_labels_zero_padded() {
        assert_eq!(format_label(t(9, 0, 0), t(9, 30, 0)), "09:00:00 - 09:30:00");
        assert_eq!(format_label(t(0, 5, 0), t(13, 0, 0)), "00:05:00 - 13:00:00");
    }

    #[test]
    fn normalizes_either_representation() {
        assert_eq!(
            normalize_label("9:00 AM - 9:30 AM").unwrap(),
            "09:00:00 - 09:30:00"
        );
        assert_eq!(
            normalize_label("09:00:00 - 09:30:00").unwrap(),
            "09:00:00 - 09:30:00"
        );
        // Mixed sides occur in legacy rows too
        assert_eq!(
            normalize_label("09:00:00 - 9:30 AM").unwrap(),
            "09:00:00 - 09:30:00"
        );
    }

    #[test]
    fn rejects_inverted_or_malformed_labels() {
        assert_matches!(
            normalize_label("10:00:00 - 09:00:00"),
            Err(AvailabilityError::InvalidSlot(_))
        );
        assert_matches!(
            normalize_label("09:00:00"),
            Err(AvailabilityError::ParseError(_))
        );
        assert_matches!(
            normalize_label("banana - 09:00:00"),
            Err(AvailabilityError::ParseError(_))
        );
    }
}
