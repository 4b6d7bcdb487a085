//! 1900-system date serials
//!
//! Serial 1 is 1900-01-01. The 1900 system keeps Lotus 1-2-3's leap-year
//! bug: serial 60 is the non-existent 1900-02-29, so every date from
//! 1900-03-01 on is one day later than a plain day count would give.
//! The time of day is the fractional part of the serial.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn base() -> NaiveDate {
    // 1899-12-31 is serial 0
    NaiveDate::from_ymd_opt(1899, 12, 31).unwrap_or(NaiveDate::MIN)
}

/// Serial day number for `date`, `None` before 1900-01-01
pub fn date_to_serial(date: NaiveDate) -> Option<i64> {
    let days = (date - base()).num_days();
    match days {
        d if d < 1 => None,
        d if d < 60 => Some(d),
        d => Some(d + 1),
    }
}

/// Date for a whole serial day number
///
/// Returns `None` for serials below 1 and for the fictional serial 60.
pub fn serial_to_date(serial: i64) -> Option<NaiveDate> {
    let days = match serial {
        s if s < 1 || s == 60 => return None,
        s if s < 60 => s,
        s => s - 1,
    };
    base().checked_add_signed(Duration::try_days(days)?)
}

/// Fractional serial for `dt`, `None` before 1900-01-01
pub fn datetime_to_serial(dt: NaiveDateTime) -> Option<f64> {
    let day = date_to_serial(dt.date())? as f64;
    let time = dt.time();
    let millis = f64::from(time.num_seconds_from_midnight()) * 1000.0
        + f64::from(time.nanosecond() / 1_000_000);
    Some(day + millis / MILLIS_PER_DAY)
}

/// Date-time for a fractional serial, rounded to the millisecond
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let mut day = serial.floor();
    let mut millis = ((serial - day) * MILLIS_PER_DAY).round();
    if millis >= MILLIS_PER_DAY {
        day += 1.0;
        millis = 0.0;
    }
    if day > i64::MAX as f64 {
        return None;
    }
    let date = serial_to_date(day as i64)?;
    let millis = millis as u32;
    let time = NaiveTime::from_hms_milli_opt(
        millis / 3_600_000,
        millis / 60_000 % 60,
        millis / 1000 % 60,
        millis % 1000,
    )?;
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_known_serials() {
        assert_eq!(date_to_serial(date(1900, 1, 1)), Some(1));
        assert_eq!(date_to_serial(date(1900, 2, 28)), Some(59));
        assert_eq!(date_to_serial(date(1900, 3, 1)), Some(61));
        assert_eq!(date_to_serial(date(1970, 1, 1)), Some(25_569));
        assert_eq!(date_to_serial(date(2024, 3, 12)), Some(45_363));
        assert_eq!(date_to_serial(date(1899, 12, 31)), None);
    }

    #[test]
    fn test_leap_bug_serial() {
        assert_eq!(serial_to_date(59), Some(date(1900, 2, 28)));
        assert_eq!(serial_to_date(60), None);
        assert_eq!(serial_to_date(61), Some(date(1900, 3, 1)));
        assert_eq!(serial_to_date(0), None);
    }

    #[test]
    fn test_datetime_round_trip() {
        let dt = date(2024, 3, 12).and_hms_milli_opt(18, 30, 5, 125).unwrap();
        let serial = datetime_to_serial(dt).unwrap();
        assert!((serial - 45_363.770_893).abs() < 1e-6);
        assert_eq!(serial_to_datetime(serial), Some(dt));
    }

    #[test]
    fn test_rounding_up_to_next_day() {
        let serial = 45_363.0 + (MILLIS_PER_DAY - 0.1) / MILLIS_PER_DAY;
        assert_eq!(
            serial_to_datetime(serial),
            Some(date(2024, 3, 13).and_hms_opt(0, 0, 0).unwrap())
        );
    }
}
