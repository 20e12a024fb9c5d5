//! Utility functions shared by backup components

use crate::error::{Error, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::warn;

pub const US_PER_MS: i64 = 1_000;
pub const US_PER_SEC: i64 = 1_000 * US_PER_MS;
pub const US_PER_MIN: i64 = 60 * US_PER_SEC;
pub const US_PER_HOUR: i64 = 60 * US_PER_MIN;
pub const US_PER_DAY: i64 = 24 * US_PER_HOUR;

/// Marker that precedes the numeric suffix of an in-flight temporary file
pub const TMP_FILE_MARK: &str = ".tmp.";

/// Current wall clock time in microseconds since the Unix epoch
pub fn now_us() -> i64 {
    Utc::now().timestamp_micros()
}

/// Render a duration in microseconds with the largest whole unit that fits.
///
/// `90_000_000` renders as `"1m"`; the remainder is truncated.
pub fn timestamp_to_timestr(ts_us: i64) -> Result<String> {
    if ts_us <= 0 {
        return Err(Error::invalid_argument(format!("invalid ts {}", ts_us)));
    }
    let rendered = if ts_us >= US_PER_DAY {
        format!("{}d", ts_us / US_PER_DAY)
    } else if ts_us >= US_PER_HOUR {
        format!("{}h", ts_us / US_PER_HOUR)
    } else if ts_us >= US_PER_MIN {
        format!("{}m", ts_us / US_PER_MIN)
    } else if ts_us >= US_PER_SEC {
        format!("{}s", ts_us / US_PER_SEC)
    } else if ts_us >= US_PER_MS {
        format!("{}ms", ts_us / US_PER_MS)
    } else {
        format!("{}us", ts_us)
    };
    Ok(rendered)
}

/// Parse a duration string such as `"1d"`, `"120s"` or `"500ms"` into microseconds.
///
/// A bare number is taken as microseconds. Units are case-insensitive.
pub fn parse_time_us(value: &str) -> Result<i64> {
    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(Error::invalid_argument(format!(
            "invalid time string: {:?}",
            value
        )));
    }
    let amount: i64 = digits
        .parse()
        .map_err(|_| Error::invalid_argument(format!("invalid time string: {:?}", value)))?;
    let scale = match unit.to_ascii_lowercase().as_str() {
        "" | "us" => 1,
        "ms" => US_PER_MS,
        "s" => US_PER_SEC,
        "m" => US_PER_MIN,
        "h" => US_PER_HOUR,
        "d" => US_PER_DAY,
        other => {
            return Err(Error::invalid_argument(format!(
                "unknown time unit {:?} in {:?}",
                other, value
            )))
        }
    };
    amount
        .checked_mul(scale)
        .ok_or_else(|| Error::invalid_argument(format!("time string overflows: {:?}", value)))
}

fn local_datetime(ts_us: i64) -> Result<DateTime<Local>> {
    Local
        .timestamp_micros(ts_us)
        .single()
        .ok_or_else(|| Error::invalid_argument(format!("ts {} is not a valid local time", ts_us)))
}

/// Convert a timestamp in microseconds to a `YYYYMMDD` integer in local time
pub fn timestamp_to_date(ts_us: i64) -> Result<i64> {
    if ts_us <= 0 {
        return Err(Error::invalid_argument(format!("invalid ts {}", ts_us)));
    }
    let date = local_datetime(ts_us)?.format("%Y%m%d").to_string();
    date.parse()
        .map_err(|_| Error::unexpected(format!("failed to parse date {}", date)))
}

/// Format a timestamp in seconds as `%Y%m%d<concat>%H%M%S` in local time
pub fn backup_time_to_strftime(ts_secs: i64, concat: char) -> Result<String> {
    let ts_us = ts_secs
        .checked_mul(US_PER_SEC)
        .ok_or_else(|| Error::invalid_argument(format!("invalid ts {}", ts_secs)))?;
    let time = local_datetime(ts_us)?;
    Ok(format!(
        "{}{}{}",
        time.format("%Y%m%d"),
        concat,
        time.format("%H%M%S")
    ))
}

/// Whether `file_name` is an in-flight temporary file (`<name>.tmp.<digits>`)
pub fn is_tmp_file(file_name: &str) -> bool {
    match file_name.find(TMP_FILE_MARK) {
        None => false,
        Some(pos) => {
            let suffix = &file_name[pos + TMP_FILE_MARK.len()..];
            !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit())
        }
    }
}

/// Strip trailing `/` characters from a path
pub fn trim_right_slash(path: &str) -> &str {
    path.trim_end_matches('/')
}

/// Check a user supplied password against the stored password array.
///
/// An empty password always passes.
pub fn check_passwd(passwd_array: &str, passwd: &str) -> Result<()> {
    if passwd.is_empty() || passwd_array.contains(passwd) {
        Ok(())
    } else {
        warn!("Backup password does not match");
        Err(Error::BackupInvalidPassword)
    }
}

/// Deadline tracker used by job scheduling code around backup operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutCtx {
    deadline_us: i64,
}

impl TimeoutCtx {
    /// Build a context expiring `timeout_us` from `now_us`, clamped by an outer deadline
    pub fn new(now_us: i64, timeout_us: i64, outer_deadline_us: Option<i64>) -> Result<Self> {
        if timeout_us <= 0 {
            return Err(Error::invalid_argument(format!(
                "invalid timeout {}",
                timeout_us
            )));
        }
        let mut deadline_us = now_us.saturating_add(timeout_us);
        if let Some(outer) = outer_deadline_us {
            deadline_us = deadline_us.min(outer);
        }
        let ctx = Self { deadline_us };
        ctx.check_at(now_us)?;
        Ok(ctx)
    }

    pub fn deadline_us(&self) -> i64 {
        self.deadline_us
    }

    pub fn is_timeouted_at(&self, now_us: i64) -> bool {
        now_us >= self.deadline_us
    }

    /// Fail with `Timeout` when the deadline has passed at `now_us`
    pub fn check_at(&self, now_us: i64) -> Result<()> {
        if self.is_timeouted_at(now_us) {
            Err(Error::timeout(format!(
                "deadline {} passed at {}",
                self.deadline_us, now_us
            )))
        } else {
            Ok(())
        }
    }

    /// Fail with `Timeout` when the deadline has passed on the wall clock
    pub fn check(&self) -> Result<()> {
        self.check_at(now_us())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestr_picks_largest_unit() {
        assert_eq!(timestamp_to_timestr(US_PER_DAY).unwrap(), "1d");
        assert_eq!(timestamp_to_timestr(2 * US_PER_HOUR + 5).unwrap(), "2h");
        assert_eq!(timestamp_to_timestr(90 * US_PER_SEC).unwrap(), "1m");
        assert_eq!(timestamp_to_timestr(120 * US_PER_SEC).unwrap(), "2m");
        assert_eq!(timestamp_to_timestr(1_500).unwrap(), "1ms");
        assert_eq!(timestamp_to_timestr(7).unwrap(), "7us");
    }

    #[test]
    fn test_timestr_rejects_non_positive() {
        assert!(timestamp_to_timestr(0).is_err());
        assert!(timestamp_to_timestr(-1).is_err());
    }

    #[test]
    fn test_parse_time_us() {
        assert_eq!(parse_time_us("1d").unwrap(), US_PER_DAY);
        assert_eq!(parse_time_us("120s").unwrap(), 120 * US_PER_SEC);
        assert_eq!(parse_time_us("10MS").unwrap(), 10 * US_PER_MS);
        assert_eq!(parse_time_us("42").unwrap(), 42);
        assert!(parse_time_us("").is_err());
        assert!(parse_time_us("5w").is_err());
        assert!(parse_time_us("s").is_err());
    }

    #[test]
    fn test_date_and_strftime_shape() {
        let date = timestamp_to_date(1_600_000_000 * US_PER_SEC).unwrap();
        assert!((20200912..=20200914).contains(&date));
        let rendered = backup_time_to_strftime(1_600_000_000, 'T').unwrap();
        assert_eq!(rendered.len(), 15);
        assert_eq!(rendered.chars().nth(8), Some('T'));
        assert!(timestamp_to_date(0).is_err());
    }

    #[test]
    fn test_is_tmp_file() {
        assert!(is_tmp_file("piece_1.tmp.1234"));
        assert!(!is_tmp_file("piece_1.tmp."));
        assert!(!is_tmp_file("piece_1.tmp.12a"));
        assert!(!is_tmp_file("piece_1.dat"));
        assert!(!is_tmp_file(""));
    }

    #[test]
    fn test_trim_right_slash() {
        assert_eq!(trim_right_slash("file:///backup///"), "file:///backup");
        assert_eq!(trim_right_slash("oss://b/p"), "oss://b/p");
    }

    #[test]
    fn test_check_passwd() {
        assert!(check_passwd("", "").is_ok());
        assert!(check_passwd("abc,def", "def").is_ok());
        let err = check_passwd("abc,def", "xyz").unwrap_err();
        assert!(matches!(err, Error::BackupInvalidPassword));
    }

    #[test]
    fn test_timeout_ctx() {
        let ctx = TimeoutCtx::new(1_000, 2 * US_PER_SEC, None).unwrap();
        assert_eq!(ctx.deadline_us(), 1_000 + 2 * US_PER_SEC);
        assert!(ctx.check_at(1_500).is_ok());
        assert!(ctx.check_at(ctx.deadline_us()).is_err());

        let clamped = TimeoutCtx::new(1_000, 2 * US_PER_SEC, Some(5_000)).unwrap();
        assert_eq!(clamped.deadline_us(), 5_000);

        let expired = TimeoutCtx::new(10_000, US_PER_SEC, Some(9_000)).unwrap_err();
        assert!(expired.is_need_retry());
    }
}
