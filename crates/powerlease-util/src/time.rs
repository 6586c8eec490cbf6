//! Time utilities for powerlease
//!
//! Lease expiry is wall-clock based: a lease renewed for 300 seconds expires
//! 300 seconds of real time later, at one-second granularity. Everything that
//! needs "now" goes through a [`Clock`] so tests can drive time by hand.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `POWERLEASE_MOCK_TIME` environment variable can be set
//! to override the system time. The mock clock advances at the same rate as
//! real time from the given starting point.
//!
//! Format: `YYYY-MM-DD HH:MM:SS`, interpreted as UTC (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! POWERLEASE_MOCK_TIME="2025-12-25 14:30:00" powerleased --config dev.toml
//! ```

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "POWERLEASE_MOCK_TIME";

/// Format accepted by [`MOCK_TIME_ENV_VAR`]
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Utc::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            let mock_time_str = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
            match NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT) {
                Ok(naive_dt) => {
                    let offset = Utc.from_utc_datetime(&naive_dt).signed_duration_since(Utc::now());
                    tracing::info!(
                        mock_time = %mock_time_str,
                        offset_secs = offset.num_seconds(),
                        "Mock time enabled"
                    );
                    Some(offset)
                }
                Err(_) => {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = MOCK_TIME_FORMAT,
                        "Invalid mock time format"
                    );
                    None
                }
            }
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Utc> {
    let real_now = Utc::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Convert a unix timestamp (seconds) into a UTC time
pub fn from_unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// `at + d`, truncated to whole seconds like every stored lease expiry
pub fn add_seconds(at: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
    let secs = i64::try_from(d.as_secs()).unwrap_or(i64::MAX / 2);
    from_unix_seconds(at.timestamp().saturating_add(secs)).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time remaining from `now` until `deadline`, or zero if it has passed
pub fn saturating_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    deadline.signed_duration_since(now).to_std().unwrap_or(Duration::ZERO)
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Source of "now" for lease bookkeeping
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The process clock (honours mock time in debug builds)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start at a whole unix second
    pub fn at_unix(secs: i64) -> Self {
        Self::new(from_unix_seconds(secs).unwrap_or_default())
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, d: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = add_seconds(*now, d);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(600)), "10m 0s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }

    #[test]
    fn test_add_seconds_truncates_subsecond_part() {
        let at = Utc.with_ymd_and_hms(2025, 12, 25, 14, 30, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        let later = add_seconds(at, Duration::from_millis(300_900));
        assert_eq!(later.timestamp() - at.timestamp(), 300);
        assert_eq!(later.timestamp_subsec_millis(), 0);
    }

    #[test]
    fn test_saturating_until() {
        let now = from_unix_seconds(1_000).unwrap();
        let later = from_unix_seconds(1_060).unwrap();
        assert_eq!(saturating_until(later, now), Duration::from_secs(60));
        assert_eq!(saturating_until(now, later), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_only_moves_when_told() {
        let clock = ManualClock::at_unix(1_700_000_000);
        assert_eq!(clock.now().timestamp(), 1_700_000_000);

        clock.advance(Duration::from_secs(200));
        assert_eq!(clock.now().timestamp(), 1_700_000_200);

        clock.set(from_unix_seconds(42).unwrap());
        assert_eq!(clock.now().timestamp(), 42);
    }

    #[test]
    fn test_parse_mock_time_format() {
        for valid in ["2025-12-25 14:30:00", "2025-01-01 00:00:00", "2020-06-15 12:00:00"] {
            assert!(NaiveDateTime::parse_from_str(valid, MOCK_TIME_FORMAT).is_ok(), "{valid}");
        }

        for invalid in ["2025-12-25", "14:30:00", "2025-12-25T14:30:00", "", "not a date"] {
            assert!(NaiveDateTime::parse_from_str(invalid, MOCK_TIME_FORMAT).is_err(), "{invalid}");
        }
    }

    #[test]
    fn test_now_consistency() {
        let t1 = SystemClock.now();
        std::thread::sleep(Duration::from_millis(50));
        let t2 = SystemClock.now();

        assert!(t2 > t1, "Time should advance forward");
        let diff = t2.signed_duration_since(t1);
        assert!(
            diff.num_milliseconds() >= 40 && diff.num_milliseconds() <= 500,
            "Expected ~50ms difference, got {}ms",
            diff.num_milliseconds()
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_is_mock_time_active_in_debug() {
        // OnceLock makes the env var impossible to toggle here; just make sure it doesn't panic
        let _ = is_mock_time_active();
    }
}
