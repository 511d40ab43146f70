use chrono::{DateTime, FixedOffset, Utc};

/// Offset of the service timezone (Asia/Jakarta, no DST).
pub const SERVICE_UTC_OFFSET_SECONDS: i32 = 7 * 3600;

/// Text layout of the `Date` response header.
pub const FORMAT_DATETIME_TEXT: &str = "%a, %d %b %Y %H:%M:%S %:z";

/// Current time in the service timezone
pub fn time_now() -> DateTime<FixedOffset> {
    to_service_time(Utc::now())
}

pub fn to_service_time(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    match FixedOffset::east_opt(SERVICE_UTC_OFFSET_SECONDS) {
        Some(offset) => instant.with_timezone(&offset),
        None => instant.fixed_offset(),
    }
}

/// Environment variable helpers
pub mod env {
    use std::env;
    use std::str::FromStr;

    use crate::config::ConfigError;

    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Reads and parses `key`, falling back to `default` when unset.
    pub fn get_parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
        match env::var(key) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value: raw }),
            Err(_) => Ok(default),
        }
    }

    pub fn get_list(key: &str, default: &str) -> Vec<String> {
        get_string(key, default)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Logging helpers
pub mod logging {
    use log::LevelFilter;

    pub fn level_from_string(level: &str) -> LevelFilter {
        match level.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn service_time_is_utc_plus_seven() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 3, 30, 0).unwrap();
        let local = to_service_time(instant);
        assert_eq!(local.format(FORMAT_DATETIME_TEXT).to_string(), "Mon, 15 Jan 2024 10:30:00 +07:00");
    }

    #[test]
    fn unknown_level_defaults_to_info() {
        assert_eq!(logging::level_from_string("verbose"), log::LevelFilter::Info);
        assert_eq!(logging::level_from_string("DEBUG"), log::LevelFilter::Debug);
    }
}
