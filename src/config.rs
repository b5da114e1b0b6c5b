//! Runtime configuration read from the environment (and `.env`).

use std::fmt;
use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};
use chrono_tz::Tz;

use crate::core::persistence::metrics::rollup::metric_rollup_entity::TopologyRef;
use crate::core::persistence::storage_path::DEFAULT_DATA_DIR;
use crate::errors::{config_error, ChargebackError, ChargebackResult};

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_ENTERPRISE_ID: u64 = 1;
pub const DEFAULT_ENTERPRISE_NAME: &str = "Enterprise";
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ChargebackConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    /// Report timezone used when a request does not name one.
    pub timezone: ReportTimezone,
    pub enterprise: TopologyRef,
    pub fetch_concurrency: usize,
}

impl ChargebackConfig {
    pub fn from_env() -> ChargebackResult<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> ChargebackResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timezone = match get("CHARGEBACK_TIMEZONE") {
            Some(raw) => parse_timezone(&raw)?,
            None => ReportTimezone::Fixed(utc_offset()),
        };

        let enterprise_id = match get("CHARGEBACK_ENTERPRISE_ID") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ChargebackError::Config(format!("CHARGEBACK_ENTERPRISE_ID '{raw}': {e}"))
            })?,
            None => DEFAULT_ENTERPRISE_ID,
        };

        let fetch_concurrency = match get("CHARGEBACK_FETCH_CONCURRENCY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                Ok(_) => {
                    return Err(config_error("CHARGEBACK_FETCH_CONCURRENCY must be at least 1"))
                }
                Err(e) => {
                    return Err(ChargebackError::Config(format!(
                        "CHARGEBACK_FETCH_CONCURRENCY '{raw}': {e}"
                    )))
                }
            },
            None => DEFAULT_FETCH_CONCURRENCY,
        };

        Ok(Self {
            data_dir: PathBuf::from(get("CHARGEBACK_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into())),
            log_dir: PathBuf::from(get("CHARGEBACK_LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.into())),
            log_level: get("CHARGEBACK_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.into()),
            timezone,
            enterprise: TopologyRef::new(
                enterprise_id,
                get("CHARGEBACK_ENTERPRISE_NAME").unwrap_or_else(|| DEFAULT_ENTERPRISE_NAME.into()),
            ),
            fetch_concurrency,
        })
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Timezone reports are bucketed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTimezone {
    Fixed(FixedOffset),
    /// IANA zone; buckets follow its daylight-saving transitions.
    Named(Tz),
}

impl fmt::Display for ReportTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Parses `UTC`, `Z`, a `±HH:MM` offset or an IANA zone name.
pub fn parse_timezone(raw: &str) -> ChargebackResult<ReportTimezone> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return Ok(ReportTimezone::Fixed(utc_offset()));
    }

    let invalid = || {
        ChargebackError::Config(format!(
            "timezone '{raw}' is not UTC, ±HH:MM or an IANA zone name"
        ))
    };

    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        return raw.parse::<Tz>().map(ReportTimezone::Named).map_err(|_| invalid());
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .map(ReportTimezone::Fixed)
        .ok_or_else(invalid)
}
