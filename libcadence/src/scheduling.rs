//! Parsing of "when" expressions given on the command line
//!
//! Accepted forms, tried in order:
//! - `now`
//! - Unix seconds: `1735689600`
//! - RFC 3339: `2025-01-01T09:00:00Z`
//! - Offsets: `30m`, `+2h`, `in 1 day`
//! - Jitter: `random:10m-20m`, a uniform offset in that range
//! - Natural language: `tomorrow`, `next friday 10am`

use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;

use crate::error::{CadenceError, Result};

/// Smallest jitter range bound, so bulk imports still spread out
const MIN_JITTER_SECS: u64 = 30;
const MAX_JITTER_SECS: u64 = 30 * 24 * 3600;

/// Resolve `input` to Unix seconds relative to `now`
pub fn parse_when(input: &str, now: DateTime<Utc>) -> Result<i64> {
    let input = input.trim();
    if input.is_empty() {
        return Err(invalid("Time expression cannot be empty"));
    }

    if input.eq_ignore_ascii_case("now") {
        return Ok(now.timestamp());
    }

    if let Ok(timestamp) = input.parse::<i64>() {
        return Ok(timestamp);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.timestamp());
    }

    if let Some(range) = input.strip_prefix("random:") {
        let (min, max) = parse_jitter_range(range)?;
        let secs = rand::thread_rng().gen_range(min.as_secs()..=max.as_secs());
        return offset_from(now, secs);
    }

    if let Some(offset) = parse_offset(input) {
        return offset_from(now, offset.as_secs());
    }

    chrono_english::parse_date_string(input, now, chrono_english::Dialect::Us)
        .map(|dt| dt.timestamp())
        .map_err(|_| invalid(&format!("Could not parse time: {}", input)))
}

fn offset_from(now: DateTime<Utc>, secs: u64) -> Result<i64> {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| now.timestamp().checked_add(secs))
        .ok_or_else(|| invalid("Time offset is too large"))
}

fn parse_offset(input: &str) -> Option<Duration> {
    let body = input
        .strip_prefix('+')
        .or_else(|| input.strip_prefix("in "))
        .unwrap_or(input);
    humantime::parse_duration(body.trim()).ok()
}

fn parse_jitter_range(range: &str) -> Result<(Duration, Duration)> {
    let (min, max) = range
        .split_once('-')
        .ok_or_else(|| invalid("Random range must look like random:MIN-MAX"))?;

    let parse = |value: &str| {
        humantime::parse_duration(value.trim())
            .map_err(|e| invalid(&format!("Invalid duration '{}': {}", value, e)))
    };
    let (min, max) = (parse(min)?, parse(max)?);

    if min.as_secs() < MIN_JITTER_SECS {
        return Err(invalid(&format!(
            "Random range must start at {} seconds or more",
            MIN_JITTER_SECS
        )));
    }
    if max.as_secs() > MAX_JITTER_SECS {
        return Err(invalid("Random range cannot exceed 30 days"));
    }
    if min >= max {
        return Err(invalid("Random range minimum must be below its maximum"));
    }

    Ok((min, max))
}

fn invalid(message: &str) -> CadenceError {
    CadenceError::InvalidInput(message.to_string())
}
