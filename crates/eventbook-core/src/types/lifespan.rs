//! Reservation lifespan: how long a pending booking holds its seats.
//!
//! Organizers supply the lifespan as a duration string made of
//! number/unit pairs (`"15m"`, `"1h30m"`, `"1.5h"`). It is persisted as a
//! whole number of minutes, so anything shorter than a minute is rejected
//! and sub-minute remainders are truncated.

use std::fmt;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const NANOS_PER_MINUTE: f64 = 60.0 * 1_000_000_000.0;

/// A validated reservation window, stored in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationLifespan(i32);

impl ReservationLifespan {
    /// Build from a minute count, rejecting non-positive values.
    pub fn from_minutes(minutes: i32) -> Result<Self, AppError> {
        if minutes < 1 {
            return Err(AppError::validation(
                "Reservation lifespan must be at least one minute",
            ));
        }
        Ok(Self(minutes))
    }

    /// Parse a duration string such as `"30m"` or `"2h15m"`.
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let nanos = parse_duration_nanos(input)?;
        let minutes = (nanos / NANOS_PER_MINUTE).trunc();
        if minutes > f64::from(i32::MAX) {
            return Err(AppError::validation("Reservation lifespan is too long"));
        }
        Self::from_minutes(minutes as i32)
    }

    /// Whole minutes.
    pub fn minutes(self) -> i32 {
        self.0
    }

    /// The window as a signed time delta, for `expires_at` arithmetic.
    pub fn as_delta(self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.0))
    }
}

impl fmt::Display for ReservationLifespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

/// Parse `[sign](number unit)+` into nanoseconds.
fn parse_duration_nanos(input: &str) -> Result<f64, AppError> {
    let invalid = || AppError::validation(format!("Invalid duration '{input}'"));

    let trimmed = input.trim();
    let (negative, mut rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        Some(_) => (false, trimmed),
        None => return Err(invalid()),
    };
    if rest == "0" {
        return Ok(0.0);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total = 0.0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => NANOS_PER_MINUTE,
            "h" => 60.0 * NANOS_PER_MINUTE,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total += value * scale;
    }

    Ok(if negative { -total } else { total })
}
