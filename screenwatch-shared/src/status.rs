//! Liveness derived from a child's last heartbeat.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A heartbeat older than this is reported as stale.
///
/// Must stay well above the collector's reporting interval (5 minutes) so a
/// single missed cycle does not flip the status.
pub const STALE_AFTER_MINUTES: i64 = 30;

/// Format accepted for heartbeats written without an offset (local time).
const NAIVE_HEARTBEAT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    NoHeartbeat,
    Ok,
    Stale,
}

impl Liveness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Liveness::NoHeartbeat => "NO HEARTBEAT",
            Liveness::Ok => "OK",
            Liveness::Stale => "NO RECENT DATA",
        }
    }
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn stale_after() -> TimeDelta {
    TimeDelta::minutes(STALE_AFTER_MINUTES)
}

/// Serialize a heartbeat instant the way the store persists it.
pub fn format_heartbeat(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse a persisted heartbeat. Accepts RFC 3339 and offset-less ISO 8601,
/// the latter interpreted in local time.
pub fn parse_heartbeat(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, NAIVE_HEARTBEAT_FORMAT).ok()?;
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Derive liveness for a heartbeat as of `now`.
pub fn status(heartbeat: Option<&str>, now: DateTime<Utc>) -> Liveness {
    let Some(at) = heartbeat.and_then(parse_heartbeat) else {
        return Liveness::NoHeartbeat;
    };
    if now.signed_duration_since(at) > stale_after() {
        Liveness::Stale
    } else {
        Liveness::Ok
    }
}

/// Same as [`status`] against the current clock.
pub fn status_now(heartbeat: Option<&str>) -> Liveness {
    status(heartbeat, Utc::now())
}
