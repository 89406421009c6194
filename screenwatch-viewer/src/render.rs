use std::fmt::Write;

use chrono::{DateTime, Utc};
use screenwatch_shared::api::FamilyUsage;
use screenwatch_shared::status;

const NO_SIGNAL: &str = "No signal";

/// The query result as pretty JSON, keyed by child email.
pub fn render_family_json(usage: &FamilyUsage) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(usage)
}

/// Plain-text family report: a header per child, then whole minutes per app.
pub fn render_family(usage: &FamilyUsage, now: DateTime<Utc>) -> String {
    if usage.is_empty() {
        return "No data yet\n".to_string();
    }
    let mut out = String::new();
    for (email, child) in usage {
        let heartbeat = child.heartbeat.as_deref();
        let liveness = status::status(heartbeat, now);
        let _ = writeln!(
            out,
            "[Child] {email}  Last seen: {}  [{liveness}]",
            heartbeat.unwrap_or(NO_SIGNAL)
        );
        if child.usage.is_empty() {
            let _ = writeln!(out, "  (no usage reported)");
        }
        for (app, seconds) in &child.usage {
            let _ = writeln!(out, "  {app:<40} {} min", seconds.div_euclid(60));
        }
    }
    out
}
