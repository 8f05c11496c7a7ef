//! Shared utility functions.

use chrono::{DateTime, Utc};

/// Convert a duration in seconds to a human-readable string.
///
/// >= 86400s -> "Xd", >= 3600s -> "Xh", >= 60s -> "Xm", otherwise -> "Xs".
pub fn human_duration(secs: u64) -> String {
    if secs >= 86400 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Age of `timestamp` relative to `now`, e.g. "3h ago". Future timestamps
/// (clock skew between sealing and unsealing hosts) read as "just now".
pub fn human_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - timestamp).num_seconds();
    if secs <= 0 {
        "just now".to_string()
    } else {
        format!("{} ago", human_duration(secs as u64))
    }
}
