//! Fixed-offset timestamp rendering for listings and receipt columns.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// `yyyy/MM/dd HH:mm`, the listing's `lastUpdated` format.
pub const LAST_UPDATED_FORMAT: &str = "%Y/%m/%d %H:%M";

/// `yyyy/MM/dd HH:mm:ss`, written into receipt-time cells.
pub const RECEIVED_AT_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Asia/Tokyo has no DST, so a fixed +09:00 offset is exact.
pub const JST_OFFSET_MINUTES: i32 = 9 * 60;

pub fn fixed_offset(minutes: i32) -> Option<FixedOffset> {
    if !(-14 * 60..=14 * 60).contains(&minutes) { return None; }
    FixedOffset::east_opt(minutes * 60)
}

/// Render epoch milliseconds in the given offset. Out-of-range values render as "".
pub fn format_millis(ms: i64, offset: &FixedOffset, fmt: &str) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(t) => t.with_timezone(offset).format(fmt).to_string(),
        None => String::new(),
    }
}

pub fn format_instant(t: DateTime<Utc>, offset: &FixedOffset, fmt: &str) -> String {
    t.with_timezone(offset).format(fmt).to_string()
}
