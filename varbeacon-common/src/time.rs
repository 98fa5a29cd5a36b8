//! Timestamp utilities
//!
//! The daily access quota is counted per local calendar day.

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current calendar day in the server's local time zone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
