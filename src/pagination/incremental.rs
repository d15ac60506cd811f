//! Incremental read windows
//!
//! Renders `since`/`until` into the filters providers understand.

use crate::connector::ReadParams;
use crate::types::TimeFormat;
use chrono::{DateTime, Utc};

/// The `[since, until)` window of a Read; `until` only counts with `since`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn from_params(params: &ReadParams) -> Self {
        Self {
            since: params.since,
            until: params.effective_until(),
        }
    }

    /// Lower bound rendered in `format`
    pub fn since_as(&self, format: TimeFormat) -> Option<String> {
        self.since.map(|t| format.render(t))
    }

    /// Upper bound rendered in `format`
    pub fn until_as(&self, format: TimeFormat) -> Option<String> {
        self.until.map(|t| format.render(t))
    }
}

/// Relative offset from `now` in JQL syntax: `-5m`, or `0m` for times not
/// in the past
pub fn relative_minutes(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - time).num_minutes();
    if minutes <= 0 {
        "0m".to_string()
    } else {
        format!("-{minutes}m")
    }
}

/// JQL clause for the window on the `updated` field; empty without `since`
pub fn jql_window(window: &TimeWindow, now: DateTime<Utc>) -> String {
    let Some(since) = window.since else {
        return String::new();
    };

    let mut jql = format!("updated > \"{}\"", relative_minutes(since, now));
    if let Some(until) = window.until {
        jql.push_str(&format!(" AND updated < \"{}\"", relative_minutes(until, now)));
    }
    jql
}
