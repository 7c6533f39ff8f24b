use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::platform;
use crate::utils::datetime::{normalize_timestamp, parse_display_datetime};

/// Upstream contest ids are numeric, but accept strings too.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    pub fn into_string(self) -> String {
        match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// A contest record as returned by the upstream listing API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawContest {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    /// Length in seconds
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub href: Option<String>,
}

/// Envelope of the upstream listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ContestsResponse {
    #[serde(default)]
    pub objects: Vec<RawContest>,
}

/// A normalized contest, as cached and shown.
///
/// `start_datetime` / `end_datetime` are display strings in the fixed display
/// timezone, or `None` if the upstream timestamp could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Contest {
    pub id: String,
    pub event: String,
    /// Platform domain, e.g. `codeforces.com`
    #[serde(default)]
    pub platform: String,
    pub platform_display_name: String,
    pub start_datetime: Option<String>,
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub href: String,
}

impl Contest {
    /// Normalize an upstream record fetched for `platform`.
    pub fn from_raw(raw: RawContest, platform: &str) -> Self {
        Self {
            id: raw.id.map(RawId::into_string).unwrap_or_default(),
            event: raw.event.unwrap_or_else(|| "Contest".to_string()),
            platform: platform.to_string(),
            platform_display_name: platform::display_name(platform).to_string(),
            start_datetime: raw.start.as_deref().and_then(normalize_timestamp),
            end_datetime: raw.end.as_deref().and_then(normalize_timestamp),
            duration: raw.duration.unwrap_or(0),
            href: raw.href.unwrap_or_default(),
        }
    }

    pub fn has_start(&self) -> bool {
        self.start_datetime.is_some()
    }

    /// Ordering by start time. The display strings use a 12-hour clock, so
    /// they are compared by their parsed value, not lexicographically.
    pub fn cmp_by_start(&self, other: &Contest) -> Ordering {
        let key = |c: &Contest| {
            c.start_datetime
                .as_deref()
                .and_then(parse_display_datetime)
        };
        key(self)
            .cmp(&key(other))
            .then_with(|| self.start_datetime.cmp(&other.start_datetime))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Duration as `Hh Mm`.
    pub fn duration_display(&self) -> String {
        let hours = self.duration / 3600;
        let minutes = (self.duration % 3600) / 60;
        if hours > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}m", minutes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contests_response() {
        let json = r#"{"meta": {"limit": 5}, "objects": [{"id": 58123, "event": "Codeforces Round 999 (Div. 2)", "resource": "codeforces.com", "start": "2025-01-01T14:35:00", "end": "2025-01-01T16:35:00", "duration": 7200, "href": "https://codeforces.com/contests/2061"}]}"#;

        let resp: ContestsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.objects.len(), 1);

        let contest = Contest::from_raw(resp.objects[0].clone(), "codeforces.com");
        assert_eq!(contest.id, "58123");
        assert_eq!(contest.platform_display_name, "Codeforces");
        assert_eq!(contest.start_datetime.as_deref(), Some("2025-01-01 08:05 PM IST"));
        assert_eq!(contest.end_datetime.as_deref(), Some("2025-01-01 10:05 PM IST"));
        assert_eq!(contest.duration_display(), "2h 0m");
    }

    #[test]
    fn test_from_raw_with_missing_fields() {
        let raw: RawContest = serde_json::from_str(r#"{"id": "abc", "start": "garbage"}"#).unwrap();
        let contest = Contest::from_raw(raw, "atcoder.jp");

        assert_eq!(contest.id, "abc");
        assert_eq!(contest.event, "Contest");
        assert!(!contest.has_start());
        assert!(contest.end_datetime.is_none());
    }

    #[test]
    fn test_cmp_by_start_uses_clock_not_text() {
        let mut morning = Contest::from_raw(
            serde_json::from_str(r#"{"id": 1, "start": "2025-01-01T05:30:00Z"}"#).unwrap(),
            "codechef.com",
        );
        let afternoon = Contest::from_raw(
            serde_json::from_str(r#"{"id": 2, "start": "2025-01-01T07:30:00Z"}"#).unwrap(),
            "codechef.com",
        );
        // "11:00 AM" sorts after "01:00 PM" as text
        assert_eq!(morning.start_datetime.as_deref(), Some("2025-01-01 11:00 AM IST"));
        assert_eq!(afternoon.start_datetime.as_deref(), Some("2025-01-01 01:00 PM IST"));
        assert_eq!(morning.cmp_by_start(&afternoon), Ordering::Less);

        morning.start_datetime = None;
        assert_eq!(morning.cmp_by_start(&afternoon), Ordering::Less);
    }
}
