use serde::{Deserialize, Serialize};

/// Supported contest platforms: (domain, display name).
/// Order here is the order platforms are listed and swept in.
pub const PLATFORMS: &[(&str, &str)] = &[
    ("codeforces.com", "Codeforces"),
    ("codechef.com", "CodeChef"),
    ("leetcode.com", "LeetCode"),
    ("hackerrank.com", "HackerRank"),
    ("atcoder.jp", "AtCoder"),
    ("topcoder.com", "TopCoder"),
];

/// A platform as presented to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PlatformInfo {
    pub domain: String,
    pub name: String,
}

pub fn is_supported(domain: &str) -> bool {
    PLATFORMS.iter().any(|(d, _)| *d == domain)
}

/// Display name for a platform domain; unknown domains display as themselves.
pub fn display_name(domain: &str) -> &str {
    PLATFORMS
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, name)| *name)
        .unwrap_or(domain)
}

pub fn all_domains() -> Vec<String> {
    PLATFORMS.iter().map(|(d, _)| d.to_string()).collect()
}

pub fn available_platforms() -> Vec<PlatformInfo> {
    PLATFORMS
        .iter()
        .map(|(domain, name)| PlatformInfo {
            domain: domain.to_string(),
            name: name.to_string(),
        })
        .collect()
}

/// Keep only supported domains, preserving order and dropping duplicates.
/// `None` or an empty request means every supported platform.
pub fn filter_supported(requested: Option<&[String]>) -> Vec<String> {
    let requested = match requested {
        Some(list) if !list.is_empty() => list,
        _ => return all_domains(),
    };

    let mut kept: Vec<String> = Vec::with_capacity(requested.len());
    for domain in requested {
        if is_supported(domain) && !kept.contains(domain) {
            kept.push(domain.clone());
        }
    }
    kept
}
