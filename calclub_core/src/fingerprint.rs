//! Cache keys derived from a normalized search profile.

use chrono::{NaiveDateTime, Timelike};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

use crate::SearchProfile;

/// Hex SHA-256 of the normalized profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the cache fingerprint of a profile.
///
/// Inputs are sorted categories, sorted keywords, time bounds truncated to
/// the minute, `free_only`, `max_distance_miles` and location. Set members and
/// location are trimmed and case-folded, so ordering and casing never change
/// the key.
#[must_use]
pub fn fingerprint(profile: &SearchProfile) -> Fingerprint {
    let window = profile.time_window.unwrap_or_default();

    let mut hasher = Sha256::new();
    for (label, value) in [
        ("categories", fold_set(&profile.categories)),
        ("keywords", fold_set(&profile.keywords)),
        ("start", minute_key(window.start)),
        ("end", minute_key(window.end)),
        ("free_only", profile.free_only.to_string()),
        (
            "max_distance",
            profile
                .max_distance_miles
                .map_or_else(String::new, |d| format!("{d:.3}")),
        ),
        ("location", fold(&profile.location)),
    ] {
        hasher.update(label.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\x1f");
    }
    Fingerprint(format!("{:x}", hasher.finalize()))
}

fn fold(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Members are length-prefixed so no member text can mimic a boundary.
fn fold_set(items: &BTreeSet<String>) -> String {
    items
        .iter()
        .map(|s| fold(s))
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|s| format!("{}:{s}", s.len()))
        .collect()
}

fn minute_key(at: Option<NaiveDateTime>) -> String {
    at.map_or_else(String::new, |at| {
        at.with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(at)
            .format("%Y-%m-%dT%H:%M")
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeWindow;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        let Some(dt) = NaiveDate::from_ymd_opt(2026, 1, 15).and_then(|d| d.and_hms_opt(h, m, s))
        else {
            panic!("invalid test datetime");
        };
        dt
    }

    #[test]
    fn deterministic_hash() {
        let profile = SearchProfile::default().with_category("AI");
        let f1 = fingerprint(&profile);
        let f2 = fingerprint(&profile);
        assert_eq!(f1, f2);
        assert_eq!(f1.as_str().len(), 64);
        assert_eq!(f1.short().len(), 12);
    }

    #[test]
    fn insertion_order_and_case_do_not_matter() {
        let a = SearchProfile::default()
            .with_category("startup")
            .with_category("AI")
            .with_keyword("rust")
            .with_location("Columbus, Ohio");
        let b = SearchProfile::default()
            .with_category("ai")
            .with_category(" Startup ")
            .with_keyword("Rust")
            .with_location("columbus,  ohio");
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn time_bounds_are_compared_at_minute_granularity() {
        let a = SearchProfile::default().with_time_window(TimeWindow::between(at(9, 0, 5), at(17, 30, 0)));
        let b = SearchProfile::default().with_time_window(TimeWindow::between(at(9, 0, 59), at(17, 30, 12)));
        let c = SearchProfile::default().with_time_window(TimeWindow::between(at(9, 1, 0), at(17, 30, 0)));
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn scalar_fields_change_the_key() {
        let base = SearchProfile::default().with_location("Columbus");
        let free = base.clone().with_free_only(true);
        let mut near = base.clone();
        near.max_distance_miles = Some(5.0);
        assert_ne!(fingerprint(&base), fingerprint(&free));
        assert_ne!(fingerprint(&base), fingerprint(&near));
        assert_ne!(fingerprint(&base), fingerprint(&base.clone().with_location("Dayton")));
    }

    #[test]
    fn categories_and_keywords_do_not_collide() {
        let a = SearchProfile::default().with_category("jazz");
        let b = SearchProfile::default().with_keyword("jazz");
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn member_text_cannot_mimic_a_separator() {
        let joined = SearchProfile::default().with_category("ai,startup");
        let split = SearchProfile::default().with_category("ai").with_category("startup");
        assert_ne!(fingerprint(&joined), fingerprint(&split));

        let tricky = SearchProfile::default().with_category("2:ai");
        let plain = SearchProfile::default().with_category("ai");
        assert_ne!(fingerprint(&tricky), fingerprint(&plain));
    }
}
