use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::NormalizedEvent;

/// Start/end bounds of a search. Datetimes are naive and local to the venue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(default)]
    pub start: Option<NaiveDateTime>,
    #[serde(default)]
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    #[must_use]
    pub const fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Both bounds are set, so the window actually filters.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Inclusive containment check.
    ///
    /// A half-open or unbounded window admits everything, including events
    /// without a parsed start. A bounded window rejects events without one.
    #[must_use]
    pub fn contains(&self, at: Option<NaiveDateTime>) -> bool {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return true;
        };
        at.is_some_and(|at| start <= at && at <= end)
    }
}

/// Accumulated intent for one event search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchProfile {
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub max_distance_miles: Option<f64>,
    #[serde(default)]
    pub free_only: bool,
    #[serde(default)]
    pub location: String,
}

impl SearchProfile {
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    #[must_use]
    pub const fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    #[must_use]
    pub const fn with_free_only(mut self, free_only: bool) -> Self {
        self.free_only = free_only;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.insert(keyword.into());
        self
    }

    /// Whether an event passes the `free_only` and time window constraints.
    #[must_use]
    pub fn admits(&self, event: &NormalizedEvent) -> bool {
        if self.free_only && !event.is_free {
            return false;
        }
        self.time_window
            .as_ref()
            .is_none_or(|window| window.contains(event.start))
    }

    /// Fold a turn's fragment into this profile.
    ///
    /// Scalars are last-write-wins when the fragment carries a value, sets are
    /// unioned and never shrink, and a supplied time window replaces the old
    /// one wholesale.
    pub fn apply(&mut self, partial: PartialProfile) {
        if let Some(window) = partial.time_window {
            self.time_window = Some(window);
        }
        self.categories.extend(partial.categories);
        self.keywords.extend(partial.keywords);
        if let Some(distance) = partial.max_distance_miles {
            self.max_distance_miles = Some(distance);
        }
        if let Some(free_only) = partial.free_only {
            self.free_only = free_only;
        }
        if let Some(location) = partial.location {
            self.location = location;
        }
    }
}

/// One turn's worth of extracted intent. Absent fields leave the cumulative
/// profile untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialProfile {
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub max_distance_miles: Option<f64>,
    #[serde(default)]
    pub free_only: Option<bool>,
    #[serde(default)]
    pub location: Option<String>,
}

impl PartialProfile {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        let Some(dt) = NaiveDate::from_ymd_opt(2026, 1, day).and_then(|d| d.and_hms_opt(hour, 0, 0))
        else {
            panic!("invalid test datetime");
        };
        dt
    }

    #[test]
    fn bounded_window_is_inclusive() {
        let window = TimeWindow::between(at(10, 0), at(12, 0));
        assert!(window.contains(Some(at(10, 0))));
        assert!(window.contains(Some(at(12, 0))));
        assert!(!window.contains(Some(at(12, 1))));
        assert!(!window.contains(None));
    }

    #[test]
    fn half_open_window_admits_everything() {
        let window = TimeWindow {
            start: Some(at(10, 0)),
            end: None,
        };
        assert!(!window.is_bounded());
        assert!(window.contains(Some(at(1, 0))));
        assert!(window.contains(None));
    }

    #[test]
    fn apply_unions_sets_and_overwrites_scalars() {
        let mut profile = SearchProfile::default()
            .with_category("AI")
            .with_location("Columbus, Ohio");

        profile.apply(PartialProfile {
            categories: BTreeSet::from(["startup".to_string()]),
            free_only: Some(true),
            ..PartialProfile::default()
        });

        assert_eq!(
            profile.categories,
            BTreeSet::from(["AI".to_string(), "startup".to_string()])
        );
        assert!(profile.free_only);
        assert_eq!(profile.location, "Columbus, Ohio");

        profile.apply(PartialProfile {
            free_only: Some(false),
            location: Some("Cleveland, Ohio".to_string()),
            ..PartialProfile::default()
        });
        assert!(!profile.free_only);
        assert_eq!(profile.location, "Cleveland, Ohio");
        assert_eq!(profile.categories.len(), 2);
    }

    #[test]
    fn apply_replaces_time_window_wholesale() {
        let mut profile =
            SearchProfile::default().with_time_window(TimeWindow::between(at(1, 0), at(5, 0)));
        profile.apply(PartialProfile {
            time_window: Some(TimeWindow {
                start: Some(at(20, 0)),
                end: None,
            }),
            ..PartialProfile::default()
        });
        assert_eq!(
            profile.time_window,
            Some(TimeWindow {
                start: Some(at(20, 0)),
                end: None,
            })
        );
    }

    #[test]
    fn partial_profile_deserializes_from_sparse_json() {
        let Ok(partial) = serde_json::from_str::<PartialProfile>(r#"{"categories": ["AI"]}"#) else {
            panic!("sparse fragment should deserialize");
        };
        assert!(partial.free_only.is_none());
        assert!(partial.location.is_none());
        assert!(!partial.is_empty());
        assert!(PartialProfile::default().is_empty());
    }
}
