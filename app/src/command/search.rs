use calclub_config::Config;
use calclub_core::{SearchProfile, resolve_window};
use chrono::{Local, NaiveDateTime};
use tracing::info;

use super::{build_aggregator, print_events};

/// Input parameters for the Search command strategy.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
    pub when: Option<String>,
    pub categories: Vec<String>,
    pub keywords: Vec<String>,
    pub location: Option<String>,
    pub free_only: bool,
    pub max_distance: Option<f64>,
    pub json: bool,
}

impl SearchInput {
    /// Turn the flags into a profile, resolving `when` against `now`.
    fn to_profile(&self, default_location: &str, now: NaiveDateTime) -> anyhow::Result<SearchProfile> {
        let mut profile = SearchProfile {
            categories: self.categories.iter().cloned().collect(),
            keywords: self.keywords.iter().cloned().collect(),
            max_distance_miles: self.max_distance,
            free_only: self.free_only,
            location: self
                .location
                .clone()
                .unwrap_or_else(|| default_location.to_string()),
            ..SearchProfile::default()
        };

        if let Some(phrase) = &self.when {
            let Some(window) = resolve_window(phrase, now) else {
                anyhow::bail!("Don't know when '{phrase}' is. Try today, this weekend, friday or 2026-01-15.");
            };
            profile.time_window = Some(window);
        }

        Ok(profile)
    }
}

/// Strategy for a one-shot search.
#[derive(Debug, Clone, Copy)]
pub struct SearchStrategy;

impl super::CommandStrategy for SearchStrategy {
    type Input = SearchInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let profile = input.to_profile(&config.search.default_location, Local::now().naive_local())?;
        info!("Searching events in {}", profile.location);

        let aggregator = build_aggregator(&config)?;
        let events = aggregator.aggregate(&profile).await?;
        print_events(&events, input.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn wednesday_noon() -> NaiveDateTime {
        let Some(now) = NaiveDate::from_ymd_opt(2026, 1, 14).and_then(|d| d.and_hms_opt(12, 0, 0)) else {
            panic!("valid date");
        };
        now
    }

    #[test]
    fn flags_become_profile() {
        let input = SearchInput {
            when: Some("this weekend".to_string()),
            categories: vec!["tech".to_string(), "startup".to_string()],
            keywords: vec!["rust".to_string()],
            free_only: true,
            max_distance: Some(10.0),
            ..SearchInput::default()
        };

        let Ok(profile) = input.to_profile("Columbus, Ohio", wednesday_noon()) else {
            panic!("profile should build");
        };
        assert_eq!(profile.location, "Columbus, Ohio");
        assert_eq!(profile.categories.len(), 2);
        assert!(profile.keywords.contains("rust"));
        assert!(profile.free_only);
        assert_eq!(profile.max_distance_miles, Some(10.0));
        assert_eq!(
            profile.time_window.and_then(|w| w.start),
            NaiveDate::from_ymd_opt(2026, 1, 16).and_then(|d| d.and_hms_opt(17, 0, 0))
        );
    }

    #[test]
    fn explicit_location_wins() {
        let input = SearchInput {
            location: Some("Dayton, Ohio".to_string()),
            ..SearchInput::default()
        };
        let Ok(profile) = input.to_profile("Columbus, Ohio", wednesday_noon()) else {
            panic!("profile should build");
        };
        assert_eq!(profile.location, "Dayton, Ohio");
        assert_eq!(profile.time_window, None);
    }

    #[test]
    fn unknown_when_is_rejected() {
        let input = SearchInput {
            when: Some("after the apocalypse".to_string()),
            ..SearchInput::default()
        };
        assert!(input.to_profile("Columbus, Ohio", wednesday_noon()).is_err());
    }
}
