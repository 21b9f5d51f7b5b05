use calclub_core::NormalizedEvent;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Identity of an event across sources: folded title, day, folded venue.
#[derive(Debug, PartialEq, Eq, Hash)]
struct EventKey {
    title: String,
    day: Option<NaiveDate>,
    venue: String,
}

impl EventKey {
    fn of(event: &NormalizedEvent) -> Self {
        Self {
            title: fold(&event.title),
            day: event.start.map(|s| s.date()),
            venue: event.venue_name.as_deref().map(fold).unwrap_or_default(),
        }
    }
}

fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Collapse events describing the same entity.
///
/// Input order is registration order. On a collision the entry with more
/// populated optional fields survives; on a tie the earlier one does. The
/// survivor keeps the position of the first occurrence.
pub fn dedup(events: impl IntoIterator<Item = NormalizedEvent>) -> Vec<NormalizedEvent> {
    let mut kept: Vec<NormalizedEvent> = Vec::new();
    let mut seen: HashMap<EventKey, usize> = HashMap::new();

    for event in events {
        match seen.entry(EventKey::of(&event)) {
            Entry::Occupied(slot) => {
                if let Some(existing) = kept
                    .get_mut(*slot.get())
                    .filter(|existing| event.richness() > existing.richness())
                {
                    *existing = event;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(event);
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str, source: &str) -> NormalizedEvent {
        NormalizedEvent::new(title, source)
            .with_start(NaiveDate::from_ymd_opt(2026, 1, 15).and_then(|d| d.and_hms_opt(19, 0, 0)))
            .with_venue(Some("Rev1 Ventures".to_string()), None)
    }

    #[test]
    fn richer_duplicate_wins() {
        let sparse = event("AI Meetup", "first");
        let rich = event("AI Meetup", "second")
            .with_venue(Some("Rev1 Ventures".to_string()), Some("1275 Kinnear Rd".to_string()))
            .with_price((false, Some(1000)));

        let out = dedup(vec![sparse, rich]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, "second");
    }

    #[test]
    fn tie_keeps_earlier_source() {
        let out = dedup(vec![event("AI Meetup", "first"), event("AI Meetup", "second")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, "first");
    }

    #[test]
    fn title_and_venue_are_folded() {
        let loud = NormalizedEvent::new("  AI   MEETUP ", "second")
            .with_start(NaiveDate::from_ymd_opt(2026, 1, 15).and_then(|d| d.and_hms_opt(18, 0, 0)))
            .with_venue(Some("rev1  ventures".to_string()), None);

        let out = dedup(vec![event("AI Meetup", "first"), loud]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn different_day_or_venue_are_distinct() {
        let next_day = event("AI Meetup", "x")
            .with_start(NaiveDate::from_ymd_opt(2026, 1, 16).and_then(|d| d.and_hms_opt(19, 0, 0)));
        let elsewhere = event("AI Meetup", "y").with_venue(Some("The Idea Foundry".to_string()), None);

        let out = dedup(vec![event("AI Meetup", "first"), next_day, elsewhere]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn survivor_keeps_first_position() {
        let rich = event("AI Meetup", "rich").with_price((false, Some(500)));
        let out = dedup(vec![
            event("AI Meetup", "sparse"),
            event("Startup Coffee", "other"),
            rich,
        ]);
        let titles: Vec<(&str, &str)> = out.iter().map(|e| (e.title.as_str(), e.source.as_str())).collect();
        assert_eq!(titles, vec![("AI Meetup", "rich"), ("Startup Coffee", "other")]);
    }
}
