use async_trait::async_trait;
use calclub_core::{EventSource, NormalizedEvent, SearchError, SearchProfile, TimeWindow};
use calclub_search::{Aggregator, AggregatorConfig};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone, Copy)]
enum Behavior {
    Respond,
    Hang,
    Panic,
}

struct MockSource {
    name: &'static str,
    events: Vec<NormalizedEvent>,
    delay: Duration,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockSource {
    fn new(name: &'static str, events: Vec<NormalizedEvent>) -> Arc<Self> {
        Arc::new(Self {
            name,
            events,
            delay: Duration::from_millis(50),
            behavior: Behavior::Respond,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(name: &'static str, events: Vec<NormalizedEvent>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            events,
            delay,
            behavior: Behavior::Respond,
            calls: AtomicUsize::new(0),
        })
    }

    fn misbehaving(name: &'static str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            events: Vec::new(),
            delay: Duration::ZERO,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for MockSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn discover(&self, _profile: &SearchProfile) -> Vec<NormalizedEvent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Respond => {
                sleep(self.delay).await;
                self.events.clone()
            }
            Behavior::Hang => std::future::pending().await,
            Behavior::Panic => panic!("source {} exploded", self.name),
        }
    }
}

fn at(day: u32, hour: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2026, 1, day).and_then(|d| d.and_hms_opt(hour, 0, 0))
}

fn event(title: &str, source: &str, day: u32) -> NormalizedEvent {
    NormalizedEvent::new(title, source)
        .with_start(at(day, 19))
        .with_venue(Some("Rev1 Ventures".to_string()), None)
}

fn aggregator(sources: &[Arc<MockSource>], config: AggregatorConfig) -> Aggregator {
    sources.iter().fold(Aggregator::new(config), |agg, source| {
        agg.with_source(Arc::clone(source) as Arc<dyn EventSource>)
    })
}

fn titles(events: &[NormalizedEvent]) -> Vec<&str> {
    events.iter().map(|e| e.title.as_str()).collect()
}

#[tokio::test]
async fn no_sources_is_a_configuration_error() {
    let agg = Aggregator::new(AggregatorConfig::default());
    let result = agg.aggregate(&SearchProfile::default()).await;
    assert!(matches!(result, Err(SearchError::NoSources)));
}

#[tokio::test(start_paused = true)]
async fn merges_sources_and_keeps_richer_duplicate() {
    let ticketing = MockSource::new("ticketing", vec![event("AI Meetup", "ticketing", 15)]);
    let discovery = MockSource::new(
        "discovery",
        vec![
            event("ai meetup", "discovery", 15)
                .with_venue(Some("Rev1 Ventures".to_string()), Some("1275 Kinnear Rd".to_string())),
            event("Startup Coffee", "discovery", 16),
        ],
    );
    let agg = aggregator(&[ticketing, discovery], AggregatorConfig::default());

    let Ok(events) = agg.aggregate(&SearchProfile::default()).await else {
        panic!("aggregate should succeed");
    };
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].source, "discovery");
    assert_eq!(events[0].venue_address.as_deref(), Some("1275 Kinnear Rd"));
    assert_eq!(events[1].title, "Startup Coffee");
}

#[tokio::test(start_paused = true)]
async fn dedup_tie_prefers_first_registered_source() {
    // The discovery source answers first; registration order still decides.
    let ticketing = MockSource::slow(
        "ticketing",
        vec![event("AI Meetup", "ticketing", 15)],
        Duration::from_millis(500),
    );
    let discovery = MockSource::new("discovery", vec![event("AI Meetup", "discovery", 15)]);
    let agg = aggregator(&[ticketing, discovery], AggregatorConfig::default());

    let Ok(events) = agg.aggregate(&SearchProfile::default()).await else {
        panic!("aggregate should succeed");
    };
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source, "ticketing");
}

#[tokio::test(start_paused = true)]
async fn free_only_results_are_all_free() {
    let source = MockSource::new(
        "unfiltered",
        vec![
            event("Free Talk", "unfiltered", 15),
            event("Paid Workshop", "unfiltered", 15).with_price((false, Some(2500))),
            event("Zero Dollar Social", "unfiltered", 15).with_price((false, Some(0))),
        ],
    );
    let agg = aggregator(&[source], AggregatorConfig::default());

    let Ok(events) = agg.aggregate(&SearchProfile::default().with_free_only(true)).await else {
        panic!("aggregate should succeed");
    };
    assert_eq!(titles(&events), vec!["Free Talk"]);
    assert!(events.iter().all(|e| e.is_free));
}

#[tokio::test(start_paused = true)]
async fn bounded_window_results_fall_inside_it() {
    let source = MockSource::new(
        "unfiltered",
        vec![
            event("Before", "unfiltered", 10),
            event("Inside", "unfiltered", 15),
            NormalizedEvent::new("Edge", "unfiltered").with_start(at(17, 23)),
            NormalizedEvent::new("Undated", "unfiltered"),
            event("After", "unfiltered", 20),
        ],
    );
    let agg = aggregator(&[source], AggregatorConfig::default());
    let (Some(start), Some(end)) = (at(14, 0), at(17, 23)) else {
        panic!("valid dates");
    };
    let profile = SearchProfile::default().with_time_window(TimeWindow::between(start, end));

    let Ok(events) = agg.aggregate(&profile).await else {
        panic!("aggregate should succeed");
    };
    assert_eq!(titles(&events), vec!["Inside", "Edge"]);
    for e in &events {
        let Some(when) = e.start else {
            panic!("windowed results must be dated");
        };
        assert!(start <= when && when <= end);
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_equivalent_searches_fan_out_once() {
    let ticketing = MockSource::new("ticketing", vec![event("AI Meetup", "ticketing", 15)]);
    let discovery = MockSource::new("discovery", vec![event("Startup Coffee", "discovery", 16)]);
    let agg = aggregator(&[Arc::clone(&ticketing), Arc::clone(&discovery)], AggregatorConfig::default());

    let first = SearchProfile::default()
        .with_category("AI")
        .with_category("startup")
        .with_location("Columbus");
    let second = SearchProfile::default()
        .with_category("startup")
        .with_category("ai")
        .with_location("columbus ");

    let (a, b) = tokio::join!(agg.aggregate(&first), agg.aggregate(&second));
    let (Ok(a), Ok(b)) = (a, b) else {
        panic!("both searches should succeed");
    };
    assert_eq!(a, b);
    assert_eq!(ticketing.calls() + discovery.calls(), 2);

    let Ok(again) = agg.aggregate(&first).await else {
        panic!("cached search should succeed");
    };
    assert_eq!(again, a);
    assert_eq!(ticketing.calls(), 1);
    assert_eq!(discovery.calls(), 1);
    assert_eq!(agg.cache().stats().misses, 1);
}

#[tokio::test(start_paused = true)]
async fn expired_cache_entry_triggers_fresh_fan_out() {
    let source = MockSource::new("ticketing", vec![event("AI Meetup", "ticketing", 15)]);
    let config = AggregatorConfig {
        cache_ttl: Duration::from_secs(60),
        ..AggregatorConfig::default()
    };
    let agg = aggregator(&[Arc::clone(&source)], config);
    let profile = SearchProfile::default();

    assert!(agg.aggregate(&profile).await.is_ok());
    assert!(agg.aggregate(&profile).await.is_ok());
    assert_eq!(source.calls(), 1);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(agg.aggregate(&profile).await.is_ok());
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn hung_source_is_abandoned_after_its_timeout() {
    let healthy = MockSource::new("healthy", vec![event("AI Meetup", "healthy", 15)]);
    let hung = MockSource::misbehaving("hung", Behavior::Hang);
    let config = AggregatorConfig {
        source_timeout: Duration::from_secs(5),
        ..AggregatorConfig::default()
    };
    let agg = aggregator(&[hung, healthy], config);

    let started = tokio::time::Instant::now();
    let Ok(events) = agg.aggregate(&SearchProfile::default()).await else {
        panic!("aggregate should succeed");
    };
    assert_eq!(titles(&events), vec!["AI Meetup"]);
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn panicking_source_does_not_hide_others() {
    let exploding = MockSource::misbehaving("exploding", Behavior::Panic);
    let healthy = MockSource::new("healthy", vec![event("AI Meetup", "healthy", 15)]);
    let agg = aggregator(&[exploding, healthy], AggregatorConfig::default());

    let Ok(events) = agg.aggregate(&SearchProfile::default()).await else {
        panic!("aggregate should succeed");
    };
    assert_eq!(titles(&events), vec!["AI Meetup"]);
}

#[tokio::test(start_paused = true)]
async fn search_timeout_returns_what_finished() {
    let fast = MockSource::new("fast", vec![event("Quick Talk", "fast", 15)]);
    let slow = MockSource::slow(
        "slow",
        vec![event("Late Show", "slow", 15)],
        Duration::from_secs(20),
    );
    let config = AggregatorConfig {
        source_timeout: Duration::from_secs(30),
        search_timeout: Duration::from_secs(10),
        ..AggregatorConfig::default()
    };
    let agg = aggregator(&[slow, fast], config);

    let Ok(events) = agg.aggregate(&SearchProfile::default()).await else {
        panic!("aggregate should succeed");
    };
    assert_eq!(titles(&events), vec!["Quick Talk"]);
}

#[tokio::test(start_paused = true)]
async fn every_source_failing_yields_an_empty_list() {
    let agg = aggregator(
        &[
            MockSource::misbehaving("hung", Behavior::Hang),
            MockSource::misbehaving("exploding", Behavior::Panic),
        ],
        AggregatorConfig {
            source_timeout: Duration::from_secs(1),
            ..AggregatorConfig::default()
        },
    );

    let Ok(events) = agg.aggregate(&SearchProfile::default()).await else {
        panic!("partial failure must not fail the search");
    };
    assert!(events.is_empty());
}
