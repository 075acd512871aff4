#![forbid(unsafe_code)]

//! Structured tracing output of the store and controller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use scrollkeep_core::testing::TestHost;
use scrollkeep_core::{RestorationOptions, ScrollPosition, StorageError, use_scroll_restoration};
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_events<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: Arc::clone(&events),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

#[test]
fn failed_save_emits_store_warning() {
    let events = with_captured_events(|| {
        let host = TestHost::with_active_key("a");
        let _controller = use_scroll_restoration(&host.bindings(), RestorationOptions::default());
        host.storage.fail_writes_with(Some(StorageError::QuotaExceeded));
        host.scroll.set_viewport(ScrollPosition::new(0.0, 100.0));
        host.router.navigate("b");
    });

    let warning = events
        .iter()
        .find(|event| event.level == tracing::Level::WARN)
        .expect("save failure warning");
    assert_eq!(warning.target, "scrollkeep.store");
    assert_eq!(warning.field("message"), Some("scroll position save failed"));
    assert_eq!(warning.field("key"), Some("a"));
    assert_eq!(warning.field("error"), Some("session storage quota exceeded"));
}

#[test]
fn dispatches_are_logged_with_signal_and_outcome() {
    let events = with_captured_events(|| {
        let host = TestHost::with_active_key("a");
        let _controller = use_scroll_restoration(&host.bindings(), RestorationOptions::default());
        host.router.navigate("b");
        host.lifecycle.discard();
    });

    let dispatches: Vec<(&str, &str, &str)> = events
        .iter()
        .filter(|event| event.target == "scrollkeep.controller")
        .filter(|event| event.field("message") == Some("lifecycle signal dispatched"))
        .map(|event| {
            (
                event.field("signal").unwrap_or_default(),
                event.field("key").unwrap_or_default(),
                event.field("outcome").unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(
        dispatches,
        vec![
            ("navigation_start", "a", "saved"),
            ("navigation_complete", "b", "restored"),
            ("before_discard", "b", "forgotten"),
        ]
    );
    assert!(events.iter().all(|event| event.level != tracing::Level::WARN));
}
