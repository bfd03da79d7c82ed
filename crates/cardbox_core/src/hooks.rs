//! Hook and filter bus for external extension points.
//!
//! # Responsibility
//! - Deliver fire-and-forget notifications for collection events.
//! - Run value-transforming text filters and boolean gate filters.
//!
//! # Invariants
//! - Notification order is registration order.
//! - A gate with no registered filters always passes.

use crate::model::{CardId, NoteId};
use std::collections::HashMap;

/// Filter applied to rendered question/answer HTML.
pub const FILTER_RENDERED_QA: &str = "rendered_qa";
/// Gate consulted before a schema-modifying operation proceeds.
pub const GATE_SCHEMA_WILL_CHANGE: &str = "schema_will_change";

/// Fire-and-forget notification payloads.
#[derive(Debug, Clone, Copy)]
pub enum CollectionEvent<'a> {
    NotesWillBeRemoved(&'a [NoteId]),
    CardsWillBeRemoved(&'a [CardId]),
}

type ObserverFn = Box<dyn Fn(&CollectionEvent<'_>)>;
type TextFilterFn = Box<dyn Fn(String) -> String>;
type GateFn = Box<dyn Fn() -> bool>;

/// Registry of observers and filters attached to one collection.
#[derive(Default)]
pub struct HookBus {
    observers: Vec<ObserverFn>,
    text_filters: HashMap<String, Vec<TextFilterFn>>,
    gates: HashMap<String, Vec<GateFn>>,
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an event observer.
    pub fn observe(&mut self, observer: impl Fn(&CollectionEvent<'_>) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Delivers an event to every observer.
    pub fn notify(&self, event: &CollectionEvent<'_>) {
        for observer in &self.observers {
            observer(event);
        }
    }

    /// Registers a value-transforming filter under a name.
    pub fn add_text_filter(
        &mut self,
        name: impl Into<String>,
        filter: impl Fn(String) -> String + 'static,
    ) {
        self.text_filters
            .entry(name.into())
            .or_default()
            .push(Box::new(filter));
    }

    /// Threads a value through every filter registered under the name.
    pub fn run_text_filter(&self, name: &str, value: String) -> String {
        let Some(filters) = self.text_filters.get(name) else {
            return value;
        };
        filters.iter().fold(value, |value, filter| filter(value))
    }

    /// Registers a boolean veto filter under a name.
    pub fn add_gate(&mut self, name: impl Into<String>, gate: impl Fn() -> bool + 'static) {
        self.gates.entry(name.into()).or_default().push(Box::new(gate));
    }

    /// True iff every gate registered under the name consents.
    pub fn run_gates(&self, name: &str) -> bool {
        self.gates
            .get(name)
            .map(|gates| gates.iter().all(|gate| gate()))
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectionEvent, HookBus};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn observers_receive_events_in_order() {
        let seen = Rc::new(Cell::new(0));
        let mut bus = HookBus::new();
        let counter = Rc::clone(&seen);
        bus.observe(move |event| {
            if matches!(event, CollectionEvent::NotesWillBeRemoved(ids) if ids.len() == 2) {
                counter.set(counter.get() + 1);
            }
        });

        bus.notify(&CollectionEvent::NotesWillBeRemoved(&[1, 2]));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn text_filters_chain_in_registration_order() {
        let mut bus = HookBus::new();
        bus.add_text_filter("f", |value| format!("{value}a"));
        bus.add_text_filter("f", |value| format!("{value}b"));
        assert_eq!(bus.run_text_filter("f", "x".to_string()), "xab");
        assert_eq!(bus.run_text_filter("other", "x".to_string()), "x");
    }

    #[test]
    fn gates_default_open_and_veto_wins() {
        let mut bus = HookBus::new();
        assert!(bus.run_gates("g"));
        bus.add_gate("g", || true);
        bus.add_gate("g", || false);
        assert!(!bus.run_gates("g"));
    }
}
