//! Core aggregate and domain event traits.

use serde::Serialize;

/// Trait for domain events.
///
/// Domain events are facts about a state change and are named in past tense.
pub trait DomainEvent: Serialize + Send + Sync + Clone {
    /// Returns the event type name, used for logging.
    fn event_type(&self) -> &'static str;
}

/// Trait for in-memory aggregates.
///
/// Command methods take `&self`, validate, and return the events that would
/// follow. State only changes through [`Aggregate::apply`], so a rejected
/// command never leaves a partially mutated aggregate behind.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic, and must not fail:
    /// events represent facts that already passed validation.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            tracing::trace!(
                aggregate = Self::aggregate_type(),
                event = event.event_type(),
                "applying event"
            );
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    enum TestEvent {
        Incremented { by: i32 },
        Reset,
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Incremented { .. } => "TestIncremented",
                TestEvent::Reset => "TestReset",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        value: i32,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("test error")]
    struct TestError;

    impl Aggregate for Counter {
        type Event = TestEvent;
        type Error = TestError;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                TestEvent::Incremented { by } => self.value += by,
                TestEvent::Reset => self.value = 0,
            }
        }
    }

    #[test]
    fn apply_events_in_order() {
        let mut counter = Counter::default();
        counter.apply_events(vec![
            TestEvent::Incremented { by: 2 },
            TestEvent::Reset,
            TestEvent::Incremented { by: 5 },
        ]);
        assert_eq!(counter.value, 5);
    }

    #[test]
    fn event_type_names() {
        assert_eq!(TestEvent::Reset.event_type(), "TestReset");
        assert_eq!(
            TestEvent::Incremented { by: 1 }.event_type(),
            "TestIncremented"
        );
    }
}
