//! Static event-name dispatch.
//!
//! Aggregates and projections declare a compile-time table mapping event-name
//! constants to mutator functions. Lookup failures are
//! [`Error::MethodNotFound`]: a missing table entry is a missing
//! implementation, never a data problem.

use crate::error::Error;
use crate::event::Event;

/// A pure state transition applying one event to `T`.
///
/// Mutators only set fields; they never perform I/O or validation.
pub type Mutator<T> = fn(&mut T, &Event) -> Result<(), Error>;

/// Compile-time table from event name to mutator.
pub type DispatchTable<T> = &'static [(&'static str, Mutator<T>)];

/// Resolves `event.name` in `table` and invokes the matching mutator.
///
/// # Errors
/// Returns [`Error::MethodNotFound`] naming `kind` when no entry matches;
/// otherwise whatever the mutator returns.
pub fn dispatch<T>(
    kind: &'static str,
    table: DispatchTable<T>,
    target: &mut T,
    event: &Event,
) -> Result<(), Error> {
    let Some((_, mutator)) = table.iter().find(|(name, _)| *name == event.name) else {
        return Err(Error::MethodNotFound {
            kind,
            event_name: event.name.clone(),
        });
    };
    mutator(target, event)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    #[derive(Default)]
    struct Counter {
        seen: u32,
    }

    fn bump(counter: &mut Counter, _event: &Event) -> Result<(), Error> {
        counter.seen += 1;
        Ok(())
    }

    const TABLE: DispatchTable<Counter> = &[("org/test/counter/bumped", bump)];

    fn event_named(name: &str) -> Event {
        Event::new(name, Uuid::new_v4(), 1, Utc::now(), None, &json!({})).unwrap()
    }

    #[test]
    fn test_dispatch_invokes_the_matching_mutator() {
        // Arrange
        let mut counter = Counter::default();
        let event = event_named("org/test/counter/bumped");

        // Act
        let result = dispatch("Counter", TABLE, &mut counter, &event);

        // Assert
        assert!(result.is_ok());
        assert_eq!(counter.seen, 1);
    }

    #[test]
    fn test_unregistered_name_is_method_not_found() {
        // Arrange
        let mut counter = Counter::default();
        let event = event_named("org/test/counter/dropped");

        // Act
        let result = dispatch("Counter", TABLE, &mut counter, &event);

        // Assert
        match result {
            Err(Error::MethodNotFound { kind, event_name }) => {
                assert_eq!(kind, "Counter");
                assert_eq!(event_name, "org/test/counter/dropped");
            }
            other => panic!("expected MethodNotFound, got {other:?}"),
        }
        assert_eq!(counter.seen, 0);
    }
}
