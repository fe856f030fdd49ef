//! Per-execution-context storage slots
//!
//! Every execution context owns exactly one [`Slot`]. Inside a task scope the
//! slot is a tokio task-local and travels with the task between worker
//! threads; everywhere else it is the calling thread's thread-local. All
//! reads and writes go through [`with_slot`] so the identifier and the log
//! fields always resolve to the same context.

use crate::id::CorrelationId;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::Future;
use tracing::warn;

#[derive(Debug, Default, Clone)]
pub(crate) struct Slot {
    pub(crate) correlation_id: Option<CorrelationId>,
    pub(crate) fields: BTreeMap<String, String>,
}

tokio::task_local! {
    static TASK_SLOT: RefCell<Slot>;
}

thread_local! {
    static THREAD_SLOT: RefCell<Slot> = RefCell::new(Slot::default());
}

/// Run `f` against the slot of the calling execution context.
///
/// `f` must not log or re-enter this module: the slot stays borrowed while it
/// runs.
pub(crate) fn with_slot<R>(f: impl FnOnce(&mut Slot) -> R) -> R {
    if in_task_scope() {
        TASK_SLOT.with(|slot| f(&mut *slot.borrow_mut()))
    } else {
        THREAD_SLOT.with(|slot| f(&mut *slot.borrow_mut()))
    }
}

/// Non-panicking read used from the log formatter, which may run while the
/// slot is borrowed or during thread teardown.
pub(crate) fn try_fields() -> Vec<(String, String)> {
    fn collect(slot: &RefCell<Slot>) -> Vec<(String, String)> {
        slot.try_borrow()
            .map(|s| {
                s.fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    if let Ok(fields) = TASK_SLOT.try_with(collect) {
        return fields;
    }
    THREAD_SLOT.try_with(collect).unwrap_or_default()
}

pub(crate) fn in_task_scope() -> bool {
    TASK_SLOT.try_with(|_| ()).is_ok()
}

/// Flag a write that lands on a runtime thread's slot from outside any task
/// scope. Every unscoped task polled on that thread shares the slot.
pub(crate) fn warn_if_unscoped_task(id: &CorrelationId) {
    if tokio::runtime::Handle::try_current().is_ok() && !in_task_scope() {
        warn!(
            correlation_id = %id,
            "Correlation id written outside a task scope; run async work under \
             CorrelationContext::scope, propagator::spawn or headers::in_request_scope"
        );
    }
}

/// Copy of the current slot (ID and log fields), the starting point for a
/// nested task scope
pub(crate) fn snapshot() -> Slot {
    with_slot(|slot| slot.clone())
}

/// Run `future` with its own slot seeded from `slot`.
///
/// Outer slots are never written, so leaving the scope (completion, error or
/// the future being dropped) needs no restoration step.
pub(crate) async fn scope<F>(slot: Slot, future: F) -> F::Output
where
    F: Future,
{
    TASK_SLOT.scope(RefCell::new(slot), future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> Option<CorrelationId> {
        CorrelationId::parse(Some(value))
    }

    #[test]
    fn test_thread_slot_used_outside_task_scope() {
        assert!(!in_task_scope());
        with_slot(|slot| slot.correlation_id = id("thread"));
        assert_eq!(snapshot().correlation_id, id("thread"));
        with_slot(|slot| slot.correlation_id = None);
    }

    #[tokio::test]
    async fn test_task_scope_shadows_thread_slot() {
        with_slot(|slot| slot.correlation_id = id("outer"));

        let seen = scope(
            Slot {
                correlation_id: id("inner"),
                ..Slot::default()
            },
            async {
                tokio::task::yield_now().await;
                assert!(in_task_scope());
                with_slot(|slot| slot.correlation_id.clone())
            },
        )
        .await;

        assert_eq!(seen, id("inner"));
        assert_eq!(snapshot().correlation_id, id("outer"));
        with_slot(|slot| slot.correlation_id = None);
    }

    #[test]
    fn test_try_fields_tolerates_active_borrow() {
        with_slot(|slot| {
            slot.fields.insert("k".into(), "v".into());
            assert!(try_fields().is_empty());
        });
        assert_eq!(try_fields(), vec![("k".to_string(), "v".to_string())]);
        with_slot(|slot| slot.fields.clear());
    }
}
