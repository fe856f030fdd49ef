//! Correlation ID storage for the current execution context
//!
//! Holds at most one correlation ID per execution context. Pure storage: no
//! validation and no policy. Use [`crate::propagator`] for the user-facing
//! operations.
//!
//! ## Execution contexts
//! ```text
//! OS thread  ── thread-local slot (default)
//!   └─ tokio task inside CorrelationContext::scope ── task-local slot
//!        (moves with the task between worker threads)
//! ```
//! A value written in one context is never visible from another one.
//!
//! A plain `tokio::spawn` task is not an execution context of its own: its
//! writes land in the slot of the worker thread polling it, which every other
//! unscoped task on that worker shares. Async work must run under
//! [`CorrelationContext::scope`], [`crate::propagator::spawn`] or
//! [`crate::headers::in_request_scope`]. Writes from such an unscoped task are
//! reported with a `warn!` record.

use crate::id::CorrelationId;
use crate::scope::{self, Slot};
use std::future::Future;

/// gRPC metadata key for correlation ID
pub const GRPC_CORRELATION_ID_KEY: &str = "correlation-id";

/// HTTP header and log field name for correlation ID
pub const CORRELATION_ID_HEADER: &str = "correlation-id";

/// Access to the correlation ID of the calling execution context
pub struct CorrelationContext;

impl CorrelationContext {
    /// Store `id` for the calling context
    pub fn set(id: CorrelationId) {
        scope::warn_if_unscoped_task(&id);
        scope::with_slot(|slot| slot.correlation_id = Some(id));
    }

    /// Current correlation ID, or `None` if never set or cleared
    pub fn get() -> Option<CorrelationId> {
        scope::with_slot(|slot| slot.correlation_id.clone())
    }

    /// Remove the binding for the calling context
    pub fn clear() {
        scope::with_slot(|slot| slot.correlation_id = None);
    }

    /// Store or clear, returning the previous value
    pub fn replace(id: Option<CorrelationId>) -> Option<CorrelationId> {
        scope::with_slot(|slot| std::mem::replace(&mut slot.correlation_id, id))
    }

    /// Run `future` as its own execution context with `id` bound.
    ///
    /// The task gets a fresh slot, so nothing it sets leaks into the caller's
    /// context. Log fields are not inherited; see
    /// [`crate::propagator::with_id_async`] for the variant that keeps them.
    pub async fn scope<F>(id: CorrelationId, future: F) -> F::Output
    where
        F: Future,
    {
        scope::scope(
            Slot {
                correlation_id: Some(id),
                ..Slot::default()
            },
            future,
        )
        .await
    }

    /// Run `future` as its own execution context with no ID bound
    pub async fn scope_empty<F>(future: F) -> F::Output
    where
        F: Future,
    {
        scope::scope(Slot::default(), future).await
    }
}
