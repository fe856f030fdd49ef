//! Scoped updates and cross-worker handoff of the correlation ID
//!
//! Everything here is layered on [`CorrelationContext`]:
//!
//! - [`update`] installs an ID and mirrors it into the log context
//! - [`with_id`] / [`with_id_async`] / [`with_id_timeout`] run work under a
//!   temporary ID and restore the previous one on every exit path
//! - [`wrap`] / [`wrap_with_arg`] / [`wrap_future`] capture the current ID now
//!   and install it wherever the work eventually runs
//!
//! ## Example
//! ```rust
//! use correlation_id::{propagator, CorrelationContext};
//!
//! propagator::update("req-1");
//!
//! let job = propagator::wrap(|| CorrelationContext::get());
//! propagator::update("req-2");
//!
//! let seen = std::thread::spawn(job).join().unwrap();
//! assert_eq!(seen.unwrap().as_str(), "req-1");
//! assert_eq!(CorrelationContext::get().unwrap().as_str(), "req-2");
//! ```

use crate::context::{CorrelationContext, CORRELATION_ID_HEADER};
use crate::error::{CorrelationError, Failure};
use crate::id::{CorrelationId, IntoCorrelationId};
use crate::log_context;
use crate::scope::{self, Slot};
use futures::FutureExt;
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Current correlation ID of the calling execution context
pub fn current() -> Option<CorrelationId> {
    CorrelationContext::get()
}

/// Install `identifier` for the calling context.
///
/// Blank or absent identifiers are ignored and never overwrite an existing
/// value.
///
/// Inside a tokio runtime, call this from a task scope
/// ([`CorrelationContext::scope`], [`spawn`] or
/// [`crate::headers::in_request_scope`]). A plain `tokio::spawn` task writes
/// to its worker thread's slot, which other unscoped tasks on that worker
/// then read; such writes are logged with `warn!`.
pub fn update(identifier: impl IntoCorrelationId) {
    if let Some(id) = identifier.into_correlation_id() {
        scope::warn_if_unscoped_task(&id);
        apply(id);
    }
}

/// Run `work` with `temporary` as the active ID, then restore the previous ID.
///
/// Restoration happens on every exit path, including a panic inside `work`.
/// Errors are classified through [`Failure`] and logged once before the
/// previous ID comes back; a panic is reported as
/// [`CorrelationError::Failed`].
pub fn with_id<T, E, F>(
    temporary: impl IntoCorrelationId,
    work: F,
) -> Result<T, CorrelationError<E>>
where
    F: FnOnce() -> Result<T, E>,
    E: Failure + Display,
{
    let _restore = Restore::save();
    if let Some(id) = temporary.into_correlation_id() {
        apply(id);
    }
    settle(panic::catch_unwind(AssertUnwindSafe(work)))
}

/// Async [`with_id`].
///
/// The future runs in its own task scope seeded from the caller's context, so
/// the caller's ID is untouched whether the future completes, fails, panics
/// or is dropped before completion.
pub async fn with_id_async<T, E, F>(
    temporary: impl IntoCorrelationId,
    future: F,
) -> Result<T, CorrelationError<E>>
where
    F: Future<Output = Result<T, E>>,
    E: Failure + Display,
{
    let slot = seeded(temporary.into_correlation_id());
    scope::scope(slot, async move {
        settle(AssertUnwindSafe(future).catch_unwind().await)
    })
    .await
}

/// [`with_id_async`] with a deadline.
///
/// Expiry yields [`CorrelationError::TimedOut`]; the unfinished future is
/// dropped inside its scope.
pub async fn with_id_timeout<T, E, F>(
    temporary: impl IntoCorrelationId,
    deadline: Duration,
    future: F,
) -> Result<T, CorrelationError<E>>
where
    F: Future<Output = Result<T, E>>,
    E: Failure + Display,
{
    let slot = seeded(temporary.into_correlation_id());
    scope::scope(slot, async move {
        let outcome = AssertUnwindSafe(tokio::time::timeout(deadline, future))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => settle(Ok(result)),
            Ok(Err(elapsed)) => report(CorrelationError::TimedOut(Box::new(elapsed))),
            Err(payload) => settle(Err(payload)),
        }
    })
    .await
}

/// Capture the current ID and return work that runs under it.
///
/// The returned closure may run on any thread. It saves that thread's ID,
/// installs the captured one, runs `work` and restores the saved ID, even if
/// `work` panics. When nothing was captured the executing thread keeps its
/// own ID.
pub fn wrap<T, F>(work: F) -> impl FnOnce() -> T
where
    F: FnOnce() -> T,
{
    let captured = CorrelationContext::get();
    move || {
        let _restore = Restore::save();
        if let Some(id) = captured {
            apply(id);
        }
        work()
    }
}

/// Single-argument [`wrap`]. Bind extra arguments into a tuple or closure.
pub fn wrap_with_arg<A, T, F>(work: F) -> impl FnOnce(A) -> T
where
    F: FnOnce(A) -> T,
{
    let captured = CorrelationContext::get();
    move |arg| {
        let _restore = Restore::save();
        if let Some(id) = captured {
            apply(id);
        }
        work(arg)
    }
}

/// Capture the current context and return a future that runs under it.
///
/// The ID and log fields are copied now, when the future is wrapped. The
/// context that later polls it is never consulted, so a future wrapped with
/// nothing bound runs with nothing bound.
pub fn wrap_future<F>(future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let slot = scope::snapshot();
    async move { scope::scope(slot, future).await }
}

/// `tokio::spawn` carrying the current ID into the new task
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(wrap_future(future))
}

/// `tokio::task::spawn_blocking` carrying the current ID onto the blocking
/// pool thread
pub fn spawn_blocking<F, T>(work: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(wrap(work))
}

/// [`update`] without the unscoped-task check. Synchronous callers restore
/// the previous ID before returning, so no other task can observe the write.
fn apply(id: CorrelationId) {
    debug!(correlation_id = %id, "Updating correlation id");
    install(Some(id));
}

/// Store or clear the ID together with its log field, returning the previous
/// ID
fn install(id: Option<CorrelationId>) -> Option<CorrelationId> {
    match &id {
        Some(value) => log_context::put(CORRELATION_ID_HEADER, value.as_str()),
        None => {
            log_context::remove(CORRELATION_ID_HEADER);
        }
    }
    CorrelationContext::replace(id)
}

/// Restores the saved ID when dropped
struct Restore {
    previous: Option<CorrelationId>,
}

impl Restore {
    fn save() -> Self {
        Self {
            previous: CorrelationContext::get(),
        }
    }
}

impl Drop for Restore {
    fn drop(&mut self) {
        install(self.previous.take());
    }
}

/// Slot for a nested task scope: the caller's state with `id` applied using
/// [`update`] semantics
fn seeded(id: Option<CorrelationId>) -> Slot {
    let mut slot = scope::snapshot();
    if let Some(id) = id {
        debug!(correlation_id = %id, "Updating correlation id");
        slot.fields
            .insert(CORRELATION_ID_HEADER.to_string(), id.to_string());
        slot.correlation_id = Some(id);
    }
    slot
}

fn settle<T, E>(
    outcome: Result<Result<T, E>, Box<dyn Any + Send>>,
) -> Result<T, CorrelationError<E>>
where
    E: Failure + Display,
{
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => report(e.classify()),
        Err(payload) => report(CorrelationError::Failed(panic_message(payload).into())),
    }
}

fn report<T, E: Display>(err: CorrelationError<E>) -> Result<T, CorrelationError<E>> {
    error!(error = %err, "Exception occurred while executing work under correlation id");
    Err(err)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("work panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("work panicked: {msg}")
    } else {
        "work panicked".to_string()
    }
}
