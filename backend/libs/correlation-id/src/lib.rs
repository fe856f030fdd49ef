//! Correlation ID propagation for distributed tracing
//!
//! Carries one correlation ID through every hop of a logical request so log
//! lines from different services can be joined afterwards.
//!
//! ## Architecture
//! ```text
//! Inbound request
//!   ↓ (correlation-id header; headers::in_request_scope extracts or generates)
//! Handler task  ── CorrelationContext (task-local / thread-local slot)
//!   │               └─ log_context mirror → CorrelationFormat log prefix
//!   ├─ propagator::with_id     temporary ID, restored on every exit path
//!   ├─ propagator::spawn/wrap  capture now, install on the worker
//!   ↓
//! Outbound call ── headers::inject / grpc::CorrelationInterceptor
//! ```
//!
//! ## Example
//! ```rust
//! use correlation_id::{propagator, CorrelationContext};
//!
//! propagator::update("req-42");
//!
//! let inner = propagator::with_id("batch-7", || {
//!     Ok::<_, std::io::Error>(CorrelationContext::get())
//! })
//! .unwrap();
//!
//! assert_eq!(inner.unwrap().as_str(), "batch-7");
//! assert_eq!(CorrelationContext::get().unwrap().as_str(), "req-42");
//! ```

pub mod config;
pub mod context;
pub mod error;
#[cfg(feature = "grpc")]
pub mod grpc;
pub mod headers;
pub mod id;
pub mod log_context;
pub mod propagator;
mod scope;
pub mod telemetry;

pub use config::PropagationConfig;
pub use context::{CorrelationContext, CORRELATION_ID_HEADER, GRPC_CORRELATION_ID_KEY};
pub use error::{BoxError, ConfigError, CorrelationError, Failure};
#[cfg(feature = "grpc")]
pub use grpc::CorrelationInterceptor;
pub use id::{CorrelationId, IntoCorrelationId};
pub use telemetry::{init_tracing, CorrelationFormat, LoggingConfig};
