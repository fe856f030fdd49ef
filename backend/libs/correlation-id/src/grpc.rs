//! gRPC correlation ID interceptor utilities
use crate::context::{CorrelationContext, GRPC_CORRELATION_ID_KEY};
use crate::id::CorrelationId;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::{service::Interceptor, Request, Status};
use tracing::warn;

/// Attaches the caller's correlation ID to outgoing request metadata.
///
/// Requests built while no ID is bound are sent unchanged.
#[derive(Clone, Default)]
pub struct CorrelationInterceptor;

impl Interceptor for CorrelationInterceptor {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        let Some(id) = CorrelationContext::get() else {
            return Ok(req);
        };

        let value = id
            .is_header_safe()
            .then(|| id.as_str().parse::<MetadataValue<Ascii>>().ok())
            .flatten();
        match value {
            Some(value) => {
                req.metadata_mut().insert(GRPC_CORRELATION_ID_KEY, value);
            }
            None => warn!(correlation_id = %id, "Correlation id is not valid gRPC metadata, skipping"),
        }
        Ok(req)
    }
}

/// Correlation ID carried by an incoming request, if any
pub fn extract_from_request<T>(req: &Request<T>) -> Option<CorrelationId> {
    let raw = req
        .metadata()
        .get(GRPC_CORRELATION_ID_KEY)
        .and_then(|val| val.to_str().ok());
    CorrelationId::parse(raw)
}
