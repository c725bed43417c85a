//! Request ID generation.
//!
//! Every request gets an `x-request-id` (UUID v4) unless the client sent one;
//! the id is echoed on the response and recorded on the request's trace span.

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request id of `request`, or "unknown" if none was assigned.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_generated_ids_are_uuids() {
        let request = Request::new(Body::empty());
        let mut make = MakeRequestUuid;
        let a = make.make_request_id(&request).unwrap();
        let b = make.make_request_id(&request).unwrap();

        let a = a.header_value().to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&a).is_ok());
        assert_ne!(a, b.header_value().to_str().unwrap());
    }

    #[test]
    fn test_request_id_lookup() {
        let request = Request::builder()
            .header(X_REQUEST_ID, "abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_id(&request), "abc");
        assert_eq!(request_id(&Request::new(Body::empty())), "unknown");
    }
}
