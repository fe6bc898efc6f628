//! Request/response boundary consumed by the dispatch core.
//!
//! The core never parses HTTP itself. A host hands every request to the core as an
//! [`Exchange`]: the request and response capabilities plus the id used to
//! correlate log records of every controller instance the request creates.

pub mod request;
pub mod response;

pub use request::{parse_query_params, HttpRequest, Request};
pub use response::{status_reason, BufferedResponse, Response};

use crate::ids::RequestId;
use std::sync::Arc;

/// Request and response shared by every controller instance of one request.
#[derive(Clone)]
pub struct Exchange {
    request: Arc<dyn Request>,
    response: Arc<dyn Response>,
    request_id: RequestId,
}

impl Exchange {
    #[must_use]
    pub fn new(request: Arc<dyn Request>, response: Arc<dyn Response>) -> Self {
        let request_id = RequestId::from_header_or_new(request.header("x-request-id"));
        Self {
            request,
            response,
            request_id,
        }
    }

    #[must_use]
    pub fn request(&self) -> &dyn Request {
        self.request.as_ref()
    }

    #[must_use]
    pub fn response(&self) -> &dyn Response {
        self.response.as_ref()
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("method", self.request.method())
            .field("uri", &self.request.uri())
            .field("request_id", &self.request_id)
            .finish()
    }
}
