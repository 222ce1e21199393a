//! Transport guard for the webhook endpoint.
//!
//! Classifies a request by method and content type before any body is read.
//! The method is checked first, so a GET with a multipart content type is
//! still a 405.

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};

/// Content type the webhook endpoint accepts.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Reason a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MethodNotAllowed,
    BadRequest,
}

impl Rejection {
    pub fn status(self) -> StatusCode {
        match self {
            Rejection::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Rejection::BadRequest => StatusCode::BAD_REQUEST,
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            Rejection::MethodNotAllowed => "Method Not Allowed",
            Rejection::BadRequest => "Bad Request",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}

/// Guard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(Rejection),
}

/// Decide whether a request may proceed to body decoding.
pub fn admit(method: &Method, content_type: Option<&str>) -> Decision {
    if *method != Method::POST {
        return Decision::Reject(Rejection::MethodNotAllowed);
    }

    match content_type {
        Some(ct) if ct.contains(MULTIPART_FORM_DATA) => Decision::Accept,
        _ => Decision::Reject(Rejection::BadRequest),
    }
}
