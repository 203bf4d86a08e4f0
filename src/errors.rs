use crate::{query, Method, StatusCode};
use std::io;
use thiserror::Error;

/// Reasons a request head or body could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRequest {
    #[error("request line `{0}` is not `METHOD TARGET VERSION`")]
    RequestLine(String),
    #[error("unknown method `{0}`")]
    InvalidMethod(String),
    #[error("unsupported protocol version `{0}`")]
    UnsupportedVersion(String),
    #[error("header line `{0}` is not `Name: value`")]
    InvalidHeader(String),
    #[error("invalid Content-Length `{0}`")]
    InvalidContentLength(String),
    #[error("transfer-encoding `{0}` is not supported")]
    UnsupportedTransferEncoding(String),
    #[error("request head is not valid UTF-8")]
    InvalidEncoding,
    #[error("connection closed before the end of the request head")]
    IncompleteHead,
    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),
    #[error("more than {0} headers")]
    TooManyHeaders(usize),
    #[error("body of {0} bytes exceeds the limit")]
    BodyTooLarge(usize),
}

/// Failure conditions routed to the [`ExceptionHandler`](crate::ExceptionHandler) chain.
///
/// Parsing produces the first two kinds; routing and
/// [`Controller`](crate::Controller)s produce the rest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Condition {
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] MalformedRequest),
    #[error("malformed query: {0}")]
    MalformedQuery(#[from] query::Error),
    #[error("nothing found for `{0}`")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("method {method} not allowed for `{path}`")]
    MethodNotAllowed { method: Method, path: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl Condition {
    /// Status code conventionally used for this condition.
    pub const fn status(&self) -> StatusCode {
        match self {
            Condition::MalformedRequest(_) | Condition::MalformedQuery(_) => StatusCode::BadRequest,
            Condition::NotFound(_) => StatusCode::NotFound,
            Condition::Unauthorized(_) => StatusCode::Unauthorized,
            Condition::MethodNotAllowed { .. } => StatusCode::MethodNotAllowed,
            Condition::Internal(_) => StatusCode::InternalServerError,
        }
    }
}

// Connection-level failure: either the peer sent something unusable or the
// socket itself failed.
#[derive(Debug, Error)]
pub(crate) enum ErrorKind {
    #[error(transparent)]
    Condition(#[from] Condition),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<MalformedRequest> for ErrorKind {
    fn from(err: MalformedRequest) -> Self {
        ErrorKind::Condition(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_per_condition() {
        #[rustfmt::skip]
        let cases = [
            (Condition::MalformedRequest(MalformedRequest::IncompleteHead), 400),
            (Condition::MalformedQuery(query::Error::MalformedParameter("a".into())), 400),
            (Condition::NotFound("/x".into()), 404),
            (Condition::Unauthorized("bad password".into()), 401),
            (Condition::MethodNotAllowed { method: Method::Put, path: "/login".into() }, 405),
            (Condition::Internal("boom".into()), 500),
        ];

        for (condition, code) in cases {
            assert_eq!(condition.status().as_u16(), code, "{condition}");
        }
    }

    #[test]
    fn display() {
        let err = Condition::MethodNotAllowed {
            method: Method::Delete,
            path: "/register".into(),
        };
        assert_eq!(err.to_string(), "method DELETE not allowed for `/register`");

        let err: Condition = query::Error::MalformedParameter("flag".into()).into();
        assert_eq!(
            err.to_string(),
            "malformed query: query parameter `flag` has no `=value` part"
        );
    }
}
