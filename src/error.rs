use http::header::{self, HeaderValue};
use http::{Request, Response, StatusCode};
use std::io;
use std::sync::Arc;

use crate::file_serving::content::Body;

/// Conditions that terminate a request before any file content is sent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Only GET and HEAD are served.
    #[error("invalid http method")]
    InvalidMethod,
    /// The path is empty, missing from the store, or names a directory.
    #[error("file not found")]
    NotFound,
    /// The store rejected the path as malformed.
    #[error("invalid file path")]
    InvalidPath,
    /// Any other I/O failure. The source is kept for logging but never shown to clients.
    #[error("{context}: {source}")]
    Fault {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn fault(context: &'static str, source: io::Error) -> Self {
        Error::Fault { context, source }
    }

    /// Classifies a failed `Store::open`.
    pub fn from_open(source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::InvalidInput => Error::InvalidPath,
            io::ErrorKind::NotFound => Error::NotFound,
            _ => Error::fault("failed to open file", source),
        }
    }

    /// True for the conditions that the SPA wrapper answers with its fallback document.
    pub fn is_missing(&self) -> bool {
        matches!(self, Error::NotFound | Error::InvalidPath)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidPath => StatusCode::BAD_REQUEST,
            Error::Fault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Renders an [`Error`] into a response. Replaceable through
/// [`FileServer::with_error_handler`](crate::FileServer::with_error_handler).
pub type ErrorHandler = Arc<dyn Fn(&Request<()>, &Error) -> Response<Body> + Send + Sync>;

pub fn default_error_handler(_req: &Request<()>, err: &Error) -> Response<Body> {
    let mut response = match err {
        Error::InvalidMethod => error_response(err.status(), "only GET is supported"),
        Error::NotFound => error_response(err.status(), "file not found"),
        Error::InvalidPath => error_response(err.status(), "invalid file path"),
        Error::Fault { .. } => error_response(err.status(), "Internal Server Error"),
    };
    if let Error::InvalidMethod = err {
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
    }
    response
}

/// Plain-text error response with the message followed by a newline.
pub fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    let body = format!("{}\n", message).into_bytes();
    let length = body.len();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    response
}
