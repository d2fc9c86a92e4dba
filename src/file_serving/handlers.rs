use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, Request, Response};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::time::Instant;

use super::content::{serve_content, Body};
use super::path_utils::{resolved_path, ResolvedPath};
use super::FileServer;
use crate::compression::{accepts_gzip, gzip_buffer};
use crate::error::Error;
use crate::log_error;
use crate::store::{Entry, Store};

impl<S: Store> FileServer<S> {
    /// Answers one request. Failures go through the configured error handler.
    pub fn serve(&self, mut req: Request<()>) -> Response<Body> {
        let start_time = Instant::now();
        match self.try_serve(&mut req) {
            Ok(response) => {
                log::debug!(
                    "Served {} with {} in {:?}",
                    req.uri(),
                    response.status(),
                    start_time.elapsed()
                );
                response
            }
            Err(err) => self.fail(&req, err),
        }
    }

    pub(crate) fn fail(&self, req: &Request<()>, err: Error) -> Response<Body> {
        match &err {
            Error::Fault { .. } => log_error!(err, format!("Failed to serve {}", req.uri())),
            _ => log::debug!("Rejected {} {}: {}", req.method(), req.uri(), err),
        }
        (self.error_handler)(req, &err)
    }

    fn try_serve(&self, req: &mut Request<()>) -> Result<Response<Body>, Error> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Err(Error::InvalidMethod);
        }

        let path = resolved_path(req)?;
        // Strategies see the same path the store does.
        req.extensions_mut().insert(ResolvedPath(path.clone()));
        let req = &*req;
        if path.is_empty() {
            return Err(Error::NotFound);
        }

        let mut entry = self.store.open(&path).map_err(Error::from_open)?;
        let stat = entry
            .stat()
            .map_err(|e| Error::fault("failed to stat file", e))?;
        if stat.is_dir {
            return Err(Error::NotFound);
        }

        let mut headers = self.default_headers.clone();

        if let Some(etag_fn) = &self.etag_fn {
            let reader: &mut dyn Read = &mut entry;
            let etag =
                etag_fn(reader).map_err(|e| Error::fault("failed to calculate etag", e))?;
            entry
                .seek(SeekFrom::Start(0))
                .map_err(|e| Error::fault("failed to seek content", e))?;
            let value = HeaderValue::try_from(etag.as_str())
                .map_err(|e| Error::fault("invalid etag", io::Error::other(e)))?;
            headers.insert(header::ETAG, value);
        }

        if let Some(cache_control) = &self.cache_control {
            let value = cache_control(req);
            if !value.is_empty() {
                let value = HeaderValue::try_from(value)
                    .map_err(|e| Error::fault("invalid cache-control", io::Error::other(e)))?;
                headers.insert(header::CACHE_CONTROL, value);
            }
        }

        append_vary(&mut headers, "Accept-Encoding");

        let compress =
            accepts_gzip(req.headers()) && self.compression.worth_compressing(stat.size);
        log::debug!(
            "Serving {} {} (gzip: {}, etag: {:?})",
            req.method(),
            path,
            compress,
            headers.get(header::ETAG)
        );
        let response = if compress {
            let compressed = gzip_buffer(&mut entry, self.compression.level)
                .map_err(|e| Error::fault("failed to compress content", e))?;
            drop(entry);

            log::trace!(
                "Compressed {} from {} to {} bytes",
                path,
                stat.size,
                compressed.len()
            );
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(compressed.len()));
            headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            serve_content(req, headers, &path, stat.modified, Cursor::new(compressed))
        } else {
            serve_content(req, headers, &path, stat.modified, entry)
        };

        response.map_err(|e| Error::fault("failed to serve content", e))
    }
}

/// Adds `value` to the `Vary` header unless it is already listed. Values set
/// upstream are kept as they are, including `*`.
pub(crate) fn append_vary(headers: &mut HeaderMap, value: &'static str) {
    let listed = headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|name| name.trim().eq_ignore_ascii_case(value));
    if !listed {
        headers.append(header::VARY, HeaderValue::from_static(value));
    }
}
