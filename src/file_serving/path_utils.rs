use http::{Request, Response, StatusCode};
use percent_encoding::percent_decode_str;

use super::content::Body;
use super::Handler;
use crate::error::{error_response, Error};

/// The store path a request is served from, once mounting and SPA rewriting are done.
///
/// Wrappers insert it into the request extensions; when absent the path is derived
/// from the request URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath(pub String);

/// The store path for `req`: the [`ResolvedPath`] extension if set, otherwise the
/// percent-decoded URI path with its leading slash removed.
pub fn resolved_path<B>(req: &Request<B>) -> Result<String, Error> {
    if let Some(ResolvedPath(path)) = req.extensions().get::<ResolvedPath>() {
        return Ok(path.clone());
    }
    let decoded = decode_path(req.uri().path())?;
    Ok(decoded
        .strip_prefix('/')
        .map(str::to_string)
        .unwrap_or(decoded))
}

fn decode_path(path: &str) -> Result<String, Error> {
    percent_decode_str(path)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| {
            log::debug!("Failed to decode path {}: {}", path, e);
            Error::InvalidPath
        })
}

/// Mounts a handler below a URL prefix, e.g. `StripPrefix::new("/static/", server)`
/// serves `/static/app.js` from store path `app.js`.
pub struct StripPrefix<H> {
    prefix: String,
    inner: H,
}

impl<H: Handler> StripPrefix<H> {
    pub fn new(prefix: impl Into<String>, inner: H) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }
}

impl<H: Handler> Handler for StripPrefix<H> {
    fn handle(&self, mut req: Request<()>) -> Response<Body> {
        let stripped = decode_path(req.uri().path())
            .ok()
            .and_then(|path| path.strip_prefix(self.prefix.as_str()).map(str::to_string));

        match stripped {
            Some(rest) => {
                log::trace!("Stripped prefix {} -> {:?}", self.prefix, rest);
                req.extensions_mut().insert(ResolvedPath(rest));
                self.inner.handle(req)
            }
            None => error_response(StatusCode::NOT_FOUND, "404 page not found"),
        }
    }
}
