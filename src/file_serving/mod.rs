pub mod content;
mod handlers;
pub mod path_utils;
pub mod spa;

use http::{HeaderMap, Request, Response};
use std::sync::Arc;

use crate::cache_control::{self, CacheControlFn};
use crate::compression::CompressionConfig;
use crate::error::{default_error_handler, ErrorHandler};
use crate::etag::{calculate_etag, ETagFn};
use crate::store::Store;
use content::Body;

/// Anything that turns a request into a response.
///
/// Implemented by [`FileServer`], [`spa::SpaServer`] and [`path_utils::StripPrefix`] so
/// they can be stacked and handed to a router or to the bundled HTTP server.
pub trait Handler: Send + Sync {
    fn handle(&self, req: Request<()>) -> Response<Body>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn handle(&self, req: Request<()>) -> Response<Body> {
        (**self).handle(req)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn handle(&self, req: Request<()>) -> Response<Body> {
        (**self).handle(req)
    }
}

/// Serves files out of a [`Store`] for GET and HEAD requests.
///
/// Every response carries an MD5 `ETag`, `Cache-Control: no-cache` and
/// `Vary: Accept-Encoding`; files between 1 KiB and 15 MiB are gzipped for clients that
/// accept it. Conditional and range requests are answered by
/// [`content::serve_content`]. All of this can be adjusted with the `with_*` builder
/// methods; the server cannot be changed once it starts handling requests.
///
/// ```no_run
/// use fileserver::{DirStore, FileServer, StripPrefix};
///
/// let server = FileServer::new(DirStore::new("public"));
/// let mounted = StripPrefix::new("/static/", server);
/// ```
pub struct FileServer<S> {
    store: S,
    etag_fn: Option<ETagFn>,
    error_handler: ErrorHandler,
    cache_control: Option<CacheControlFn>,
    compression: CompressionConfig,
    default_headers: HeaderMap,
}

impl<S: Store> FileServer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            etag_fn: Some(Arc::new(calculate_etag)),
            error_handler: Arc::new(default_error_handler),
            cache_control: Some(cache_control::no_cache()),
            compression: CompressionConfig::default(),
            default_headers: HeaderMap::new(),
        }
    }

    pub fn with_etag_fn(mut self, etag_fn: ETagFn) -> Self {
        self.etag_fn = Some(etag_fn);
        self
    }

    /// Stops computing entity tags; responses carry no `ETag`.
    pub fn without_etag(mut self) -> Self {
        self.etag_fn = None;
        self
    }

    pub fn with_error_handler(mut self, error_handler: ErrorHandler) -> Self {
        self.error_handler = error_handler;
        self
    }

    pub fn with_cache_control(mut self, cache_control: CacheControlFn) -> Self {
        self.cache_control = Some(cache_control);
        self
    }

    /// Leaves `Cache-Control` out of every response.
    pub fn without_cache_control(mut self) -> Self {
        self.cache_control = None;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    /// Headers copied into every file response before the server adds its own. A `Vary`
    /// given here is extended, not replaced.
    pub fn with_default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: Store> Handler for FileServer<S> {
    fn handle(&self, req: Request<()>) -> Response<Body> {
        self.serve(req)
    }
}
