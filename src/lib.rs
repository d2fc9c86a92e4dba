//! Static file serving over an abstract, read-only file store.
//!
//! [`FileServer`] answers GET and HEAD requests with content-hash `ETag`s,
//! configurable `Cache-Control`, on-the-fly gzip and full conditional/range support.
//! [`SpaServer`] wraps it for single-page applications, and [`StripPrefix`] mounts any
//! [`Handler`] below a URL prefix.
//!
//! ```no_run
//! use fileserver::{cache_control, FileServer, Handler, MemoryStore, SpaServer};
//!
//! let mut store = MemoryStore::new();
//! store.insert("index.html", "<div id=app></div>");
//!
//! let server = FileServer::new(store)
//!     .with_cache_control(cache_control::immutable(["index.html"]));
//! let spa = SpaServer::new(server, "index.html");
//!
//! let response = spa.handle(http::Request::get("/settings").body(()).unwrap());
//! assert_eq!(response.status(), 200);
//! ```

pub mod cache_control;
pub mod compression;
pub mod error;
pub mod etag;
pub mod file_serving;
pub mod logging;
pub mod server;
pub mod store;

pub use cache_control::CacheControlFn;
pub use compression::CompressionConfig;
pub use error::{Error, ErrorHandler};
pub use etag::ETagFn;
pub use file_serving::content::{serve_content, Body};
pub use file_serving::path_utils::{resolved_path, ResolvedPath, StripPrefix};
pub use file_serving::spa::SpaServer;
pub use file_serving::{FileServer, Handler};
pub use store::{DirStore, Entry, MemoryStore, Metadata, Store};
