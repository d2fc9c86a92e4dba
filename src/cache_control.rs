use http::Request;
use std::collections::HashSet;
use std::sync::Arc;

use crate::file_serving::path_utils::resolved_path;

/// Produces the `Cache-Control` value for a request. An empty string means the header
/// is left out entirely.
pub type CacheControlFn = Arc<dyn Fn(&Request<()>) -> String + Send + Sync>;

pub const NO_CACHE: &str = "no-cache";
pub const IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Forces revalidation of every response.
pub fn no_cache() -> CacheControlFn {
    Arc::new(|_req: &Request<()>| NO_CACHE.to_string())
}

/// Marks everything immutable except the listed paths, which stay `no-cache`.
///
/// Meant for bundler output where assets carry a content hash in their name and only
/// entry documents such as `index.html` change in place. Paths are compared against
/// the resolved store path (no leading slash).
pub fn immutable<I, S>(exclusions: I) -> CacheControlFn
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let exclusions: HashSet<String> = exclusions.into_iter().map(Into::into).collect();
    Arc::new(move |req: &Request<()>| {
        let excluded = resolved_path(req)
            .map(|path| exclusions.contains(path.as_str()))
            .unwrap_or(false);
        if excluded {
            NO_CACHE.to_string()
        } else {
            IMMUTABLE.to_string()
        }
    })
}
