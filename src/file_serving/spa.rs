use http::{Method, Request, Response};

use super::content::Body;
use super::path_utils::{resolved_path, ResolvedPath};
use super::{FileServer, Handler};
use crate::error::Error;
use crate::store::{Entry, Store};

/// Serves a single-page application: any path that is missing, malformed or a
/// directory gets the fallback document (usually `index.html` or `200.html`) with a 200,
/// so client-side routes survive a reload.
///
/// The fallback is not checked here; if it is missing the first request that needs it
/// fails with a 404 from the wrapped server.
pub struct SpaServer<S> {
    server: FileServer<S>,
    fallback: String,
}

impl<S: Store> SpaServer<S> {
    pub fn new(server: FileServer<S>, fallback: impl Into<String>) -> Self {
        let fallback = fallback.into();
        let fallback = fallback.trim_start_matches('/').to_string();
        Self { server, fallback }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Decides which store path answers the request. Only "missing" outcomes fall back;
    /// any other store failure is returned as a fault.
    fn target(&self, req: &Request<()>) -> Result<String, Error> {
        let target = match resolved_path(req) {
            Ok(path) if path.is_empty() => return Ok(self.fallback.clone()),
            Ok(path) => path,
            Err(err) if err.is_missing() => return Ok(self.fallback.clone()),
            Err(err) => return Err(err),
        };

        let entry = match self.server.store().open(&target) {
            Ok(entry) => entry,
            Err(e) => {
                let err = Error::from_open(e);
                return if err.is_missing() {
                    log::debug!("No entry for {:?}, serving {}", target, self.fallback);
                    Ok(self.fallback.clone())
                } else {
                    Err(err)
                };
            }
        };

        let stat = entry
            .stat()
            .map_err(|e| Error::fault("failed to stat file", e))?;
        if stat.is_dir {
            log::debug!("{:?} is a directory, serving {}", target, self.fallback);
            Ok(self.fallback.clone())
        } else {
            Ok(target)
        }
    }
}

impl<S: Store> Handler for SpaServer<S> {
    fn handle(&self, mut req: Request<()>) -> Response<Body> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return self.server.serve(req);
        }
        match self.target(&req) {
            Ok(target) => {
                req.extensions_mut().insert(ResolvedPath(target));
                self.server.serve(req)
            }
            Err(err) => self.server.fail(&req, err),
        }
    }
}
