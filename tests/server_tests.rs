use flate2::read::GzDecoder;
use fileserver::error::{error_response, Error};
use fileserver::{
    cache_control, Body, DirStore, Entry, FileServer, Handler, MemoryStore, Metadata, Store,
    StripPrefix,
};
use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const FILE_TXT: &str = "Hello, world!";

fn large_text() -> String {
    "All work and no play makes a static file server a dull boy.\n".repeat(100)
}

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("file.txt"), FILE_TXT).unwrap();
    fs::write(dir.path().join("large.txt"), large_text()).unwrap();
    fs::create_dir(dir.path().join("subdir")).unwrap();
    fs::write(dir.path().join("subdir/subfile.txt"), "nested").unwrap();
    dir
}

fn get(uri: &str) -> Request<()> {
    Request::get(uri).body(()).unwrap()
}

fn get_gzip(uri: &str) -> Request<()> {
    Request::get(uri)
        .header(header::ACCEPT_ENCODING, "gzip, deflate")
        .body(())
        .unwrap()
}

fn body(response: Response<Body>) -> Vec<u8> {
    response.into_body().into_bytes().unwrap()
}

fn vary_values(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::VARY)
        .iter()
        .flat_map(|v| v.to_str().unwrap().split(','))
        .map(|v| v.trim().to_string())
        .collect()
}

#[test]
fn test_status_codes() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path()));

    let cases: Vec<(&str, Request<()>, StatusCode)> = vec![
        ("valid file", get("/file.txt"), StatusCode::OK),
        ("valid file in subdir", get("/subdir/subfile.txt"), StatusCode::OK),
        (
            "invalid method",
            Request::post("/file.txt").body(()).unwrap(),
            StatusCode::METHOD_NOT_ALLOWED,
        ),
        ("missing file", get("/foo.txt"), StatusCode::NOT_FOUND),
        ("below a file", get("/file.txt/x"), StatusCode::NOT_FOUND),
        ("directory", get("/subdir"), StatusCode::NOT_FOUND),
        ("root", get("/"), StatusCode::NOT_FOUND),
        ("traversal", get("/../server.rs"), StatusCode::BAD_REQUEST),
        ("trailing slash", get("/subdir/"), StatusCode::BAD_REQUEST),
    ];

    for (name, request, expected) in cases {
        let response = server.handle(request);
        assert_eq!(response.status(), expected, "case: {}", name);
    }
}

#[test]
fn test_default_headers() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path()));

    let response = server.handle(get("/file.txt"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ETAG],
        "\"6cd3556deb0da54bca060b4c39479839\""
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(vary_values(&response), vec!["Accept-Encoding"]);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert!(response.headers().contains_key(header::LAST_MODIFIED));
    assert_eq!(body(response), FILE_TXT.as_bytes());
}

#[test]
fn test_etag_is_stable() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path()));

    let first = server.handle(get("/large.txt"));
    let second = server.handle(get("/large.txt"));
    assert_eq!(first.headers()[header::ETAG], second.headers()[header::ETAG]);

    fs::write(dir.path().join("large.txt"), "changed").unwrap();
    let third = server.handle(get("/large.txt"));
    assert_ne!(first.headers()[header::ETAG], third.headers()[header::ETAG]);
}

#[test]
fn test_gzip_response() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path()));

    let response = server.handle(get_gzip("/large.txt"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    assert_eq!(vary_values(&response), vec!["Accept-Encoding"]);
    // The tag describes the stored bytes, not the encoding.
    assert!(response.headers().contains_key(header::ETAG));

    let content_length: usize = response.headers()[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let compressed = body(response);
    assert_eq!(compressed.len(), content_length);

    let mut decoded = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, large_text());
}

#[test]
fn test_uncompressed_when_not_accepted() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path()));

    let response = server.handle(get("/large.txt"));
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(vary_values(&response), vec!["Accept-Encoding"]);
    assert_eq!(body(response), large_text().as_bytes());
}

#[test]
fn test_small_files_are_not_compressed() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path()));

    let response = server.handle(get_gzip("/file.txt"));
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(body(response), FILE_TXT.as_bytes());
}

#[test]
fn test_head_request() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path()));

    let response = server.handle(Request::head("/file.txt").body(()).unwrap());
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "13");
    assert!(body(response).is_empty());
}

#[test]
fn test_conditional_get() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path()));

    let etag = server.handle(get("/file.txt")).headers()[header::ETAG].clone();
    let response = server.handle(
        Request::get("/file.txt")
            .header(header::IF_NONE_MATCH, etag)
            .body(())
            .unwrap(),
    );
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(body(response).is_empty());
}

#[test]
fn test_range_request() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path()));

    let response = server.handle(
        Request::get("/file.txt")
            .header(header::RANGE, "bytes=7-11")
            .body(())
            .unwrap(),
    );
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 7-11/13");
    assert_eq!(body(response), b"world");
}

#[test]
fn test_custom_etag_fn() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path()))
        .with_etag_fn(Arc::new(|_reader: &mut dyn Read| -> io::Result<String> {
            Ok("\"foo\"".to_string())
        }));

    let response = server.handle(get("/file.txt"));
    assert_eq!(response.headers()[header::ETAG], "\"foo\"");
    // The stream must be whole even though the tag function did not read it.
    assert_eq!(body(response), FILE_TXT.as_bytes());
}

#[test]
fn test_consuming_etag_fn_does_not_truncate() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path())).with_etag_fn(Arc::new(
        |reader: &mut dyn Read| -> io::Result<String> {
            let mut sink = Vec::new();
            reader.read_to_end(&mut sink)?;
            Ok(format!("\"{}\"", sink.len()))
        },
    ));

    let response = server.handle(get("/large.txt"));
    assert_eq!(
        response.headers()[header::ETAG],
        format!("\"{}\"", large_text().len()).as_str()
    );
    assert_eq!(body(response), large_text().as_bytes());
}

#[test]
fn test_failing_etag_fn() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path())).with_etag_fn(Arc::new(
        |_reader: &mut dyn Read| -> io::Result<String> {
            Err(io::Error::other("something went wrong..."))
        },
    ));

    let response = server.handle(get("/file.txt"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::ETAG).is_none());
    assert_eq!(body(response), b"Internal Server Error\n");
}

#[test]
fn test_without_etag() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path())).without_etag();

    let response = server.handle(get("/file.txt"));
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::ETAG).is_none());
}

#[test]
fn test_custom_error_handler() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path())).with_error_handler(Arc::new(
        |_req: &Request<()>, _err: &Error| error_response(StatusCode::IM_A_TEAPOT, "teapot"),
    ));

    let response = server.handle(get("/invalid"));
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body(response), b"teapot\n");
}

#[test]
fn test_error_handler_sees_classification() {
    let dir = fixture();
    let server = FileServer::new(DirStore::new(dir.path())).with_error_handler(Arc::new(
        |req: &Request<()>, err: &Error| {
            let path = fileserver::resolved_path(req).unwrap_or_default();
            let message = format!("{} [{}]", err, path);
            Response::builder()
                .status(err.status())
                .body(Body::from(message.into_bytes()))
                .unwrap()
        },
    ));

    let response = server.handle(get("/subdir"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response), b"file not found [subdir]");
}

#[test]
fn test_cache_control_policies() {
    let dir = fixture();

    let without = FileServer::new(DirStore::new(dir.path())).without_cache_control();
    let response = without.handle(get("/file.txt"));
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());

    let empty = FileServer::new(DirStore::new(dir.path()))
        .with_cache_control(Arc::new(|_req: &Request<()>| String::new()));
    let response = empty.handle(get("/file.txt"));
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());

    let dynamic = FileServer::new(DirStore::new(dir.path())).with_cache_control(Arc::new(
        |req: &Request<()>| {
            let path = fileserver::resolved_path(req).unwrap_or_default();
            if path.starts_with("subdir") {
                "private, no-cache".to_string()
            } else {
                "no-cache".to_string()
            }
        },
    ));
    let response = dynamic.handle(get("/file.txt"));
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    let response = dynamic.handle(get("/subdir/subfile.txt"));
    assert_eq!(response.headers()[header::CACHE_CONTROL], "private, no-cache");

    let immutable = FileServer::new(DirStore::new(dir.path()))
        .with_cache_control(cache_control::immutable(["file.txt"]));
    let response = immutable.handle(get("/file.txt"));
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    let response = immutable.handle(get("/large.txt"));
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=31536000, immutable"
    );
}

#[test]
fn test_preset_vary_is_extended_once() {
    let dir = fixture();
    let mut defaults = HeaderMap::new();
    defaults.insert(header::VARY, HeaderValue::from_static("Origin"));
    defaults.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    let server = FileServer::new(DirStore::new(dir.path())).with_default_headers(defaults);

    let response = server.handle(get_gzip("/large.txt"));
    assert_eq!(vary_values(&response), vec!["Origin", "Accept-Encoding"]);
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

    let mut defaults = HeaderMap::new();
    defaults.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    let server = FileServer::new(DirStore::new(dir.path())).with_default_headers(defaults);
    let response = server.handle(get("/file.txt"));
    assert_eq!(vary_values(&response), vec!["Accept-Encoding"]);

    let mut defaults = HeaderMap::new();
    defaults.insert(header::VARY, HeaderValue::from_static("*"));
    let server = FileServer::new(DirStore::new(dir.path())).with_default_headers(defaults);
    let response = server.handle(get("/file.txt"));
    assert_eq!(vary_values(&response), vec!["*", "Accept-Encoding"]);
}

#[test]
fn test_strip_prefix_mount() {
    let dir = fixture();
    let handler = StripPrefix::new("/static/", FileServer::new(DirStore::new(dir.path())));

    let response = handler.handle(get("/static/subdir/subfile.txt"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response), b"nested");

    let response = handler.handle(get("/static/../file.txt"));
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = handler.handle(get("/elsewhere/file.txt"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Counts opens so tests can tell whether the store was touched.
struct CountingStore {
    inner: MemoryStore,
    opens: AtomicUsize,
}

impl Store for CountingStore {
    type Entry = <MemoryStore as Store>::Entry;

    fn open(&self, path: &str) -> io::Result<Self::Entry> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(path)
    }
}

#[test]
fn test_invalid_method_skips_store() {
    let mut inner = MemoryStore::new();
    inner.insert("file.txt", FILE_TXT);
    let store = CountingStore {
        inner,
        opens: AtomicUsize::new(0),
    };
    let server = FileServer::new(store);

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS] {
        let request = Request::builder()
            .method(method)
            .uri("/file.txt")
            .body(())
            .unwrap();
        let response = server.handle(request);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body(response), b"only GET is supported\n");
    }
    assert_eq!(server.store().opens.load(Ordering::SeqCst), 0);

    server.handle(get("/file.txt"));
    assert_eq!(server.store().opens.load(Ordering::SeqCst), 1);
}

/// A store whose entries fail in configurable ways.
struct BrokenStore {
    open_error: Option<io::ErrorKind>,
}

struct BrokenEntry;

impl Read for BrokenEntry {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("disk read failed"))
    }
}

impl Seek for BrokenEntry {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Ok(0)
    }
}

impl Entry for BrokenEntry {
    fn stat(&self) -> io::Result<Metadata> {
        Ok(Metadata {
            size: 4096,
            modified: None,
            is_dir: false,
        })
    }
}

impl Store for BrokenStore {
    type Entry = BrokenEntry;

    fn open(&self, _path: &str) -> io::Result<BrokenEntry> {
        match self.open_error {
            Some(kind) => Err(io::Error::new(kind, "open failed")),
            None => Ok(BrokenEntry),
        }
    }
}

#[test]
fn test_store_faults_are_server_errors() {
    let server = FileServer::new(BrokenStore {
        open_error: Some(io::ErrorKind::PermissionDenied),
    });
    let response = server.handle(get("/file.txt"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let server = FileServer::new(BrokenStore { open_error: None });
    let response = server.handle(get("/file.txt"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Compression reads the whole entry too.
    let server = FileServer::new(BrokenStore { open_error: None }).without_etag();
    let response = server.handle(get_gzip("/file.txt"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_concurrent_requests() {
    let dir = fixture();
    let server = Arc::new(FileServer::new(DirStore::new(dir.path())));

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let server = Arc::clone(&server);
            thread::spawn(move || {
                let request = if i % 2 == 0 {
                    get_gzip("/large.txt")
                } else {
                    get("/large.txt")
                };
                let response = server.handle(request);
                assert_eq!(response.status(), StatusCode::OK);
                response.headers()[header::ETAG].clone()
            })
        })
        .collect();

    let tags: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert!(tags.windows(2).all(|pair| pair[0] == pair[1]));
}
