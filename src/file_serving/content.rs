//! Conditional and partial responses for a seekable body.
//!
//! [`serve_content`] evaluates `If-Match`, `If-Unmodified-Since`, `If-None-Match`,
//! `If-Modified-Since`, `If-Range` and `Range` against the `ETag` already present in
//! the supplied headers and the modification time, then answers with 200, 206, 304,
//! 412 or 416.

use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::error_response;

/// A response body. File contents are streamed straight from the store entry, which
/// stays open until the body is written or dropped.
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Full(Vec<u8>),
    Stream(Box<dyn Read + Send>),
}

impl Body {
    pub fn empty() -> Self {
        Body::Empty
    }

    /// Copies the body into `writer`, returning the number of bytes written.
    pub fn write_to<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<u64> {
        match self {
            Body::Empty => Ok(0),
            Body::Full(bytes) => {
                writer.write_all(&bytes)?;
                Ok(bytes.len() as u64)
            }
            Body::Stream(mut reader) => io::copy(&mut reader, writer),
        }
    }

    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Full(bytes)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Full(text.as_bytes().to_vec())
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Full(bytes) => write!(f, "Body::Full({} bytes)", bytes.len()),
            Body::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    None,
    True,
    False,
}

/// Builds the response for `content`.
///
/// `headers` carries whatever the caller has already decided (`ETag`, `Cache-Control`,
/// `Content-Encoding`, ...). `name` is only used to infer `Content-Type` when the
/// caller has not set one. `content` must be positioned at its start.
pub fn serve_content<R>(
    req: &Request<()>,
    mut headers: HeaderMap,
    name: &str,
    modified: Option<SystemTime>,
    mut content: R,
) -> io::Result<Response<Body>>
where
    R: Read + Seek + Send + 'static,
{
    let modified = modified.filter(|time| *time != UNIX_EPOCH);
    if let Some(time) = modified {
        headers.insert(header::LAST_MODIFIED, header_value(httpdate::fmt_http_date(time))?);
    }

    let is_get_or_head = req.method() == Method::GET || req.method() == Method::HEAD;
    let etag = headers
        .get(header::ETAG)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let etag = etag.as_deref();

    let mut condition = check_if_match(req, etag);
    if condition == Condition::None {
        condition = check_if_unmodified_since(req, modified);
    }
    if condition == Condition::False {
        return Ok(precondition_failed(headers));
    }

    match check_if_none_match(req, etag) {
        Condition::False if is_get_or_head => return Ok(not_modified(headers)),
        Condition::False => return Ok(precondition_failed(headers)),
        Condition::None if check_if_modified_since(req, modified) == Condition::False => {
            return Ok(not_modified(headers));
        }
        _ => {}
    }

    let mut range_header = header_str(req, header::RANGE);
    if range_header.is_some() && check_if_range(req, etag, modified) == Condition::False {
        range_header = None;
    }

    if !headers.contains_key(header::CONTENT_TYPE) {
        let mime_type = mime_guess::from_path(name).first_or_octet_stream();
        headers.insert(header::CONTENT_TYPE, header_value(mime_type.to_string())?);
    }

    let size = content.seek(SeekFrom::End(0))?;
    content.seek(SeekFrom::Start(0))?;

    let mut status = StatusCode::OK;
    let mut start = 0;
    let mut length = size;

    if let Some(range) = range_header {
        match parse_range(range, size) {
            Ok(ranges) if ranges.len() == 1 => {
                let (range_start, range_length) = ranges[0];
                start = range_start;
                length = range_length;
                status = StatusCode::PARTIAL_CONTENT;
                headers.insert(
                    header::CONTENT_RANGE,
                    header_value(format!(
                        "bytes {}-{}/{}",
                        start,
                        start + length - 1,
                        size
                    ))?,
                );
            }
            Ok(ranges) if ranges.is_empty() => {
                log::debug!("Ignoring range {:?}, serving full content", range);
            }
            Ok(ranges) => {
                log::debug!("Ignoring multi-range request ({} ranges)", ranges.len());
            }
            Err(RangeError::NoOverlap) => {
                let mut response =
                    range_not_satisfiable(headers, "invalid range: failed to overlap");
                response.headers_mut().insert(
                    header::CONTENT_RANGE,
                    header_value(format!("bytes */{}", size))?,
                );
                return Ok(response);
            }
            Err(RangeError::Invalid) => {
                return Ok(range_not_satisfiable(headers, "invalid range"));
            }
        }
    }

    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    let body = if req.method() == Method::HEAD {
        Body::Empty
    } else {
        if start > 0 {
            content.seek(SeekFrom::Start(start))?;
        }
        Body::Stream(Box::new(content.take(length)))
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

fn header_value(value: String) -> io::Result<HeaderValue> {
    HeaderValue::try_from(value).map_err(io::Error::other)
}

fn header_str(req: &Request<()>, name: header::HeaderName) -> Option<&str> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

fn not_modified(mut headers: HeaderMap) -> Response<Body> {
    headers.remove(header::CONTENT_TYPE);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_ENCODING);
    if headers.contains_key(header::ETAG) {
        headers.remove(header::LAST_MODIFIED);
    }
    let mut response = Response::new(Body::Empty);
    *response.status_mut() = StatusCode::NOT_MODIFIED;
    *response.headers_mut() = headers;
    response
}

fn precondition_failed(mut headers: HeaderMap) -> Response<Body> {
    headers.remove(header::CONTENT_TYPE);
    headers.remove(header::CONTENT_ENCODING);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
    let mut response = Response::new(Body::Empty);
    *response.status_mut() = StatusCode::PRECONDITION_FAILED;
    *response.headers_mut() = headers;
    response
}

fn range_not_satisfiable(mut headers: HeaderMap, message: &str) -> Response<Body> {
    headers.remove(header::CONTENT_TYPE);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_ENCODING);
    let mut response = error_response(StatusCode::RANGE_NOT_SATISFIABLE, message);
    for (name, value) in headers.iter() {
        if !response.headers().contains_key(name) {
            response.headers_mut().append(name, value.clone());
        }
    }
    response
}

fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => UNIX_EPOCH + Duration::from_secs(elapsed.as_secs()),
        Err(_) => time,
    }
}

fn check_if_match(req: &Request<()>, etag: Option<&str>) -> Condition {
    let Some(value) = header_str(req, header::IF_MATCH) else {
        return Condition::None;
    };
    let matched = scan_etags(value)
        .into_iter()
        .any(|candidate| candidate == "*" || etag.is_some_and(|etag| strong_match(candidate, etag)));
    if matched {
        Condition::True
    } else {
        Condition::False
    }
}

fn check_if_unmodified_since(req: &Request<()>, modified: Option<SystemTime>) -> Condition {
    let (Some(value), Some(modified)) = (header_str(req, header::IF_UNMODIFIED_SINCE), modified)
    else {
        return Condition::None;
    };
    match httpdate::parse_http_date(value) {
        Ok(since) if truncate_to_seconds(modified) <= since => Condition::True,
        Ok(_) => Condition::False,
        Err(_) => Condition::None,
    }
}

fn check_if_none_match(req: &Request<()>, etag: Option<&str>) -> Condition {
    let Some(value) = header_str(req, header::IF_NONE_MATCH) else {
        return Condition::None;
    };
    let matched = scan_etags(value)
        .into_iter()
        .any(|candidate| candidate == "*" || etag.is_some_and(|etag| weak_match(candidate, etag)));
    if matched {
        Condition::False
    } else {
        Condition::True
    }
}

fn check_if_modified_since(req: &Request<()>, modified: Option<SystemTime>) -> Condition {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return Condition::None;
    }
    let (Some(value), Some(modified)) = (header_str(req, header::IF_MODIFIED_SINCE), modified)
    else {
        return Condition::None;
    };
    match httpdate::parse_http_date(value) {
        Ok(since) if truncate_to_seconds(modified) <= since => Condition::False,
        Ok(_) => Condition::True,
        Err(_) => Condition::None,
    }
}

fn check_if_range(req: &Request<()>, etag: Option<&str>, modified: Option<SystemTime>) -> Condition {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return Condition::None;
    }
    let Some(value) = header_str(req, header::IF_RANGE) else {
        return Condition::None;
    };
    if value.starts_with('"') || value.starts_with("W/") {
        let matched = scan_etags(value)
            .first()
            .is_some_and(|candidate| etag.is_some_and(|etag| strong_match(candidate, etag)));
        return if matched {
            Condition::True
        } else {
            Condition::False
        };
    }
    match (modified, httpdate::parse_http_date(value)) {
        (Some(modified), Ok(date)) if truncate_to_seconds(modified) == date => Condition::True,
        _ => Condition::False,
    }
}

/// Splits an entity-tag list (`"a", W/"b"` or `*`) into its tags. Parsing stops at the
/// first malformed element.
fn scan_etags(value: &str) -> Vec<&str> {
    let mut tags = Vec::new();
    let mut rest = value;
    loop {
        rest = rest.trim_start_matches(|c: char| c == ',' || c.is_ascii_whitespace());
        if rest.is_empty() {
            break;
        }
        if let Some(after) = rest.strip_prefix('*') {
            tags.push("*");
            rest = after;
            continue;
        }
        let opaque_start = if rest.starts_with("W/\"") {
            2
        } else if rest.starts_with('"') {
            0
        } else {
            break;
        };
        match rest[opaque_start + 1..].find('"') {
            Some(close) => {
                let end = opaque_start + 1 + close + 1;
                tags.push(&rest[..end]);
                rest = &rest[end..];
            }
            None => break,
        }
    }
    tags
}

fn strong_match(a: &str, b: &str) -> bool {
    a == b && !a.starts_with("W/")
}

fn weak_match(a: &str, b: &str) -> bool {
    a.trim_start_matches("W/") == b.trim_start_matches("W/")
}

#[derive(Debug, PartialEq, Eq)]
enum RangeError {
    Invalid,
    NoOverlap,
}

/// Parses a `bytes=` range header into `(start, length)` pairs clamped to `size`.
fn parse_range(value: &str, size: u64) -> Result<Vec<(u64, u64)>, RangeError> {
    let byte_ranges = value.strip_prefix("bytes=").ok_or(RangeError::Invalid)?;
    let mut ranges = Vec::new();
    let mut no_overlap = false;

    for part in byte_ranges.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let (first, last) = part.split_once('-').ok_or(RangeError::Invalid)?;
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            // Suffix range: the final `last` bytes.
            let suffix: u64 = last.parse().map_err(|_| RangeError::Invalid)?;
            if suffix == 0 || size == 0 {
                no_overlap = true;
                continue;
            }
            let suffix = suffix.min(size);
            ranges.push((size - suffix, suffix));
            continue;
        }

        let start: u64 = first.parse().map_err(|_| RangeError::Invalid)?;
        if start >= size {
            no_overlap = true;
            continue;
        }
        let length = if last.is_empty() {
            size - start
        } else {
            let end: u64 = last.parse().map_err(|_| RangeError::Invalid)?;
            if start > end {
                return Err(RangeError::Invalid);
            }
            end.min(size - 1) - start + 1
        };
        ranges.push((start, length));
    }

    if ranges.is_empty() && no_overlap {
        return Err(RangeError::NoOverlap);
    }
    let total: u64 = ranges.iter().map(|(_, length)| length).sum();
    if total > size {
        // Overlapping ranges asking for more than the file; serve it whole instead.
        return Ok(Vec::new());
    }
    Ok(ranges)
}
