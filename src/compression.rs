use flate2::write::GzEncoder;
use flate2::Compression as GzipCompression;
use http::header::{self, HeaderMap};
use std::io::{self, Read};

pub const DEFAULT_GZIP_LEVEL: u32 = 6;
pub const DEFAULT_MIN_SIZE: u64 = 1024;
/// Compression buffers the whole file in memory, so large files are sent as-is.
pub const DEFAULT_MAX_SIZE: u64 = 15 << 20;

/// When and how hard to gzip. Files are compressed only when their size lies strictly
/// between `min_size` and `max_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    pub level: u32,
    pub min_size: u64,
    pub max_size: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_GZIP_LEVEL,
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl CompressionConfig {
    /// Never compress.
    pub fn disabled() -> Self {
        Self {
            level: 0,
            min_size: u64::MAX,
            max_size: 0,
        }
    }

    pub fn worth_compressing(&self, size: u64) -> bool {
        size > self.min_size && size < self.max_size
    }
}

/// Whether the request's `Accept-Encoding` lists gzip with a non-zero weight.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|coding| {
            let mut params = coding.split(';').map(|s| s.trim());
            let name = params.next().unwrap_or("");
            name.eq_ignore_ascii_case("gzip") && !params.any(is_zero_weight)
        })
}

fn is_zero_weight(param: &str) -> bool {
    match param.split_once('=') {
        Some((key, value)) if key.trim().eq_ignore_ascii_case("q") => value
            .trim()
            .parse::<f32>()
            .map(|q| q == 0.0)
            .unwrap_or(false),
        _ => false,
    }
}

/// Reads `reader` to the end and returns the complete gzip stream.
pub fn gzip_buffer<R: Read + ?Sized>(reader: &mut R, level: u32) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), GzipCompression::new(level));
    io::copy(reader, &mut encoder)?;
    encoder.finish()
}
