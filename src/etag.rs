use md5::{Digest, Md5};
use std::io::{self, Read};
use std::sync::Arc;

/// Computes the entity tag for a file. The reader is positioned at the start of the
/// content and may be consumed entirely; the server rewinds it afterwards.
pub type ETagFn = Arc<dyn Fn(&mut dyn Read) -> io::Result<String> + Send + Sync>;

/// Hex-encoded MD5 of the full content, wrapped in double quotes.
pub fn calculate_etag(reader: &mut dyn Read) -> io::Result<String> {
    let mut hasher = Md5::new();
    io::copy(reader, &mut hasher)?;
    Ok(format!("\"{}\"", hex::encode(hasher.finalize())))
}
