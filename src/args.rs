use clap::Parser;
use std::path::PathBuf;

/// Serve a directory over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory to serve
    pub dir: PathBuf,

    #[arg(short, long, default_value = "0.0.0.0:8000")]
    pub addr: String,

    /// URL prefix the files are served under
    #[arg(long, default_value = "/")]
    pub prefix: String,

    /// Serve the fallback file for unknown paths and directories
    #[arg(long)]
    pub spa: bool,

    #[arg(long, default_value = "index.html")]
    pub fallback: String,

    /// Disable request logging
    #[arg(long)]
    pub silent: bool,

    #[arg(short, long, default_value = "6", value_parser = clap::value_parser!(u32).range(0..=9))]
    pub gzip_level: u32,

    /// Mark responses immutable, except paths given with --no-cache
    #[arg(long)]
    pub immutable: bool,

    /// Store path that stays revalidated under --immutable (repeatable)
    #[arg(long = "no-cache", value_name = "PATH", requires = "immutable")]
    pub no_cache: Vec<String>,
}
