use clap::Parser;
use std::io;
use std::sync::Arc;

mod args;

use args::Args;
use fileserver::logging::setup_logging;
use fileserver::server::start_server;
use fileserver::{
    cache_control, CompressionConfig, DirStore, FileServer, Handler, SpaServer, StripPrefix,
};

fn main() -> io::Result<()> {
    let args = Args::parse();
    setup_logging(args.silent);

    if !args.dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", args.dir.display()),
        ));
    }

    let mut server =
        FileServer::new(DirStore::new(&args.dir)).with_compression(CompressionConfig {
            level: args.gzip_level,
            ..CompressionConfig::default()
        });
    if args.immutable {
        server = server.with_cache_control(cache_control::immutable(args.no_cache.clone()));
    }

    let handler: Arc<dyn Handler> = if args.spa {
        log::info!(
            "Serving {} on {} in SPA mode (fallback: {})",
            args.dir.display(),
            args.addr,
            args.fallback
        );
        Arc::new(StripPrefix::new(
            args.prefix.clone(),
            SpaServer::new(server, args.fallback.clone()),
        ))
    } else {
        log::info!("Serving {} on {}", args.dir.display(), args.addr);
        Arc::new(StripPrefix::new(args.prefix.clone(), server))
    };

    start_server(&args.addr, handler)
}
