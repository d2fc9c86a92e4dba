use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

/// Installs the process logger. `RUST_LOG` overrides the default `info` level unless
/// `silent` is set, in which case nothing is logged.
pub fn setup_logging(silent: bool) {
    let mut builder = Builder::new();
    if silent {
        builder.filter_level(LevelFilter::Off);
    } else {
        builder.filter_level(LevelFilter::Info).parse_env("RUST_LOG");
    }

    builder
        .format(|buf, record| {
            let timestamp = humantime::format_rfc3339_millis(SystemTime::now());
            let level = record.level();
            let location = if level >= log::Level::Debug {
                format!(
                    " - {}:{}",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )
            } else {
                String::new()
            };

            if atty::is(atty::Stream::Stderr) {
                let level_color = match level {
                    log::Level::Error => "\x1B[31m",
                    log::Level::Warn => "\x1B[33m",
                    log::Level::Info => "\x1B[32m",
                    log::Level::Debug => "\x1B[36m",
                    log::Level::Trace => "\x1B[35m",
                };
                writeln!(
                    buf,
                    "{}{:>5}\x1B[0m [{}] {}{}",
                    level_color,
                    level,
                    timestamp,
                    record.args(),
                    location
                )
            } else {
                writeln!(
                    buf,
                    "{:>5} [{}] {}{}",
                    level,
                    timestamp,
                    record.args(),
                    location
                )
            }
        })
        .init();
}

#[macro_export]
macro_rules! log_request {
    ($request:expr) => {
        log::info!("→ {} {}", $request.method(), $request.uri())
    };
}

#[macro_export]
macro_rules! log_response {
    ($method:expr, $uri:expr, $status:expr, $duration:expr) => {
        log::info!("← {} {} - {} ({:?})", $method, $uri, $status, $duration)
    };
}

#[macro_export]
macro_rules! log_error {
    ($error:expr, $context:expr) => {
        log::error!("❌ {} - {}", $context, $error)
    };
}

pub trait Loggable {
    fn log_description(&self) -> String;
}

impl Loggable for Path {
    fn log_description(&self) -> String {
        self.display().to_string()
    }
}

pub trait LoggingExt: Loggable {
    /// Runs `f`, logging its start and outcome against `self`. Failures are logged at
    /// debug level only since missing files are routine for a file server.
    fn log_operation<F, T, E>(&self, operation: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::fmt::Display;
}

impl<S: ?Sized + Loggable> LoggingExt for S {
    fn log_operation<F, T, E>(&self, operation: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::fmt::Display,
    {
        log::trace!("Starting {} on {}", operation, self.log_description());
        match f() {
            Ok(result) => {
                log::trace!("Completed {} on {}", operation, self.log_description());
                Ok(result)
            }
            Err(e) => {
                log::debug!("Failed {} on {}: {}", operation, self.log_description(), e);
                Err(e)
            }
        }
    }
}
