//! Minimal HTTP/1.1 front end for running a [`Handler`] as a standalone process.
//!
//! One thread per connection and one request per connection. Request bodies are never
//! read since only GET and HEAD are served.

use http::header::{self, HeaderName, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::error::error_response;
use crate::file_serving::content::Body;
use crate::file_serving::Handler;
use crate::{log_error, log_request, log_response};

const MAX_HEADERS: usize = 100;

pub fn start_server(listen_addr: &str, handler: Arc<dyn Handler>) -> io::Result<()> {
    let listener = TcpListener::bind(listen_addr)?;
    log::info!("Listening on: {}", listen_addr);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                log_error!(e, "Failed to accept connection");
                continue;
            }
        };
        let handler = Arc::clone(&handler);

        thread::spawn(move || {
            if let Err(e) = handle_connection(stream, handler.as_ref()) {
                log::warn!("Error handling connection: {}", e);
            }
        });
    }

    Ok(())
}

fn handle_connection(client: TcpStream, handler: &dyn Handler) -> io::Result<()> {
    let start_time = Instant::now();
    let mut reader = BufReader::new(&client);
    let mut writer = BufWriter::new(&client);

    let request = match read_request(&mut reader) {
        Ok(request) => request,
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            log::debug!("Malformed request: {}", e);
            let response = error_response(StatusCode::BAD_REQUEST, "400 Bad Request");
            return write_response(&mut writer, response, false);
        }
        Err(e) => return Err(e),
    };

    log_request!(request);
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = handler.handle(request);
    let status = response.status();
    let result = write_response(&mut writer, response, method == Method::HEAD);

    // Headers are already on the wire if the body fails midway; all that is left is to
    // note it and drop the connection.
    if let Err(e) = &result {
        log_error!(e, format!("Failed to send {} {}", method, uri));
    }
    log_response!(method, uri, status.as_u16(), start_time.elapsed());
    result
}

/// Reads a request line and headers. Malformed input yields `ErrorKind::InvalidData`.
pub fn read_request<R: BufRead>(reader: &mut R) -> io::Result<Request<()>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before request line",
        ));
    }

    let mut parts = line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(invalid_data(format!("bad request line: {:?}", line.trim())));
    };
    let method = Method::from_bytes(method.as_bytes()).map_err(invalid_data)?;
    let mut builder = Request::builder().method(method).uri(target);

    let mut header_count = 0;
    loop {
        line.clear();
        reader.read_line(&mut line)?;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }

        header_count += 1;
        if header_count > MAX_HEADERS {
            return Err(invalid_data("too many headers"));
        }

        log::trace!("Header line: {}", trimmed);
        let Some((name, value)) = trimmed.split_once(':') else {
            return Err(invalid_data(format!("bad header line: {:?}", trimmed)));
        };
        let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(invalid_data)?;
        let value = HeaderValue::from_str(value.trim()).map_err(invalid_data)?;
        builder = builder.header(name, value);
    }

    builder.body(()).map_err(invalid_data)
}

/// Writes `response` as HTTP/1.1, leaving out the body when `head_only` is set.
pub fn write_response<W: Write>(
    writer: &mut W,
    response: Response<Body>,
    head_only: bool,
) -> io::Result<()> {
    let (parts, body) = response.into_parts();

    write!(
        writer,
        "HTTP/1.1 {} {}\r\n",
        parts.status.as_u16(),
        parts.status.canonical_reason().unwrap_or("")
    )?;
    for (name, value) in parts.headers.iter() {
        write!(writer, "{}: ", name)?;
        writer.write_all(value.as_bytes())?;
        writer.write_all(b"\r\n")?;
    }
    if !parts.headers.contains_key(header::CONNECTION) {
        writer.write_all(b"connection: close\r\n")?;
    }
    writer.write_all(b"\r\n")?;

    if !head_only {
        body.write_to(writer)?;
    }
    writer.flush()
}

fn invalid_data<E>(error: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, error)
}
