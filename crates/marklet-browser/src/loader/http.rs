//! Minimal HTTP/1.1 GET transaction.
//!
//! One request per connection: the request line and `Host` header are
//! written and flushed, the status line and headers are read, and the
//! remaining bytes are exposed as text or as an image. The stream is
//! owned by the [`Transaction`], so it is closed exactly once when the
//! transaction is dropped, on every exit path.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use marklet_types::error::{MarkletError, Result};

use crate::image::{DecodedImage, decode_image};
use crate::url::Locator;

/// Default TCP connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default socket read timeout.
pub const READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Default maximum response body size (8 MB).
pub const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Socket limits applied to every transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOptions {
    /// `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// `None` blocks until the peer closes.
    pub read_timeout: Option<Duration>,
    pub max_body_bytes: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(CONNECT_TIMEOUT),
            read_timeout: Some(READ_TIMEOUT),
            max_body_bytes: MAX_BODY_SIZE,
        }
    }
}

/// A single request/response exchange over a freshly opened connection.
///
/// Header parsing reads through the same [`BufReader`] that later
/// serves the body, so bytes buffered past the blank line are never
/// lost and binary bodies stay intact.
pub struct Transaction<S: Read + Write = TcpStream> {
    status_line: String,
    /// Keyed by lowercase header name.
    headers: HashMap<String, String>,
    reader: BufReader<S>,
    max_body_bytes: usize,
}

impl Transaction<TcpStream> {
    /// Connect to `locator.host:locator.port`, send a GET for
    /// `locator.path`, and parse the response head.
    pub fn open(locator: &Locator, options: &HttpOptions) -> Result<Self> {
        let stream = tcp_connect(locator.host(), locator.port(), options)?;
        log::debug!("connected to {}:{}", locator.host(), locator.port());
        Self::exchange(stream, locator, options.max_body_bytes)
    }
}

impl<S: Read + Write> Transaction<S> {
    /// Run the request/response head exchange over an already
    /// connected stream.
    pub fn exchange(mut stream: S, locator: &Locator, max_body_bytes: usize) -> Result<Self> {
        send_request(&mut stream, locator)?;

        let mut reader = BufReader::new(stream);
        let status_line = read_line(&mut reader)?
            .ok_or_else(|| MarkletError::MalformedResponse("empty response".to_string()))?;
        let headers = read_headers(&mut reader)?;

        Ok(Self {
            status_line,
            headers,
            reader,
            max_body_bytes,
        })
    }

    /// The first response line, verbatim.
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// The numeric status code (second token of the status line).
    pub fn status_code(&self) -> Result<u16> {
        parse_status_line(&self.status_line)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// All headers, keyed by lowercase name.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Drain the body as text: lines joined with `\n`.
    pub fn body_as_text(mut self) -> Result<String> {
        let body = self.read_body()?;
        let text = String::from_utf8_lossy(&body);
        Ok(text.lines().collect::<Vec<_>>().join("\n"))
    }

    /// Drain the body as binary image data and decode it.
    pub fn body_as_image(mut self) -> Result<DecodedImage> {
        let body = self.read_body()?;
        decode_image(&body)
    }

    /// Read the body up to `Content-Length` when present, otherwise
    /// until the peer closes.
    fn read_body(&mut self) -> Result<Vec<u8>> {
        let declared = match self.header("content-length") {
            Some(v) => Some(v.parse::<usize>().map_err(|_| {
                MarkletError::MalformedResponse(format!("bad Content-Length: {v}"))
            })?),
            None => None,
        };
        if declared.is_some_and(|len| len > self.max_body_bytes) {
            return Err(self.oversized());
        }

        let limit = declared.unwrap_or(self.max_body_bytes + 1);
        let mut body = Vec::new();
        (&mut self.reader)
            .take(limit as u64)
            .read_to_end(&mut body)
            .map_err(|e| MarkletError::from_socket("read body", e))?;

        if body.len() > self.max_body_bytes {
            return Err(self.oversized());
        }
        Ok(body)
    }

    fn oversized(&self) -> MarkletError {
        MarkletError::MalformedResponse(format!(
            "response body exceeds {} bytes",
            self.max_body_bytes
        ))
    }
}

impl<S: Read + Write> Drop for Transaction<S> {
    fn drop(&mut self) {
        log::trace!("closing connection ({})", self.status_line);
    }
}

// -------------------------------------------------------------------
// Internals
// -------------------------------------------------------------------

/// Open a TCP connection with the configured timeouts.
fn tcp_connect(host: &str, port: u16, options: &HttpOptions) -> Result<TcpStream> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| MarkletError::Connection(format!("DNS resolution failed: {e}")))?
        .next()
        .ok_or_else(|| MarkletError::Connection(format!("no addresses for {host}:{port}")))?;

    let stream = match options.connect_timeout {
        Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
        None => TcpStream::connect(addr),
    }
    .map_err(|e| MarkletError::from_socket("TCP connect failed", e))?;

    stream
        .set_read_timeout(options.read_timeout)
        .map_err(|e| MarkletError::Connection(format!("set read timeout: {e}")))?;

    Ok(stream)
}

/// Write the three-line GET request and flush.
fn send_request(stream: &mut impl Write, locator: &Locator) -> Result<()> {
    let request = format!(
        "GET {} HTTP/1.1\r\n\
         Host: {}\r\n\
         \r\n",
        locator.path(),
        locator.host(),
    );

    stream
        .write_all(request.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| MarkletError::from_socket("send request", e))
}

/// Read one line without its terminator. `None` at end of stream.
fn read_line(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut raw = Vec::new();
    let n = reader
        .read_until(b'\n', &mut raw)
        .map_err(|e| MarkletError::from_socket("read response", e))?;
    if n == 0 {
        return Ok(None);
    }
    if raw.last() == Some(&b'\n') {
        raw.pop();
    }
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}

/// Read `name: value` lines up to and including the blank line.
fn read_headers(reader: &mut impl BufRead) -> Result<HashMap<String, String>> {
    let mut headers = HashMap::new();
    loop {
        let line = read_line(reader)?.ok_or_else(|| {
            MarkletError::MalformedResponse("stream ended before end of headers".to_string())
        })?;
        if line.trim().is_empty() {
            return Ok(headers);
        }
        let (name, value) = line.split_once(':').ok_or_else(|| {
            MarkletError::MalformedResponse(format!("header line without colon: {line}"))
        })?;
        headers.insert(name.trim().to_lowercase(), value.trim().to_string());
    }
}

/// Parse the status code from `HTTP/1.x STATUS ...`.
fn parse_status_line(line: &str) -> Result<u16> {
    let code = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| MarkletError::MalformedResponse(format!("bad status line: {line}")))?;
    code.parse()
        .map_err(|_| MarkletError::MalformedResponse(format!("bad status code in: {line}")))
}
