//! Minimal streaming HTTP/1.0 client.
//!
//! A single `GET` is written to a raw connection, the response header is
//! skipped and the body is streamed into a sink chunk by chunk. Nothing
//! beyond that is supported: no TLS, redirects, chunked encoding or
//! compression.

extern crate alloc;

use alloc::format;
use alloc::sync::Arc;
use alloc::vec;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use embedded_io::{Error as _, ErrorKind, ErrorType, Read, Write};
use log::{debug, info, warn};

use crate::scr::GIGASCREEN_SIZE;

pub const DEFAULT_PORT: u16 = 80;
const SEPARATOR: [u8; 4] = *b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("malformed url")]
    MalformedUrl,
    #[error("connection failure: {0:?}")]
    ConnectionFailure(ErrorKind),
    #[error("response header not found")]
    HeaderTimeout,
    #[error("connection closed before the response header ended")]
    UnexpectedEof,
    #[error("no data received within the idle timeout")]
    IdleTimeout,
    #[error("response body exceeds the size limit")]
    BodyTooLarge,
    #[error("cancelled")]
    UserCancelled,
    #[error("sink error: {0:?}")]
    Sink(ErrorKind),
}

/// Shared "keep receiving" flag. Clones observe the same state, so an input
/// handler holding one can stop a transfer that another clone is driving.
#[derive(Clone, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn reset(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        !self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    /// Read size while looking for the end of the header.
    pub header_chunk: usize,
    /// Read size once the body is streaming.
    pub body_chunk: usize,
    /// Reads allowed before giving up on finding the header end.
    pub max_header_reads: usize,
    pub max_body: usize,
    /// Applied by the connector to every read.
    pub idle_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            header_chunk: 200,
            body_chunk: 100,
            max_header_reads: 50,
            max_body: GIGASCREEN_SIZE,
            idle_timeout: Duration::from_secs(10),
        }
    }
}

impl FetchOptions {
    pub fn with_max_body(&self, max_body: usize) -> Self {
        Self {
            max_body,
            ..self.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub header_bytes: usize,
    pub body_bytes: usize,
    pub reads: usize,
}

/// Opens raw connections. Implemented by the platform (TCP sockets on the
/// desktop, the radio stack on a device).
pub trait Connector {
    type Connection: Read + Write;

    fn connect(
        &mut self,
        host: &str,
        port: u16,
        idle_timeout: Duration,
    ) -> Result<Self::Connection, <Self::Connection as ErrorType>::Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Url<'a> {
    /// `host` or `host:port`, sent verbatim in the `Host` header.
    pub authority: &'a str,
    pub host: &'a str,
    pub port: u16,
    /// Path without the leading slash.
    pub path: &'a str,
}

/// Splits `scheme://host/path`. The scheme itself is not inspected.
pub fn parse_url(url: &str) -> Result<Url<'_>, FetchError> {
    let mut parts = url.splitn(4, '/');
    let (Some(_scheme), Some(""), Some(authority), Some(path)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(FetchError::MalformedUrl);
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (
            host,
            port.parse::<u16>().map_err(|_| FetchError::MalformedUrl)?,
        ),
        None => (authority, DEFAULT_PORT),
    };
    if host.is_empty() {
        return Err(FetchError::MalformedUrl);
    }
    Ok(Url {
        authority,
        host,
        port,
        path,
    })
}

/// Incremental search for the blank line ending the header. The match state
/// survives between chunks, so a separator split across reads is found.
#[derive(Clone, Copy, Debug, Default)]
struct SeparatorScanner {
    matched: usize,
}

impl SeparatorScanner {
    /// Returns the index just past the separator if it completes in `chunk`.
    fn feed(&mut self, chunk: &[u8]) -> Option<usize> {
        for (i, &byte) in chunk.iter().enumerate() {
            if byte == SEPARATOR[self.matched] {
                self.matched += 1;
                if self.matched == SEPARATOR.len() {
                    return Some(i + 1);
                }
            } else if byte == SEPARATOR[0] {
                self.matched = 1;
            } else {
                self.matched = 0;
            }
        }
        None
    }
}

/// Fetches `url` and streams the response body into `sink`.
///
/// On cancellation the sink keeps whatever prefix of the body arrived. If
/// the header end is not seen within `max_header_reads` reads the token is
/// cancelled and nothing is written. The sink is flushed and the connection
/// dropped on every path.
pub fn fetch<C, W>(
    connector: &mut C,
    url: &str,
    sink: &mut W,
    cancel: &CancelToken,
    options: &FetchOptions,
) -> Result<FetchStats, FetchError>
where
    C: Connector,
    W: Write,
{
    let target = parse_url(url)?;
    debug!("fetch: connecting to {}:{}", target.host, target.port);
    let mut conn = connector
        .connect(target.host, target.port, options.idle_timeout)
        .map_err(|e| FetchError::ConnectionFailure(e.kind()))?;

    let result = transfer(&mut conn, &target, sink, cancel, options);
    drop(conn);
    let flushed = sink.flush().map_err(|e| FetchError::Sink(e.kind()));

    match result.and_then(|stats| flushed.map(|_| stats)) {
        Ok(stats) => {
            info!(
                "fetch: {} body bytes from {} ({} header bytes, {} reads)",
                stats.body_bytes, target.host, stats.header_bytes, stats.reads
            );
            Ok(stats)
        }
        Err(err) => {
            warn!("fetch: /{} failed: {}", target.path, err);
            Err(err)
        }
    }
}

fn transfer<S, W>(
    conn: &mut S,
    target: &Url<'_>,
    sink: &mut W,
    cancel: &CancelToken,
    options: &FetchOptions,
) -> Result<FetchStats, FetchError>
where
    S: Read + Write,
    W: Write,
{
    let request = format!(
        "GET /{} HTTP/1.0\r\nHost: {}\r\n\r\n",
        target.path, target.authority
    );
    conn.write_all(request.as_bytes())
        .and_then(|_| conn.flush())
        .map_err(|e| FetchError::ConnectionFailure(e.kind()))?;

    let header_chunk = options.header_chunk.max(1);
    let body_chunk = options.body_chunk.max(1);
    let mut buf = vec![0u8; header_chunk.max(body_chunk)];
    let mut stats = FetchStats::default();
    let mut scanner = SeparatorScanner::default();

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::UserCancelled);
        }
        if stats.reads >= options.max_header_reads {
            cancel.cancel();
            return Err(FetchError::HeaderTimeout);
        }
        let n = read_chunk(conn, &mut buf[..header_chunk], cancel)?;
        stats.reads += 1;
        if n == 0 {
            return Err(FetchError::UnexpectedEof);
        }
        if let Some(split) = scanner.feed(&buf[..n]) {
            stats.header_bytes += split;
            write_body(sink, &buf[split..n], &mut stats, options.max_body)?;
            break;
        }
        stats.header_bytes += n;
    }

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::UserCancelled);
        }
        let n = read_chunk(conn, &mut buf[..body_chunk], cancel)?;
        stats.reads += 1;
        if n == 0 {
            return Ok(stats);
        }
        write_body(sink, &buf[..n], &mut stats, options.max_body)?;
    }
}

/// A read interrupted while the token is cancelled ends the transfer, so a
/// connection can hand control back mid-read when asked to stop.
fn read_chunk<S: Read>(
    conn: &mut S,
    buf: &mut [u8],
    cancel: &CancelToken,
) -> Result<usize, FetchError> {
    loop {
        match conn.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) => match e.kind() {
                ErrorKind::Interrupted if cancel.is_cancelled() => {
                    return Err(FetchError::UserCancelled);
                }
                ErrorKind::Interrupted => continue,
                ErrorKind::TimedOut => return Err(FetchError::IdleTimeout),
                kind => return Err(FetchError::ConnectionFailure(kind)),
            },
        }
    }
}

/// Writes up to the body cap, then reports the overflow.
fn write_body<W: Write>(
    sink: &mut W,
    data: &[u8],
    stats: &mut FetchStats,
    max_body: usize,
) -> Result<(), FetchError> {
    let room = max_body.saturating_sub(stats.body_bytes);
    let take = data.len().min(room);
    sink.write_all(&data[..take])
        .map_err(|e| FetchError::Sink(e.kind()))?;
    stats.body_bytes += take;
    if take < data.len() {
        return Err(FetchError::BodyTooLarge);
    }
    Ok(())
}
