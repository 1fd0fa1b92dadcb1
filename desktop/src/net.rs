use std::net::{TcpStream, ToSocketAddrs};
use std::rc::Rc;
use std::time::{Duration, Instant};

use embedded_io::{ErrorType, Read, Write};
use log::debug;
use zxart_core::net::Connector;

use crate::io::IoError;

/// How often a blocked read hands control to the interrupt hook.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Asked between read slices whether the transfer should stop. Returning
/// `true` fails the read with `Interrupted`.
pub type InterruptHook = Rc<dyn Fn() -> bool>;

/// Plain TCP sockets from `std::net`.
#[derive(Default)]
pub struct TcpConnector {
    interrupt: Option<InterruptHook>,
}

pub struct TcpConnection {
    stream: TcpStream,
    idle_timeout: Option<Duration>,
    interrupt: Option<InterruptHook>,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocked reads poll `hook` every [`POLL_INTERVAL`] so a key press can
    /// stop a transfer without waiting for the idle timeout.
    pub fn with_interrupt(hook: InterruptHook) -> Self {
        Self {
            interrupt: Some(hook),
        }
    }
}

impl Connector for TcpConnector {
    type Connection = TcpConnection;

    fn connect(
        &mut self,
        host: &str,
        port: u16,
        idle_timeout: Duration,
    ) -> Result<TcpConnection, IoError> {
        // A zero duration is rejected by the socket setters.
        let idle_timeout = (!idle_timeout.is_zero()).then_some(idle_timeout);
        let read_timeout = match (&self.interrupt, idle_timeout) {
            (Some(_), Some(idle)) => Some(idle.min(POLL_INTERVAL)),
            (Some(_), None) => Some(POLL_INTERVAL),
            (None, idle) => idle,
        };
        let mut last_error = None;
        for addr in (host, port).to_socket_addrs()? {
            debug!("net: connecting to {}", addr);
            let attempt = match idle_timeout {
                Some(limit) => TcpStream::connect_timeout(&addr, limit),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(read_timeout)?;
                    stream.set_write_timeout(idle_timeout)?;
                    stream.set_nodelay(true)?;
                    return Ok(TcpConnection {
                        stream,
                        idle_timeout,
                        interrupt: self.interrupt.clone(),
                    });
                }
                Err(err) => last_error = Some(err),
            }
        }
        Err(last_error
            .unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "host has no addresses")
            })
            .into())
    }
}

impl ErrorType for TcpConnection {
    type Error = IoError;
}

impl Read for TcpConnection {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let Some(interrupt) = &self.interrupt else {
            return Ok(std::io::Read::read(&mut self.stream, buf)?);
        };
        let started = Instant::now();
        loop {
            match std::io::Read::read(&mut self.stream, buf) {
                Err(err)
                    if matches!(
                        err.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    if interrupt() {
                        debug!("net: read interrupted");
                        return Err(std::io::Error::from(std::io::ErrorKind::Interrupted).into());
                    }
                    if self
                        .idle_timeout
                        .is_some_and(|limit| started.elapsed() >= limit)
                    {
                        return Err(err.into());
                    }
                }
                result => return Ok(result?),
            }
        }
    }
}

impl Write for TcpConnection {
    fn write(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        Ok(std::io::Write::write(&mut self.stream, buf)?)
    }

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(std::io::Write::flush(&mut self.stream)?)
    }
}
