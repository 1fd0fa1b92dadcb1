use embedded_io::ErrorKind;
use thiserror::Error;

/// `std::io::Error` carried through the core's `embedded_io` traits.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct IoError(#[from] pub std::io::Error);

impl embedded_io::Error for IoError {
    fn kind(&self) -> ErrorKind {
        map_kind(self.0.kind())
    }
}

pub fn map_kind(kind: std::io::ErrorKind) -> ErrorKind {
    use std::io::ErrorKind as Std;
    match kind {
        Std::NotFound => ErrorKind::NotFound,
        Std::PermissionDenied => ErrorKind::PermissionDenied,
        Std::ConnectionRefused => ErrorKind::ConnectionRefused,
        Std::ConnectionReset => ErrorKind::ConnectionReset,
        Std::ConnectionAborted => ErrorKind::ConnectionAborted,
        Std::NotConnected => ErrorKind::NotConnected,
        Std::AddrInUse => ErrorKind::AddrInUse,
        Std::AddrNotAvailable => ErrorKind::AddrNotAvailable,
        Std::BrokenPipe => ErrorKind::BrokenPipe,
        Std::AlreadyExists => ErrorKind::AlreadyExists,
        Std::InvalidInput => ErrorKind::InvalidInput,
        Std::InvalidData => ErrorKind::InvalidData,
        // Socket read timeouts surface as WouldBlock on Unix.
        Std::TimedOut | Std::WouldBlock => ErrorKind::TimedOut,
        Std::Interrupted => ErrorKind::Interrupted,
        Std::Unsupported => ErrorKind::Unsupported,
        _ => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_timeouts_map_to_timed_out() {
        assert_eq!(map_kind(std::io::ErrorKind::WouldBlock), ErrorKind::TimedOut);
        assert_eq!(map_kind(std::io::ErrorKind::TimedOut), ErrorKind::TimedOut);
        assert_eq!(map_kind(std::io::ErrorKind::UnexpectedEof), ErrorKind::Other);
    }
}
