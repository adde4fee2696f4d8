// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{AccessMode, RawStream, SharedFd, StreamCapabilities};
use std::io;

/// A [`RawStream`] straight over an OS descriptor. Reads and writes are single
/// `read(2)` / `write(2)` calls.
///
/// Dropping it only drops its [`SharedFd`] reference. Process stdio is never closed.
#[derive(Debug)]
pub struct FdRawStream {
    fd: SharedFd,
    mode: Option<AccessMode>,
}

impl FdRawStream {
    /// When `mode` is [`None`] it is queried from the descriptor's status flags. A closed
    /// descriptor ends up with no mode, so it is neither readable nor writable.
    #[must_use]
    pub fn new(fd: SharedFd, mode: Option<AccessMode>) -> Self {
        let mode = mode.or_else(|| AccessMode::query(&fd));
        Self { fd, mode }
    }

    #[must_use]
    pub fn fd(&self) -> &SharedFd { &self.fd }
}

impl StreamCapabilities for FdRawStream {
    fn is_readable(&self) -> bool { self.mode.is_some_and(AccessMode::can_read) }

    fn is_writable(&self) -> bool { self.mode.is_some_and(AccessMode::can_write) }

    fn fileno(&self) -> Option<SharedFd> { Some(self.fd.clone()) }

    fn is_tty(&self) -> Option<bool> { Some(rustix::termios::isatty(&self.fd)) }

    fn access_mode(&self) -> Option<AccessMode> { self.mode }
}

impl RawStream for FdRawStream {
    /// Pipes, sockets and ttys report `ESPIPE` for `lseek`.
    fn is_seekable(&self) -> bool { rustix::fs::tell(&self.fd).is_ok() }

    fn read_raw(&self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(rustix::io::read(&self.fd, buf)?)
    }

    fn write_raw(&self, bytes: &[u8]) -> io::Result<usize> {
        Ok(rustix::io::write(&self.fd, bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pipe_round_trip() {
        let (read_end, write_end) = rustix::pipe::pipe().unwrap();
        let reader = FdRawStream::new(read_end.into(), None);
        let writer = FdRawStream::new(write_end.into(), None);

        assert!(reader.is_readable() && !reader.is_writable());
        assert!(writer.is_writable() && !writer.is_readable());
        assert!(!reader.is_seekable());
        assert_eq!(reader.is_tty(), Some(false));

        assert_eq!(writer.write_raw(b"ping").unwrap(), 4);
        let mut buf = [0_u8; 16];
        let count = reader.read_raw(&mut buf).unwrap();
        assert_eq!(&buf[..count], b"ping");
    }

    #[test]
    fn explicit_mode_wins_over_query() {
        let (read_end, _write_end) = rustix::pipe::pipe().unwrap();
        let stream = FdRawStream::new(read_end.into(), Some(AccessMode::ReadWrite));
        assert_eq!(stream.access_mode(), Some(AccessMode::ReadWrite));
    }
}
