// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{AccessMode, ByteStream, RawStream, SharedFd, StreamCapabilities};
use std::{cell::RefCell, collections::VecDeque, io, rc::Rc};

/// How a [`BufferedStream`] buffers its raw layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStrategy {
    /// Read-ahead only.
    Reader,
    /// Write buffer only.
    Writer,
    /// Read-write over a seekable stream. Reads go through one byte at a time so the
    /// file offset stays where the caller thinks it is, and pending writes are flushed
    /// before every read.
    Random,
    /// Read-write over a non-seekable stream (pipe, socket, tty): independent read-ahead
    /// and write buffers.
    RwPair,
}

impl BufferStrategy {
    #[must_use]
    pub fn for_access(access: AccessMode, seekable: bool) -> Self {
        match access {
            AccessMode::Read => BufferStrategy::Reader,
            AccessMode::Write => BufferStrategy::Writer,
            AccessMode::ReadWrite if seekable => BufferStrategy::Random,
            AccessMode::ReadWrite => BufferStrategy::RwPair,
        }
    }

    #[must_use]
    pub fn access_mode(self) -> AccessMode {
        match self {
            BufferStrategy::Reader => AccessMode::Read,
            BufferStrategy::Writer => AccessMode::Write,
            BufferStrategy::Random | BufferStrategy::RwPair => AccessMode::ReadWrite,
        }
    }
}

/// [`ByteStream`] over any [`RawStream`]. Pending output is flushed on drop, best effort.
#[derive(Debug)]
pub struct BufferedStream {
    raw: Rc<dyn RawStream>,
    strategy: BufferStrategy,
    capacity: usize,
    read_ahead: RefCell<VecDeque<u8>>,
    pending_output: RefCell<Vec<u8>>,
}

impl BufferedStream {
    #[must_use]
    pub fn new(raw: Rc<dyn RawStream>, strategy: BufferStrategy, capacity: usize) -> Self {
        Self {
            raw,
            strategy,
            capacity: capacity.max(1),
            read_ahead: RefCell::new(VecDeque::new()),
            pending_output: RefCell::new(Vec::new()),
        }
    }

    fn check_readable(&self) -> io::Result<()> {
        if self.strategy.access_mode().can_read() {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::Unsupported, "stream is not readable"))
        }
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.strategy.access_mode().can_write() {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::Unsupported, "stream is not writable"))
        }
    }

    /// Pull one batch from the raw layer into the read-ahead buffer. Returns the number
    /// of bytes added, zero at end of stream.
    fn fill(&self) -> io::Result<usize> {
        if self.strategy == BufferStrategy::Random {
            self.flush_bytes()?;
        }
        let batch = match self.strategy {
            BufferStrategy::Random => 1,
            _ => self.capacity,
        };
        let mut scratch = vec![0_u8; batch];
        let count = self.raw.read_raw(&mut scratch)?;
        self.read_ahead.borrow_mut().extend(&scratch[..count]);
        Ok(count)
    }
}

impl StreamCapabilities for BufferedStream {
    fn is_readable(&self) -> bool {
        self.strategy.access_mode().can_read() && self.raw.is_readable()
    }

    fn is_writable(&self) -> bool {
        self.strategy.access_mode().can_write() && self.raw.is_writable()
    }

    fn fileno(&self) -> Option<SharedFd> { self.raw.fileno() }

    fn is_tty(&self) -> Option<bool> { self.raw.is_tty() }

    fn access_mode(&self) -> Option<AccessMode> { Some(self.strategy.access_mode()) }
}

impl ByteStream for BufferedStream {
    fn raw(&self) -> Option<Rc<dyn RawStream>> { Some(self.raw.clone()) }

    fn buffer_strategy(&self) -> Option<BufferStrategy> { Some(self.strategy) }

    fn read_bytes(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_readable()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let is_empty = self.read_ahead.borrow().is_empty();
        if is_empty && self.fill()? == 0 {
            return Ok(0);
        }
        let mut read_ahead = self.read_ahead.borrow_mut();
        let count = buf.len().min(read_ahead.len());
        for (slot, byte) in buf.iter_mut().zip(read_ahead.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn read_line_bytes(&self) -> io::Result<Vec<u8>> {
        self.check_readable()?;
        let mut line = Vec::new();
        loop {
            {
                let mut read_ahead = self.read_ahead.borrow_mut();
                if let Some(pos) = read_ahead.iter().position(|&it| it == b'\n') {
                    line.extend(read_ahead.drain(..=pos));
                    return Ok(line);
                }
                line.extend(read_ahead.drain(..));
            }
            if self.fill()? == 0 {
                return Ok(line);
            }
        }
    }

    fn write_bytes(&self, bytes: &[u8]) -> io::Result<()> {
        self.check_writable()?;
        self.pending_output.borrow_mut().extend_from_slice(bytes);
        if self.pending_output.borrow().len() >= self.capacity {
            self.flush_bytes()?;
        }
        Ok(())
    }

    /// On error the unwritten bytes stay buffered.
    fn flush_bytes(&self) -> io::Result<()> {
        let mut pending = self.pending_output.borrow_mut();
        while !pending.is_empty() {
            match self.raw.write_raw(&pending) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(count) => {
                    pending.drain(..count);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

impl Drop for BufferedStream {
    fn drop(&mut self) { let _unused = self.flush_bytes(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FdRawStream;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn pipe_pair(capacity: usize) -> (BufferedStream, BufferedStream) {
        let (read_end, write_end) = rustix::pipe::pipe().unwrap();
        let reader = Rc::new(FdRawStream::new(read_end.into(), None));
        let writer = Rc::new(FdRawStream::new(write_end.into(), None));
        (
            BufferedStream::new(reader, BufferStrategy::Reader, capacity),
            BufferedStream::new(writer, BufferStrategy::Writer, capacity),
        )
    }

    #[test_case(AccessMode::Read, false, BufferStrategy::Reader)]
    #[test_case(AccessMode::Write, true, BufferStrategy::Writer)]
    #[test_case(AccessMode::ReadWrite, true, BufferStrategy::Random)]
    #[test_case(AccessMode::ReadWrite, false, BufferStrategy::RwPair)]
    fn strategy_for_access(access: AccessMode, seekable: bool, expected: BufferStrategy) {
        assert_eq!(BufferStrategy::for_access(access, seekable), expected);
        assert_eq!(expected.access_mode(), access);
    }

    #[test]
    fn writes_are_held_until_flush() {
        let (reader, writer) = pipe_pair(64);
        writer.write_bytes(b"one\ntwo\n").unwrap();
        // Nothing reached the pipe yet, so a non-blocking read would find it empty.
        writer.flush_bytes().unwrap();
        assert_eq!(reader.read_line_bytes().unwrap(), b"one\n");
        assert_eq!(reader.read_line_bytes().unwrap(), b"two\n");
    }

    #[test]
    fn full_buffer_flushes_itself() {
        let (reader, writer) = pipe_pair(4);
        writer.write_bytes(b"abcdef").unwrap();

        // The reader hands out at most one buffer's worth per call.
        let mut received = Vec::new();
        let mut buf = [0_u8; 8];
        while received.len() < 6 {
            let count = reader.read_bytes(&mut buf).unwrap();
            assert!(count > 0);
            assert!(count <= 4);
            received.extend_from_slice(&buf[..count]);
        }
        assert_eq!(received, b"abcdef");
    }

    #[test]
    fn read_line_returns_tail_at_eof() {
        let (reader, writer) = pipe_pair(64);
        writer.write_bytes(b"done\nno newline").unwrap();
        drop(writer);
        assert_eq!(reader.read_line_bytes().unwrap(), b"done\n");
        assert_eq!(reader.read_line_bytes().unwrap(), b"no newline");
        assert!(reader.read_line_bytes().unwrap().is_empty());
    }

    #[test]
    fn wrong_direction_is_unsupported() {
        let (reader, writer) = pipe_pair(64);
        let err = reader.write_bytes(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        let err = writer.read_bytes(&mut [0_u8; 1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
