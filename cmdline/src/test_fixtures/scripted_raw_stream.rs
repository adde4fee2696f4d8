// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{AccessMode, RawStream, SharedFd, StreamCapabilities};
use std::{cell::{Cell, RefCell},
          collections::VecDeque,
          io};

/// What the next [`read_raw()`](RawStream::read_raw) returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    Data(Vec<u8>),
    WouldBlock,
    Interrupted,
    Eof,
    Fail(io::ErrorKind),
}

/// What the next [`write_raw()`](RawStream::write_raw) does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    /// Accept at most this many bytes.
    Accept(usize),
    WouldBlock,
    Fail(io::ErrorKind),
}

/// A [`RawStream`] that replays scripted results instead of doing I/O.
///
/// It can report a real descriptor, so the resolver and the reactor accept it, while all
/// bytes still flow through the script. An empty read script answers
/// [`io::ErrorKind::WouldBlock`]; an empty write script accepts everything.
#[derive(Debug)]
pub struct ScriptedRawStream {
    fd: Option<SharedFd>,
    mode: Option<AccessMode>,
    reads: RefCell<VecDeque<ReadStep>>,
    writes: RefCell<VecDeque<WriteStep>>,
    written: RefCell<Vec<u8>>,
    write_calls: Cell<usize>,
}

impl ScriptedRawStream {
    #[must_use]
    pub fn new(fd: Option<SharedFd>, mode: AccessMode) -> Self {
        Self {
            fd,
            mode: Some(mode),
            reads: RefCell::default(),
            writes: RefCell::default(),
            written: RefCell::default(),
            write_calls: Cell::new(0),
        }
    }

    #[must_use]
    pub fn without_fd(mode: AccessMode) -> Self { Self::new(None, mode) }

    /// Neither readable nor writable, like a closed file.
    #[must_use]
    pub fn closed() -> Self {
        Self {
            mode: None,
            ..Self::without_fd(AccessMode::Read)
        }
    }

    #[must_use]
    pub fn with_reads(self, steps: impl IntoIterator<Item = ReadStep>) -> Self {
        self.reads.borrow_mut().extend(steps);
        self
    }

    #[must_use]
    pub fn with_writes(self, steps: impl IntoIterator<Item = WriteStep>) -> Self {
        self.writes.borrow_mut().extend(steps);
        self
    }

    pub fn push_read(&self, step: ReadStep) { self.reads.borrow_mut().push_back(step); }

    pub fn push_write(&self, step: WriteStep) { self.writes.borrow_mut().push_back(step); }

    #[must_use]
    pub fn written(&self) -> Vec<u8> { self.written.borrow().clone() }

    #[must_use]
    pub fn write_calls(&self) -> usize { self.write_calls.get() }
}

impl StreamCapabilities for ScriptedRawStream {
    fn is_readable(&self) -> bool { self.mode.is_some_and(AccessMode::can_read) }

    fn is_writable(&self) -> bool { self.mode.is_some_and(AccessMode::can_write) }

    fn fileno(&self) -> Option<SharedFd> { self.fd.clone() }

    fn is_tty(&self) -> Option<bool> { Some(false) }

    fn access_mode(&self) -> Option<AccessMode> { self.mode }
}

impl RawStream for ScriptedRawStream {
    fn read_raw(&self, buf: &mut [u8]) -> io::Result<usize> {
        let step = self.reads.borrow_mut().pop_front();
        match step {
            None | Some(ReadStep::WouldBlock) => Err(io::ErrorKind::WouldBlock.into()),
            Some(ReadStep::Interrupted) => Err(io::ErrorKind::Interrupted.into()),
            Some(ReadStep::Eof) => Ok(0),
            Some(ReadStep::Fail(kind)) => Err(kind.into()),
            Some(ReadStep::Data(mut bytes)) => {
                let count = bytes.len().min(buf.len());
                buf[..count].copy_from_slice(&bytes[..count]);
                if count < bytes.len() {
                    bytes.drain(..count);
                    self.reads.borrow_mut().push_front(ReadStep::Data(bytes));
                }
                Ok(count)
            }
        }
    }

    fn write_raw(&self, bytes: &[u8]) -> io::Result<usize> {
        self.write_calls.set(self.write_calls.get() + 1);
        let step = self.writes.borrow_mut().pop_front();
        let count = match step {
            None => bytes.len(),
            Some(WriteStep::Accept(limit)) => bytes.len().min(limit),
            Some(WriteStep::WouldBlock) => return Err(io::ErrorKind::WouldBlock.into()),
            Some(WriteStep::Fail(kind)) => return Err(kind.into()),
        };
        self.written.borrow_mut().extend_from_slice(&bytes[..count]);
        Ok(count)
    }
}
