// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The three stream layers a [`StreamHandle`] can point at.
//!
//! ```text
//! TextStream   (decoded text)   ── buffer() ──┐
//! ByteStream   (buffered bytes) ◀─────────────┘ ── raw() ──┐
//! RawStream    (unbuffered OS bytes)  ◀─────────────────────┘
//! ```
//!
//! Every layer answers the [`StreamCapabilities`] questions. The resolver peels a handle
//! top-down through [`TextStream::buffer`] and [`ByteStream::raw`], and rebuilds missing
//! layers bottom-up.

use crate::{AccessMode, BufferStrategy, CmdlineError, FdRawStream, SharedFd};
use encoding_rs::Encoding;
use std::{fmt::Debug, io, rc::Rc};

/// Questions every layer can answer about itself.
pub trait StreamCapabilities: Debug {
    fn is_readable(&self) -> bool;

    fn is_writable(&self) -> bool;

    /// The OS descriptor backing this layer, if any. In-memory streams return [`None`].
    fn fileno(&self) -> Option<SharedFd>;

    /// [`None`] means "don't know, ask the descriptor".
    fn is_tty(&self) -> Option<bool> { None }

    fn access_mode(&self) -> Option<AccessMode> { None }
}

/// Unbuffered bytes, one syscall per call.
pub trait RawStream: StreamCapabilities {
    fn is_seekable(&self) -> bool { false }

    /// # Errors
    ///
    /// Any OS error, including [`io::ErrorKind::WouldBlock`] for non-blocking
    /// descriptors with nothing to read.
    fn read_raw(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Returns how many bytes the OS accepted, which may be fewer than `bytes.len()`.
    ///
    /// # Errors
    ///
    /// Any OS error, including [`io::ErrorKind::WouldBlock`].
    fn write_raw(&self, bytes: &[u8]) -> io::Result<usize>;
}

/// Buffered bytes layered over a [`RawStream`].
pub trait ByteStream: StreamCapabilities {
    fn raw(&self) -> Option<Rc<dyn RawStream>>;

    fn buffer_strategy(&self) -> Option<BufferStrategy> { None }

    /// # Errors
    ///
    /// Any error from the raw layer.
    fn read_bytes(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Read up to and including the next `\n`. An empty result means end of stream.
    ///
    /// # Errors
    ///
    /// Any error from the raw layer.
    fn read_line_bytes(&self) -> io::Result<Vec<u8>>;

    /// Accept all of `bytes` into the buffer, flushing to the raw layer when it fills.
    ///
    /// # Errors
    ///
    /// Any error from the raw layer.
    fn write_bytes(&self, bytes: &[u8]) -> io::Result<()>;

    /// # Errors
    ///
    /// Any error from the raw layer.
    fn flush_bytes(&self) -> io::Result<()>;
}

/// Decoded text layered over a [`ByteStream`].
pub trait TextStream: StreamCapabilities {
    fn encoding(&self) -> Option<&'static Encoding>;

    fn buffer(&self) -> Option<Rc<dyn ByteStream>>;

    /// Read one line, including its `\n`. An empty string means end of stream.
    ///
    /// # Errors
    ///
    /// I/O errors, or [`CmdlineError::MalformedInput`] from a strict decoder.
    fn read_line(&self) -> Result<String, CmdlineError>;

    /// # Errors
    ///
    /// Any I/O error from the layers below.
    fn write_text(&self, text: &str) -> Result<(), CmdlineError>;

    /// # Errors
    ///
    /// Any I/O error from the layers below.
    fn flush_text(&self) -> Result<(), CmdlineError>;
}

/// A handle to any of the three layers. This is what the resolver and the transport
/// accept.
#[derive(Debug, Clone)]
pub enum StreamHandle {
    Text(Rc<dyn TextStream>),
    Bytes(Rc<dyn ByteStream>),
    Raw(Rc<dyn RawStream>),
}

impl StreamHandle {
    /// Wrap a bare descriptor. Its access mode is queried from the OS.
    #[must_use]
    pub fn from_fd(fd: impl Into<SharedFd>) -> Self {
        StreamHandle::Raw(Rc::new(FdRawStream::new(fd.into(), None)))
    }

    #[must_use]
    pub fn stdin() -> Self { StreamHandle::from_fd(SharedFd::stdin()) }

    #[must_use]
    pub fn stdout() -> Self { StreamHandle::from_fd(SharedFd::stdout()) }

    /// Whether the outermost layer can read or write at all.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        match self {
            StreamHandle::Text(it) => it.is_readable() || it.is_writable(),
            StreamHandle::Bytes(it) => it.is_readable() || it.is_writable(),
            StreamHandle::Raw(it) => it.is_readable() || it.is_writable(),
        }
    }
}
