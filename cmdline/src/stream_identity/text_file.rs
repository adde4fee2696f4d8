// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{AccessMode, ByteStream, CmdlineError, DecodeErrorPolicy, IncrementalDecoder,
            IncrementalEncoder, SharedFd, StreamCapabilities, TextStream};
use encoding_rs::Encoding;
use std::{cell::RefCell, rc::Rc};

/// [`TextStream`] over a [`ByteStream`].
///
/// With line buffering on, every write that contains a `\n` is flushed all the way down
/// to the raw layer.
#[derive(Debug)]
pub struct TextFile {
    buffer: Rc<dyn ByteStream>,
    encoding: &'static Encoding,
    policy: DecodeErrorPolicy,
    line_buffering: bool,
    decoder: RefCell<IncrementalDecoder>,
    encoder: RefCell<IncrementalEncoder>,
}

impl TextFile {
    #[must_use]
    pub fn new(
        buffer: Rc<dyn ByteStream>,
        encoding: &'static Encoding,
        policy: DecodeErrorPolicy,
        line_buffering: bool,
    ) -> Self {
        Self {
            buffer,
            encoding,
            policy,
            line_buffering,
            decoder: RefCell::new(IncrementalDecoder::new(encoding)),
            encoder: RefCell::new(IncrementalEncoder::new(encoding)),
        }
    }

    #[must_use]
    pub fn policy(&self) -> DecodeErrorPolicy { self.policy }

    #[must_use]
    pub fn line_buffering(&self) -> bool { self.line_buffering }
}

impl StreamCapabilities for TextFile {
    fn is_readable(&self) -> bool { self.buffer.is_readable() }

    fn is_writable(&self) -> bool { self.buffer.is_writable() }

    fn fileno(&self) -> Option<SharedFd> { self.buffer.fileno() }

    fn is_tty(&self) -> Option<bool> { self.buffer.is_tty() }

    fn access_mode(&self) -> Option<AccessMode> { self.buffer.access_mode() }
}

impl TextStream for TextFile {
    fn encoding(&self) -> Option<&'static Encoding> { Some(self.encoding) }

    fn buffer(&self) -> Option<Rc<dyn ByteStream>> { Some(self.buffer.clone()) }

    fn read_line(&self) -> Result<String, CmdlineError> {
        let bytes = self.buffer.read_line_bytes()?;
        // A line (or the unterminated tail at end of stream) is always complete.
        let mut decoder = self.decoder.borrow_mut();
        match self.policy {
            DecodeErrorPolicy::Replace => Ok(decoder.decode(&bytes, true)),
            DecodeErrorPolicy::Strict => decoder.try_decode(&bytes, true),
        }
    }

    fn write_text(&self, text: &str) -> Result<(), CmdlineError> {
        let bytes = self.encoder.borrow_mut().encode(text, false);
        self.buffer.write_bytes(&bytes)?;
        if self.line_buffering && text.contains('\n') {
            self.flush_text()?;
        }
        Ok(())
    }

    fn flush_text(&self) -> Result<(), CmdlineError> {
        let tail = self.encoder.borrow_mut().encode("", true);
        if !tail.is_empty() {
            self.buffer.write_bytes(&tail)?;
        }
        self.buffer.flush_bytes()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferStrategy, BufferedStream, FdRawStream};
    use pretty_assertions::assert_eq;

    fn text_pipe(
        encoding: &'static Encoding,
        policy: DecodeErrorPolicy,
    ) -> (TextFile, TextFile) {
        let (read_end, write_end) = rustix::pipe::pipe().unwrap();
        let reader = Rc::new(BufferedStream::new(
            Rc::new(FdRawStream::new(read_end.into(), None)),
            BufferStrategy::Reader,
            64,
        ));
        let writer = Rc::new(BufferedStream::new(
            Rc::new(FdRawStream::new(write_end.into(), None)),
            BufferStrategy::Writer,
            64,
        ));
        (
            TextFile::new(reader, encoding, policy, false),
            TextFile::new(writer, encoding, policy, true),
        )
    }

    #[test]
    fn line_buffered_write_then_read() {
        let (reader, writer) = text_pipe(encoding_rs::UTF_8, DecodeErrorPolicy::Strict);
        writer.write_text("héllo\n").unwrap();
        assert_eq!(reader.read_line().unwrap(), "héllo\n");
    }

    #[test]
    fn legacy_encoding_round_trip() {
        let (reader, writer) =
            text_pipe(encoding_rs::WINDOWS_1252, DecodeErrorPolicy::Strict);
        writer.write_text("café\n").unwrap();
        assert_eq!(reader.read_line().unwrap(), "café\n");
    }

    #[test]
    fn strict_policy_rejects_malformed_line() {
        let (reader, writer) = text_pipe(encoding_rs::UTF_8, DecodeErrorPolicy::Strict);
        writer.buffer().unwrap().write_bytes(b"bad\xFF\n").unwrap();
        writer.flush_text().unwrap();
        assert!(matches!(
            reader.read_line(),
            Err(CmdlineError::MalformedInput { .. })
        ));
    }

    #[test]
    fn replace_policy_substitutes() {
        let (reader, writer) = text_pipe(encoding_rs::UTF_8, DecodeErrorPolicy::Replace);
        writer.buffer().unwrap().write_bytes(b"bad\xFF\n").unwrap();
        writer.flush_text().unwrap();
        assert_eq!(reader.read_line().unwrap(), "bad\u{FFFD}\n");
    }

    #[test]
    fn capabilities_come_from_below() {
        let (reader, writer) = text_pipe(encoding_rs::UTF_8, DecodeErrorPolicy::Strict);
        assert_eq!(reader.access_mode(), Some(AccessMode::Read));
        assert_eq!(writer.access_mode(), Some(AccessMode::Write));
        assert!(reader.fileno().is_some());
        assert_eq!(reader.encoding().map(Encoding::name), Some("UTF-8"));
    }
}
