// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words ttyname noctty cloexec

use crate::{AccessMode, BufferStrategy, BufferedStream, ByteStream, CmdlineError,
            DEFAULT_BUFFER_CAPACITY, DecodeErrorPolicy, FdRawStream, OpenMode, RawStream,
            SharedFd, StreamHandle, TextFile, TextStream, device_encoding,
            lookup_encoding};
use encoding_rs::Encoding;
use rustix::fs::{Mode, OFlags};
use std::rc::Rc;

/// Hints for [`resolve()`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions<'a> {
    /// Mode string such as `"r"` or `"w+b"`. Queried from the descriptor when absent.
    pub mode: Option<&'a str>,
    /// Encoding label that overrides every other source.
    pub encoding: Option<&'a str>,
    /// Clear the descriptor's blocking flag.
    pub non_blocking: bool,
}

/// Everything the transport needs to know about one side of the connection.
///
/// The three views are kept consistent: each one present is layered over the one below
/// it and agrees with [`mode`](Self::mode).
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    pub fd: Option<SharedFd>,
    pub is_tty: bool,
    pub encoding: &'static Encoding,
    pub mode: OpenMode,
    pub raw: Option<Rc<dyn RawStream>>,
    pub buffered: Option<Rc<dyn ByteStream>>,
    pub text: Option<Rc<dyn TextStream>>,
    /// [`resolve()`] cleared the blocking flag, so [`restore_blocking()`] has to set it
    /// back.
    ///
    /// [`restore_blocking()`]: Self::restore_blocking
    pub made_non_blocking: bool,
}

/// Normalize `handle` into a [`StreamDescriptor`].
///
/// 1. Reject handles that can neither read nor write.
/// 2. Peel text → buffered → raw. The descriptor is the first one reported, innermost
///    layer first.
/// 3. Detect tty-ness: the handle's own answer, else `isatty(fd)`, else `false`.
/// 4. Pick the encoding: override, else the text layer's, else the device encoding, else
///    UTF-8.
/// 5. Clear the blocking flag if asked to, only if it is set.
/// 6. Settle the mode: the hint, else the descriptor's access bits.
/// 7. Rebuild missing or mismatched layers bottom-up.
///
/// # Errors
///
/// - [`CmdlineError::InvalidHandle`] if the handle is unusable.
/// - [`CmdlineError::InvalidMode`] if the mode hint is not legal.
/// - [`CmdlineError::UnknownEncoding`] if the encoding override is not recognized.
/// - [`CmdlineError::Io`] if the blocking flag could not be changed.
pub fn resolve(
    handle: &StreamHandle,
    options: &ResolveOptions<'_>,
) -> Result<StreamDescriptor, CmdlineError> {
    if !handle.is_usable() {
        return Err(CmdlineError::InvalidHandle {
            reason: "handle is neither readable nor writable".to_string(),
        });
    }

    // Validate every hint before touching the descriptor.
    let mode_hint = options.mode.map(OpenMode::parse).transpose()?;
    let encoding_override = options.encoding.map(lookup_encoding).transpose()?;

    let (mut text, mut buffered, mut raw) = peel(handle);

    let fd = raw
        .as_ref()
        .and_then(|it| it.fileno())
        .or_else(|| buffered.as_ref().and_then(|it| it.fileno()))
        .or_else(|| text.as_ref().and_then(|it| it.fileno()));

    let is_tty = outer_is_tty(handle)
        .or_else(|| fd.as_ref().map(rustix::termios::isatty))
        .unwrap_or(false);

    let encoding = encoding_override
        .or_else(|| text.as_ref().and_then(|it| it.encoding()))
        .or_else(|| fd.as_ref().and_then(device_encoding))
        .unwrap_or(encoding_rs::UTF_8);

    let made_non_blocking = match (&fd, options.non_blocking) {
        (Some(fd), true) => set_non_blocking(fd)?,
        _ => false,
    };

    let mut mode = mode_hint.unwrap_or_else(|| {
        OpenMode::from_access(
            fd.as_ref()
                .and_then(AccessMode::query)
                .unwrap_or(AccessMode::ReadWrite),
        )
    });

    // Raw layer.
    if let Some(fd) = &fd {
        let reported = raw.as_ref().and_then(|it| it.access_mode());
        if disagrees(reported, &raw, &mode) {
            raw = Some(Rc::new(FdRawStream::new(fd.clone(), Some(mode.access()))));
        }
    } else if let Some(existing) = &raw {
        mode = adopt(mode, existing.access_mode());
    }

    // Buffered layer.
    match &raw {
        Some(raw_stream) => {
            let reported = buffered.as_ref().and_then(|it| it.access_mode());
            if disagrees(reported, &buffered, &mode) {
                let strategy =
                    BufferStrategy::for_access(mode.access(), raw_stream.is_seekable());
                buffered = Some(Rc::new(BufferedStream::new(
                    raw_stream.clone(),
                    strategy,
                    DEFAULT_BUFFER_CAPACITY,
                )));
            }
        }
        None => {
            if let Some(existing) = &buffered {
                mode = adopt(mode, existing.access_mode());
            }
        }
    }

    // Text layer.
    if let Some(buffered_stream) = &buffered {
        let reported = text.as_ref().and_then(|it| it.access_mode());
        if disagrees(reported, &text, &mode) {
            text = Some(Rc::new(TextFile::new(
                buffered_stream.clone(),
                encoding,
                DecodeErrorPolicy::for_tty(is_tty),
                true,
            )));
        }
    }

    Ok(StreamDescriptor {
        fd,
        is_tty,
        encoding,
        mode,
        raw,
        buffered,
        text,
        made_non_blocking,
    })
}

impl StreamDescriptor {
    /// Undo the blocking flag change made by [`resolve()`], if it made one. The open file
    /// description is shared with the parent shell, which expects it blocking again.
    ///
    /// # Errors
    ///
    /// [`CmdlineError::Io`] if the flags could not be read or written.
    pub fn restore_blocking(&self) -> Result<(), CmdlineError> {
        match (&self.fd, self.made_non_blocking) {
            (Some(fd), true) => clear_non_blocking(fd),
            _ => Ok(()),
        }
    }

    /// Open the terminal device behind this stream (via `ttyname`) as a fresh text
    /// stream. Used to reach the terminal when the transport's output is redirected
    /// elsewhere.
    ///
    /// # Errors
    ///
    /// - [`CmdlineError::NotATty`] if this stream has no descriptor or it is not a tty.
    /// - [`CmdlineError::InvalidMode`] if `mode` is not legal.
    /// - [`CmdlineError::Io`] if the device cannot be named or opened.
    pub fn tty_path(&self, mode: &str) -> Result<Rc<TextFile>, CmdlineError> {
        let fd = match (&self.fd, self.is_tty) {
            (None, _) => {
                return Err(CmdlineError::NotATty {
                    reason: "stream has no file descriptor",
                });
            }
            (Some(_), false) => {
                return Err(CmdlineError::NotATty {
                    reason: "descriptor is not a terminal",
                });
            }
            (Some(fd), true) => fd,
        };
        let mode = OpenMode::parse(mode)?;

        let path = rustix::termios::ttyname(fd, Vec::new())?;
        let access_flags = match mode.access() {
            AccessMode::Read => OFlags::RDONLY,
            AccessMode::Write => OFlags::WRONLY,
            AccessMode::ReadWrite => OFlags::RDWR,
        };
        let owned = rustix::fs::open(
            path.as_c_str(),
            access_flags | OFlags::NOCTTY | OFlags::CLOEXEC,
            Mode::empty(),
        )?;

        let raw = Rc::new(FdRawStream::new(SharedFd::owned(owned), Some(mode.access())));
        let buffered = Rc::new(BufferedStream::new(
            raw,
            BufferStrategy::for_access(mode.access(), false),
            DEFAULT_BUFFER_CAPACITY,
        ));
        Ok(Rc::new(TextFile::new(
            buffered,
            self.encoding,
            DecodeErrorPolicy::Replace,
            true,
        )))
    }
}

/// Two descriptors are the same stream if they share any view object, the same
/// descriptor number, or the same device and inode.
impl PartialEq for StreamDescriptor {
    fn eq(&self, other: &Self) -> bool {
        same_view(&self.raw, &other.raw)
            || same_view(&self.buffered, &other.buffered)
            || same_view(&self.text, &other.text)
            || match (&self.fd, &other.fd) {
                (Some(lhs), Some(rhs)) => {
                    lhs.as_raw_fd() == rhs.as_raw_fd() || same_file(lhs, rhs)
                }
                _ => false,
            }
    }
}

fn peel(
    handle: &StreamHandle,
) -> (
    Option<Rc<dyn TextStream>>,
    Option<Rc<dyn ByteStream>>,
    Option<Rc<dyn RawStream>>,
) {
    match handle {
        StreamHandle::Text(text) => {
            let buffered = text.buffer();
            let raw = buffered.as_ref().and_then(|it| it.raw());
            (Some(text.clone()), buffered, raw)
        }
        StreamHandle::Bytes(buffered) => (None, Some(buffered.clone()), buffered.raw()),
        StreamHandle::Raw(raw) => (None, None, Some(raw.clone())),
    }
}

fn outer_is_tty(handle: &StreamHandle) -> Option<bool> {
    match handle {
        StreamHandle::Text(it) => it.is_tty(),
        StreamHandle::Bytes(it) => it.is_tty(),
        StreamHandle::Raw(it) => it.is_tty(),
    }
}

/// A layer needs rebuilding if it is missing or reports a different access mode.
fn disagrees<T: ?Sized>(
    reported: Option<AccessMode>,
    layer: &Option<Rc<T>>,
    mode: &OpenMode,
) -> bool {
    layer.is_none() || reported != Some(mode.access())
}

fn adopt(mode: OpenMode, reported: Option<AccessMode>) -> OpenMode {
    match reported {
        Some(access) if access != mode.access() => OpenMode::from_access(access),
        _ => mode,
    }
}

fn same_view<T: ?Sized>(lhs: &Option<Rc<T>>, rhs: &Option<Rc<T>>) -> bool {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => std::ptr::addr_eq(Rc::as_ptr(lhs), Rc::as_ptr(rhs)),
        _ => false,
    }
}

fn same_file(lhs: &SharedFd, rhs: &SharedFd) -> bool {
    match (rustix::fs::fstat(lhs), rustix::fs::fstat(rhs)) {
        (Ok(lhs), Ok(rhs)) => lhs.st_dev == rhs.st_dev && lhs.st_ino == rhs.st_ino,
        _ => false,
    }
}

/// Returns `true` if the flag was changed.
fn set_non_blocking(fd: &SharedFd) -> Result<bool, CmdlineError> {
    let flags = rustix::fs::fcntl_getfl(fd)?;
    if flags.contains(OFlags::NONBLOCK) {
        return Ok(false);
    }
    rustix::fs::fcntl_setfl(fd, flags | OFlags::NONBLOCK)?;
    Ok(true)
}

fn clear_non_blocking(fd: &SharedFd) -> Result<(), CmdlineError> {
    let flags = rustix::fs::fcntl_getfl(fd)?;
    if flags.contains(OFlags::NONBLOCK) {
        rustix::fs::fcntl_setfl(fd, flags.difference(OFlags::NONBLOCK))?;
    }
    Ok(())
}
