// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words termios fsync

//! [`CmdlineTransport`]: lines in, text out, over a [`Reactor`].
//!
//! # Lifecycle
//!
//! ```text
//! new() ─────▶ Unconnected ── connection_made delivered ──▶ Connected
//!                   │                                          │
//!                   └───────────────── close() ────────────────┴──▶ Closed
//! ```
//!
//! Construction never calls the protocol or touches the reactor's readiness lists. It
//! schedules two tasks: deliver `connection_made`, then register the input reader.
//!
//! # Read path
//!
//! Each read-ready turn reads at most [`TransportConfig::read_chunk_size`] bytes from the
//! input's raw view and feeds them to a [`LineAssembler`]. Every completed line is
//! delivered through [`Reactor::schedule_soon`]. End of input (zero bytes, or `EIO` from
//! a tty whose other side hung up) flushes the unterminated tail as a last line, delivers
//! `eof_received` and drops the reader.
//!
//! # Write path
//!
//! [`write()`](CmdlineTransport::write) encodes, appends to the [`OutboundQueue`] and
//! makes sure a writer is registered. Each write-ready turn writes at most
//! [`TransportConfig::write_chunk_size`] bytes of the front chunk. Whatever the OS did
//! not accept goes back to the front. The writer is registered exactly while the queue
//! is non-empty: it is dropped in the same turn the last byte is written.
//!
//! # Registration refused
//!
//! Some descriptors cannot be watched (regular files make `epoll` answer `EPERM`). The
//! transport keeps working in a degraded mode: the refusal is logged and reported by
//! [`registration_status()`](CmdlineTransport::registration_status), and the affected
//! direction simply never becomes ready.

use crate::{CmdlineError, DEBUG_CMDLINE_TRANSPORT, IncrementalEncoder, LineAssembler,
            OutboundQueue, Protocol, Reactor, ReadyCallback, ResolveOptions,
            SavedTerminalAttributes, SharedProtocol, StreamDescriptor, StreamHandle,
            TransportConfig, enter_raw, resolve, restore};
use rustix::io::Errno;
use std::{cell::RefCell,
          fmt,
          io::{self, ErrorKind},
          os::fd::RawFd,
          rc::{Rc, Weak}};

/// Where a transport is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportLifecycle {
    /// Constructed, `connection_made` not delivered yet.
    Unconnected,
    Connected,
    Closed,
}

/// Whether the reactor is watching one direction of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStatus {
    NotRegistered,
    Registered,
    /// The reactor refused to watch the descriptor. This direction will not make progress.
    Refused(ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationStatus {
    pub reader: WatchStatus,
    pub writer: WatchStatus,
}

impl RegistrationStatus {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self.reader, WatchStatus::Refused(_))
            || matches!(self.writer, WatchStatus::Refused(_))
    }
}

/// Event-driven bidirectional text transport over a pair of streams. See the
/// [module documentation](self).
///
/// Cloning is cheap and every clone refers to the same transport.
#[derive(Clone)]
pub struct CmdlineTransport {
    inner: Rc<TransportInner>,
}

struct TransportInner {
    reactor: Rc<dyn Reactor>,
    input: StreamDescriptor,
    output: StreamDescriptor,
    input_fd: RawFd,
    output_fd: RawFd,
    /// Present only for tty input.
    terminal: Option<StreamDescriptor>,
    terminal_shared: bool,
    read_chunk_size: usize,
    write_chunk_size: usize,
    state: RefCell<TransportState>,
}

struct TransportState {
    lifecycle: TransportLifecycle,
    protocol: Option<SharedProtocol>,
    assembler: LineAssembler,
    encoder: IncrementalEncoder,
    queue: OutboundQueue,
    saved_attributes: Option<SavedTerminalAttributes>,
    reader: WatchStatus,
    writer: WatchStatus,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Read,
    Write,
}

impl CmdlineTransport {
    /// Resolve both streams, switch a tty input to non-canonical mode, and schedule
    /// `connection_made` followed by reader registration.
    ///
    /// The input is resolved with mode `"r"` and made non-blocking; the output with mode
    /// `"w"`. If the input is a tty, the terminal stream is the output itself when both
    /// are the same device, otherwise the input's terminal opened for writing.
    ///
    /// # Errors
    ///
    /// - Anything [`resolve()`] reports.
    /// - [`CmdlineError::MissingDescriptor`] if either stream has no OS descriptor.
    /// - [`CmdlineError::TerminalAttributes`] if a tty input cannot be switched.
    /// - Errors from [`StreamDescriptor::tty_path()`] when the terminal must be opened.
    pub fn new(
        reactor: Rc<dyn Reactor>,
        protocol: SharedProtocol,
        input: StreamHandle,
        output: StreamHandle,
        config: &TransportConfig,
    ) -> Result<Self, CmdlineError> {
        let input = resolve(
            &input,
            &ResolveOptions {
                mode: Some("r"),
                encoding: config.input_encoding.as_deref(),
                non_blocking: true,
            },
        )?;
        let output = resolve(
            &output,
            &ResolveOptions {
                mode: Some("w"),
                encoding: config.output_encoding.as_deref(),
                non_blocking: false,
            },
        )?;

        let input_fd = input
            .fd
            .as_ref()
            .ok_or(CmdlineError::MissingDescriptor { which: "input" })?
            .as_raw_fd();
        let output_fd = output
            .fd
            .as_ref()
            .ok_or(CmdlineError::MissingDescriptor { which: "output" })?
            .as_raw_fd();

        let (saved_attributes, terminal, terminal_shared) = match &input.fd {
            Some(fd) if input.is_tty => {
                let saved = enter_raw(fd)?;
                match open_terminal(&input, &output) {
                    Ok((terminal, shared)) => (Some(saved), Some(terminal), shared),
                    Err(err) => {
                        let _unused = restore(fd, &saved);
                        return Err(err);
                    }
                }
            }
            _ => (None, None, false),
        };

        let state = TransportState {
            lifecycle: TransportLifecycle::Unconnected,
            protocol: Some(protocol),
            assembler: LineAssembler::new(input.encoding),
            encoder: IncrementalEncoder::new(output.encoding),
            queue: OutboundQueue::default(),
            saved_attributes,
            reader: WatchStatus::NotRegistered,
            writer: WatchStatus::NotRegistered,
        };

        let transport = Self {
            inner: Rc::new(TransportInner {
                reactor,
                input,
                output,
                input_fd,
                output_fd,
                terminal,
                terminal_shared,
                read_chunk_size: config.read_chunk_size.max(1),
                write_chunk_size: config.write_chunk_size.max(1),
                state: RefCell::new(state),
            }),
        };

        DEBUG_CMDLINE_TRANSPORT.then(|| {
            tracing::debug!(
                message = "transport: created",
                input_fd,
                output_fd,
                input_tty = transport.inner.input.is_tty,
                input_encoding = transport.inner.input.encoding.name(),
                output_encoding = transport.inner.output.encoding.name(),
                terminal_shared
            );
        });

        transport.notify(|protocol, transport| {
            transport.inner.state.borrow_mut().lifecycle = TransportLifecycle::Connected;
            protocol.connection_made(transport);
        });
        transport.defer(|transport| transport.watch(Direction::Read));

        Ok(transport)
    }

    /// Queue `text` for delivery. Returns immediately; the bytes are written on later
    /// reactor turns. Text that encodes to nothing is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CmdlineError::TransportClosed`] after [`close()`](Self::close).
    pub fn write(&self, text: &str) -> Result<(), CmdlineError> {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.lifecycle == TransportLifecycle::Closed {
                return Err(CmdlineError::TransportClosed);
            }
            let bytes = state.encoder.encode(text, true);
            if bytes.is_empty() {
                return Ok(());
            }
            state.queue.push_back(bytes);
        }
        self.watch(Direction::Write);
        Ok(())
    }

    /// Flush the output encoder. Every [`write()`](Self::write) is already self-contained,
    /// so this only queues bytes for encoders that still hold shift state.
    ///
    /// # Errors
    ///
    /// Returns [`CmdlineError::TransportClosed`] after [`close()`](Self::close).
    pub fn write_eof(&self) -> Result<(), CmdlineError> { self.write("") }

    #[must_use]
    pub fn can_write_eof(&self) -> bool { true }

    /// Stop everything: drop the protocol, unregister both callbacks, abandon queued
    /// output, restore the terminal and put the input back in blocking mode. The protocol is not notified. Calling it again
    /// does nothing.
    ///
    /// # Errors
    ///
    /// Errors from restoring terminal attributes or from the reactor. Every step is
    /// attempted regardless, and the transport is closed either way.
    pub fn close(&self) -> Result<(), CmdlineError> {
        let (saved_attributes, abandoned) = {
            let mut state = self.inner.state.borrow_mut();
            if state.lifecycle == TransportLifecycle::Closed {
                return Ok(());
            }
            state.lifecycle = TransportLifecycle::Closed;
            state.protocol = None;
            state.reader = WatchStatus::NotRegistered;
            state.writer = WatchStatus::NotRegistered;
            (state.saved_attributes.take(), state.queue.clear())
        };

        if abandoned > 0 {
            tracing::debug!(message = "transport: abandoned queued output", bytes = abandoned);
        }

        let reader = self.inner.reactor.unregister_reader(self.inner.input_fd);
        let writer = self.inner.reactor.unregister_writer(self.inner.output_fd);
        let restored = match (&saved_attributes, &self.inner.input.fd) {
            (Some(saved), Some(fd)) => restore(fd, saved),
            _ => Ok(()),
        };
        let unblocked = self.inner.input.restore_blocking();

        restored?;
        unblocked?;
        reader?;
        writer?;
        Ok(())
    }

    #[must_use]
    pub fn is_closing(&self) -> bool { self.lifecycle() == TransportLifecycle::Closed }

    #[must_use]
    pub fn lifecycle(&self) -> TransportLifecycle { self.inner.state.borrow().lifecycle }

    /// Replace the protocol. Notifications already scheduled still go to the old one.
    pub fn set_protocol(&self, protocol: SharedProtocol) {
        self.inner.state.borrow_mut().protocol = Some(protocol);
    }

    /// [`None`] after [`close()`](Self::close).
    #[must_use]
    pub fn get_protocol(&self) -> Option<SharedProtocol> {
        self.inner.state.borrow().protocol.clone()
    }

    #[must_use]
    pub fn is_reader_registered(&self) -> bool {
        self.inner.state.borrow().reader == WatchStatus::Registered
    }

    #[must_use]
    pub fn is_writer_registered(&self) -> bool {
        self.inner.state.borrow().writer == WatchStatus::Registered
    }

    #[must_use]
    pub fn registration_status(&self) -> RegistrationStatus {
        let state = self.inner.state.borrow();
        RegistrationStatus {
            reader: state.reader,
            writer: state.writer,
        }
    }

    /// Bytes waiting in the outbound queue.
    #[must_use]
    pub fn queued_bytes(&self) -> usize { self.inner.state.borrow().queue.total_bytes() }

    #[must_use]
    pub fn input(&self) -> &StreamDescriptor { &self.inner.input }

    #[must_use]
    pub fn output(&self) -> &StreamDescriptor { &self.inner.output }

    /// The stream on the controlling terminal, for tty input only.
    #[must_use]
    pub fn terminal(&self) -> Option<&StreamDescriptor> { self.inner.terminal.as_ref() }

    /// `true` if the terminal stream is the output stream itself.
    #[must_use]
    pub fn is_terminal_shared(&self) -> bool { self.inner.terminal_shared }

    /// # Errors
    ///
    /// Always [`CmdlineError::NotSupported`].
    pub fn get_write_buffer_size(&self) -> Result<usize, CmdlineError> {
        Err(not_supported("get_write_buffer_size"))
    }

    /// # Errors
    ///
    /// Always [`CmdlineError::NotSupported`].
    pub fn set_write_buffer_limits(
        &self,
        _high: Option<usize>,
        _low: Option<usize>,
    ) -> Result<(), CmdlineError> {
        Err(not_supported("set_write_buffer_limits"))
    }

    /// # Errors
    ///
    /// Always [`CmdlineError::NotSupported`].
    pub fn abort(&self) -> Result<(), CmdlineError> { Err(not_supported("abort")) }

    /// # Errors
    ///
    /// Always [`CmdlineError::NotSupported`].
    pub fn pause_reading(&self) -> Result<(), CmdlineError> {
        Err(not_supported("pause_reading"))
    }

    /// # Errors
    ///
    /// Always [`CmdlineError::NotSupported`].
    pub fn resume_reading(&self) -> Result<(), CmdlineError> {
        Err(not_supported("resume_reading"))
    }
}

// Reactor plumbing.
impl CmdlineTransport {
    fn downgrade(&self) -> Weak<TransportInner> { Rc::downgrade(&self.inner) }

    fn upgrade(weak: &Weak<TransportInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn defer(&self, task: impl FnOnce(CmdlineTransport) + 'static) {
        let weak = self.downgrade();
        self.inner.reactor.schedule_soon(Box::new(move || {
            if let Some(transport) = Self::upgrade(&weak) {
                task(transport);
            }
        }));
    }

    /// Deliver `event` to the protocol installed right now, on a later turn, unless the
    /// transport is closed by then. A protocol that is already borrowed when the turn
    /// comes misses the event.
    fn notify(&self, event: impl FnOnce(&mut dyn Protocol, CmdlineTransport) + 'static) {
        let Some(protocol) = self.get_protocol() else {
            return;
        };
        self.defer(move |transport| {
            if transport.is_closing() {
                return;
            }
            match protocol.try_borrow_mut() {
                Ok(mut it) => event(&mut *it, transport),
                Err(_) => {
                    tracing::warn!(message = "transport: protocol busy, event dropped");
                }
            }
        });
    }

    fn callback(&self, on_ready: fn(&CmdlineTransport) -> io::Result<()>) -> ReadyCallback {
        let weak = self.downgrade();
        Rc::new(move || match Self::upgrade(&weak) {
            Some(transport) => on_ready(&transport),
            None => Ok(()),
        })
    }

    /// Register a callback for `direction` unless one is registered already. A refusal
    /// is recorded and logged, not returned.
    fn watch(&self, direction: Direction) {
        let current = {
            let state = self.inner.state.borrow();
            if state.lifecycle == TransportLifecycle::Closed {
                return;
            }
            match direction {
                Direction::Read => state.reader,
                Direction::Write => state.writer,
            }
        };
        if current == WatchStatus::Registered {
            return;
        }

        let (fd, result) = match direction {
            Direction::Read => (
                self.inner.input_fd,
                self.inner
                    .reactor
                    .register_reader(self.inner.input_fd, self.callback(Self::on_input_ready)),
            ),
            Direction::Write => (
                self.inner.output_fd,
                self.inner.reactor.register_writer(
                    self.inner.output_fd,
                    self.callback(Self::on_output_ready),
                ),
            ),
        };

        let next = match result {
            Ok(()) => WatchStatus::Registered,
            Err(err) => {
                if current != WatchStatus::Refused(err.kind()) {
                    tracing::warn!(
                        message = "transport: reactor refused to watch descriptor",
                        ?direction,
                        fd,
                        error = %err
                    );
                }
                WatchStatus::Refused(err.kind())
            }
        };

        let mut state = self.inner.state.borrow_mut();
        match direction {
            Direction::Read => state.reader = next,
            Direction::Write => state.writer = next,
        }
    }

    fn unwatch(&self, direction: Direction) -> io::Result<()> {
        match direction {
            Direction::Read => {
                self.inner.reactor.unregister_reader(self.inner.input_fd)?;
                self.inner.state.borrow_mut().reader = WatchStatus::NotRegistered;
            }
            Direction::Write => {
                self.inner.reactor.unregister_writer(self.inner.output_fd)?;
                self.inner.state.borrow_mut().writer = WatchStatus::NotRegistered;
            }
        }
        Ok(())
    }

    fn on_input_ready(&self) -> io::Result<()> {
        if self.is_closing() {
            return Ok(());
        }
        let Some(raw) = self.inner.input.raw.clone() else {
            return Ok(());
        };

        let mut buf = vec![0_u8; self.inner.read_chunk_size];
        let count = match raw.read_raw(&mut buf) {
            Ok(count) => count,
            Err(err)
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) =>
            {
                return Ok(());
            }
            // The other side of a pty hung up.
            Err(err)
                if self.inner.input.is_tty
                    && err.raw_os_error() == Some(Errno::IO.raw_os_error()) =>
            {
                0
            }
            Err(err) => return Err(err),
        };

        DEBUG_CMDLINE_TRANSPORT.then(|| {
            tracing::debug!(message = "transport: read", bytes = count);
        });

        if count == 0 {
            return self.on_end_of_input();
        }

        let lines = self.inner.state.borrow_mut().assembler.feed(&buf[..count]);
        for line in lines {
            self.notify(move |protocol, _| protocol.data_received(line));
        }
        Ok(())
    }

    fn on_end_of_input(&self) -> io::Result<()> {
        let tail = self.inner.state.borrow_mut().assembler.finish();
        if let Some(line) = tail {
            self.notify(move |protocol, _| protocol.data_received(line));
        }
        self.notify(|protocol, _| protocol.eof_received());
        self.unwatch(Direction::Read)
    }

    fn on_output_ready(&self) -> io::Result<()> {
        if self.is_closing() {
            return Ok(());
        }
        let Some(raw) = self.inner.output.raw.clone() else {
            return Ok(());
        };
        let chunk = self.inner.state.borrow_mut().queue.pop_front();
        let Some(mut chunk) = chunk else {
            return self.on_output_drained();
        };

        let limit = chunk.len().min(self.inner.write_chunk_size);
        let written = match raw.write_raw(&chunk[..limit]) {
            Ok(written) => written,
            Err(err)
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) =>
            {
                0
            }
            Err(err) => {
                self.inner.state.borrow_mut().queue.requeue_front(chunk);
                return Err(err);
            }
        };

        DEBUG_CMDLINE_TRANSPORT.then(|| {
            tracing::debug!(
                message = "transport: write",
                offered = limit,
                written,
                chunk = chunk.len()
            );
        });

        let is_drained = {
            let mut state = self.inner.state.borrow_mut();
            if written < chunk.len() {
                chunk.drain(..written);
                state.queue.requeue_front(chunk);
            }
            state.queue.is_empty()
        };

        if is_drained {
            self.on_output_drained()?;
        }
        Ok(())
    }

    fn on_output_drained(&self) -> io::Result<()> {
        self.unwatch(Direction::Write)?;
        if let Some(fd) = &self.inner.output.fd {
            // Pipes and ttys answer EINVAL.
            let _unused = rustix::fs::fsync(fd);
        }
        Ok(())
    }
}

fn open_terminal(
    input: &StreamDescriptor,
    output: &StreamDescriptor,
) -> Result<(StreamDescriptor, bool), CmdlineError> {
    if input == output {
        return Ok((output.clone(), true));
    }
    let tty = input.tty_path("w")?;
    let terminal = resolve(
        &StreamHandle::Text(tty),
        &ResolveOptions {
            mode: Some("w"),
            ..Default::default()
        },
    )?;
    Ok((terminal, false))
}

fn not_supported(operation: &'static str) -> CmdlineError {
    tracing::error!(message = "transport: unsupported operation", operation);
    CmdlineError::NotSupported { operation }
}

impl fmt::Debug for CmdlineTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("CmdlineTransport")
            .field("lifecycle", &state.lifecycle)
            .field("input_fd", &self.inner.input_fd)
            .field("output_fd", &self.inner.output_fd)
            .field("reader", &state.reader)
            .field("writer", &state.writer)
            .field("queued_bytes", &state.queue.total_bytes())
            .finish_non_exhaustive()
    }
}
