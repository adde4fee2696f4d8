// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words EINTR epoll rearm

//! [`MioReactor`]: a single-threaded [`Reactor`] on top of [`mio::Poll`].
//!
//! # One turn of the loop
//!
//! ```text
//! run_once()
//!   1. run the deferred tasks that were queued before this turn started
//!   2. nothing queued and nothing registered? → Continuation::Stop
//!   3. poll (zero timeout if new tasks were queued by step 1)
//!   4. a watched signal arrived? → remember it, re-arm, Continuation::Stop
//!   5. for each ready descriptor: reader callback, then writer callback
//!   6. re-arm every dispatched descriptor
//! ```
//!
//! # Level-triggered readiness
//!
//! [`mio`] is edge-triggered, but the [`Reactor`] contract is level-triggered: a reader
//! that only consumes part of the available bytes must be called again next turn. Step 6
//! re-registers each dispatched descriptor with `EPOLL_CTL_MOD`, which makes the kernel
//! re-check its readiness on the next poll.
//!
//! # EINTR
//!
//! An interrupted poll ends the turn with [`Continuation::Continue`] and no callbacks.
//!
//! # Signals
//!
//! [`stop_on_signals()`](MioReactor::stop_on_signals) registers a [`Signals`] source
//! on the same poll instance. Its delivery stops the loop instead of killing the process,
//! so the caller gets to close the transport and restore the terminal.

use crate::{Continuation, DEBUG_CMDLINE_REACTOR, DeferredTask, Reactor, ReadyCallback};
use mio::{Events, Interest, Poll, Token, unix::SourceFd};
use signal_hook_mio::v1_0::Signals;
use std::{cell::{Cell, RefCell},
          collections::{HashMap, VecDeque},
          ffi::c_int,
          io::{self, ErrorKind},
          os::fd::RawFd,
          time::Duration};

/// Capacity for the [`mio::Events`] buffer.
const EVENTS_CAPACITY: usize = 64;

/// Descriptor tokens count up from zero, so this one stays clear of them.
const SIGNALS_TOKEN: Token = Token(usize::MAX);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

struct Registration {
    token: Token,
    reader: Option<ReadyCallback>,
    writer: Option<ReadyCallback>,
}

impl Registration {
    fn slot_mut(&mut self, direction: Direction) -> &mut Option<ReadyCallback> {
        match direction {
            Direction::Read => &mut self.reader,
            Direction::Write => &mut self.writer,
        }
    }

    fn interest(&self) -> Option<Interest> {
        match (self.reader.is_some(), self.writer.is_some()) {
            (true, true) => Some(Interest::READABLE.add(Interest::WRITABLE)),
            (true, false) => Some(Interest::READABLE),
            (false, true) => Some(Interest::WRITABLE),
            (false, false) => None,
        }
    }
}

/// Readiness reported for one descriptor in one turn.
#[derive(Debug, Clone, Copy)]
struct Ready {
    fd: RawFd,
    token: Token,
    read: bool,
    write: bool,
}

/// See the [module documentation](self).
#[allow(missing_debug_implementations)]
pub struct MioReactor {
    poll_handle: RefCell<Poll>,
    ready_events_buffer: RefCell<Events>,
    registrations: RefCell<HashMap<RawFd, Registration>>,
    deferred: RefCell<VecDeque<DeferredTask>>,
    next_token: Cell<usize>,
    stop_requested: Cell<bool>,
    signals: RefCell<Option<Signals>>,
    caught_signal: Cell<Option<c_int>>,
}

impl MioReactor {
    /// # Errors
    ///
    /// The OS refused to create a poll instance.
    pub fn try_new() -> io::Result<Self> {
        Ok(Self {
            poll_handle: RefCell::new(Poll::new()?),
            ready_events_buffer: RefCell::new(Events::with_capacity(EVENTS_CAPACITY)),
            registrations: RefCell::new(HashMap::new()),
            deferred: RefCell::new(VecDeque::new()),
            next_token: Cell::new(0),
            stop_requested: Cell::new(false),
            signals: RefCell::new(None),
            caught_signal: Cell::new(None),
        })
    }

    /// Stop the loop when any of `signals` is delivered, instead of letting its default
    /// action end the process. Replaces the set from an earlier call.
    ///
    /// # Errors
    ///
    /// The signal handlers could not be installed, or the poll refused the source.
    pub fn stop_on_signals(&self, signals: &[c_int]) -> io::Result<()> {
        let mut source = Signals::new(signals)?;
        let poll_handle = self.poll_handle.borrow();
        let registry = poll_handle.registry();
        if let Some(mut previous) = self.signals.borrow_mut().take() {
            registry.deregister(&mut previous)?;
        }
        registry.register(&mut source, SIGNALS_TOKEN, Interest::READABLE)?;
        *self.signals.borrow_mut() = Some(source);
        Ok(())
    }

    /// The last signal that stopped the loop, see
    /// [`stop_on_signals()`](Self::stop_on_signals).
    #[must_use]
    pub fn caught_signal(&self) -> Option<c_int> { self.caught_signal.get() }

    /// Run one turn. `timeout` bounds the poll when there is no deferred work; [`None`]
    /// blocks until a descriptor is ready.
    ///
    /// Returns [`Continuation::Stop`] when there is nothing left to do: no deferred
    /// tasks and no registered callbacks.
    ///
    /// # Errors
    ///
    /// Poll failures other than `EINTR`, and the first error returned by a callback.
    pub fn run_once(&self, timeout: Option<Duration>) -> io::Result<Continuation> {
        // Tasks scheduled by these tasks wait for the next turn.
        let due = self.deferred.borrow().len();
        for _ in 0..due {
            let task = self.deferred.borrow_mut().pop_front();
            if let Some(task) = task {
                task();
            }
        }

        let has_deferred = !self.deferred.borrow().is_empty();
        if !has_deferred && self.registrations.borrow().is_empty() {
            return Ok(Continuation::Stop);
        }

        let timeout = if has_deferred { Some(Duration::ZERO) } else { timeout };
        let (ready_list, signalled) = match self.poll(timeout) {
            Ok(it) => it,
            Err(err) if err.kind() == ErrorKind::Interrupted => {
                return Ok(Continuation::Continue);
            }
            Err(err) => return Err(err),
        };

        let signal = if signalled { self.drain_signals() } else { None };
        if let Some(signal) = signal {
            DEBUG_CMDLINE_REACTOR.then(|| {
                tracing::debug!(message = "mio-reactor: stopped by signal", signal);
            });
            self.caught_signal.set(Some(signal));
            self.stop_requested.set(true);
            for ready in &ready_list {
                self.rearm(ready.fd)?;
            }
            return Ok(Continuation::Stop);
        }

        DEBUG_CMDLINE_REACTOR.then(|| {
            tracing::debug!(
                message = "mio-reactor: turn",
                due_tasks = due,
                ready = ?ready_list
            );
        });

        for (index, ready) in ready_list.iter().enumerate() {
            let outcome = self.dispatch(*ready);
            self.rearm(ready.fd)?;
            if let Err(err) = outcome {
                for remaining in &ready_list[index + 1..] {
                    self.rearm(remaining.fd)?;
                }
                return Err(err);
            }
        }

        Ok(Continuation::Continue)
    }

    /// Run turns until there is nothing left to do or [`stop()`](Self::stop) is called.
    ///
    /// # Errors
    ///
    /// See [`run_once()`](Self::run_once).
    pub fn run(&self) -> io::Result<()> { self.run_until(|| false) }

    /// Run turns until `done` returns `true`, there is nothing left to do, or
    /// [`stop()`](Self::stop) is called. `done` is checked before every turn.
    ///
    /// # Errors
    ///
    /// See [`run_once()`](Self::run_once).
    pub fn run_until(&self, mut done: impl FnMut() -> bool) -> io::Result<()> {
        self.stop_requested.set(false);
        while !done() && !self.stop_requested.get() {
            if self.run_once(None)? == Continuation::Stop {
                break;
            }
        }
        Ok(())
    }

    /// Ask [`run()`](Self::run) to return after the current turn.
    pub fn stop(&self) { self.stop_requested.set(true); }

    #[must_use]
    pub fn pending_tasks(&self) -> usize { self.deferred.borrow().len() }

    #[must_use]
    pub fn has_reader(&self, fd: RawFd) -> bool {
        self.registrations
            .borrow()
            .get(&fd)
            .is_some_and(|it| it.reader.is_some())
    }

    #[must_use]
    pub fn has_writer(&self, fd: RawFd) -> bool {
        self.registrations
            .borrow()
            .get(&fd)
            .is_some_and(|it| it.writer.is_some())
    }

    /// Ready descriptors, and whether the signal source fired.
    fn poll(&self, timeout: Option<Duration>) -> io::Result<(Vec<Ready>, bool)> {
        let mut poll_handle = self.poll_handle.borrow_mut();
        let mut events = self.ready_events_buffer.borrow_mut();
        poll_handle.poll(&mut events, timeout)?;

        let signalled = events.iter().any(|event| event.token() == SIGNALS_TOKEN);
        let registrations = self.registrations.borrow();
        let ready_list = events
            .iter()
            .filter_map(|event| {
                let (fd, _) = registrations
                    .iter()
                    .find(|(_, it)| it.token == event.token())?;
                Some(Ready {
                    fd: *fd,
                    token: event.token(),
                    read: event.is_readable() || event.is_read_closed() || event.is_error(),
                    write: event.is_writable()
                        || event.is_write_closed()
                        || event.is_error(),
                })
            })
            .collect();
        Ok((ready_list, signalled))
    }

    /// Empty the signal source. Returns the last signal received, if any.
    fn drain_signals(&self) -> Option<c_int> {
        let mut signals = self.signals.borrow_mut();
        signals.as_mut()?.pending().last()
    }

    /// Callbacks are cloned out of the map before running, so they are free to register
    /// and unregister.
    fn dispatch(&self, ready: Ready) -> io::Result<()> {
        if ready.read {
            if let Some(callback) = self.callback(ready, Direction::Read) {
                callback()?;
            }
        }
        if ready.write {
            if let Some(callback) = self.callback(ready, Direction::Write) {
                callback()?;
            }
        }
        Ok(())
    }

    fn callback(&self, ready: Ready, direction: Direction) -> Option<ReadyCallback> {
        let mut registrations = self.registrations.borrow_mut();
        let registration = registrations.get_mut(&ready.fd)?;
        // The descriptor number may have been reused by a newer registration.
        if registration.token != ready.token {
            return None;
        }
        registration.slot_mut(direction).clone()
    }

    fn rearm(&self, fd: RawFd) -> io::Result<()> {
        let registrations = self.registrations.borrow();
        let Some(registration) = registrations.get(&fd) else {
            return Ok(());
        };
        let Some(interest) = registration.interest() else {
            return Ok(());
        };
        self.poll_handle.borrow().registry().reregister(
            &mut SourceFd(&fd),
            registration.token,
            interest,
        )
    }

    fn add(&self, fd: RawFd, direction: Direction, callback: ReadyCallback) -> io::Result<()> {
        let poll_handle = self.poll_handle.borrow();
        let registry = poll_handle.registry();
        let mut registrations = self.registrations.borrow_mut();

        if let Some(registration) = registrations.get_mut(&fd) {
            let previous = registration.slot_mut(direction).replace(callback);
            let Some(interest) = registration.interest() else {
                return Ok(());
            };
            if let Err(err) =
                registry.reregister(&mut SourceFd(&fd), registration.token, interest)
            {
                *registration.slot_mut(direction) = previous;
                return Err(err);
            }
            return Ok(());
        }

        let token = Token(self.next_token.get());
        self.next_token.set(token.0.wrapping_add(1));
        let mut registration = Registration {
            token,
            reader: None,
            writer: None,
        };
        *registration.slot_mut(direction) = Some(callback);
        let interest = match direction {
            Direction::Read => Interest::READABLE,
            Direction::Write => Interest::WRITABLE,
        };
        registry.register(&mut SourceFd(&fd), token, interest)?;
        registrations.insert(fd, registration);

        DEBUG_CMDLINE_REACTOR.then(|| {
            tracing::debug!(message = "mio-reactor: registered", fd, ?direction);
        });
        Ok(())
    }

    fn remove(&self, fd: RawFd, direction: Direction) -> io::Result<bool> {
        let poll_handle = self.poll_handle.borrow();
        let registry = poll_handle.registry();
        let mut registrations = self.registrations.borrow_mut();

        let Some(registration) = registrations.get_mut(&fd) else {
            return Ok(false);
        };
        if registration.slot_mut(direction).take().is_none() {
            return Ok(false);
        }

        match registration.interest() {
            Some(interest) => {
                registry.reregister(&mut SourceFd(&fd), registration.token, interest)?;
            }
            None => {
                registrations.remove(&fd);
                registry.deregister(&mut SourceFd(&fd))?;
                DEBUG_CMDLINE_REACTOR.then(|| {
                    tracing::debug!(message = "mio-reactor: deregistered", fd);
                });
            }
        }
        Ok(true)
    }
}

impl Reactor for MioReactor {
    fn schedule_soon(&self, task: DeferredTask) { self.deferred.borrow_mut().push_back(task); }

    fn register_reader(&self, fd: RawFd, callback: ReadyCallback) -> io::Result<()> {
        self.add(fd, Direction::Read, callback)
    }

    fn register_writer(&self, fd: RawFd, callback: ReadyCallback) -> io::Result<()> {
        self.add(fd, Direction::Write, callback)
    }

    fn unregister_reader(&self, fd: RawFd) -> io::Result<bool> {
        self.remove(fd, Direction::Read)
    }

    fn unregister_writer(&self, fd: RawFd) -> io::Result<bool> {
        self.remove(fd, Direction::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rustix::fd::AsRawFd;
    use serial_test::serial;
    use signal_hook::consts::SIGUSR1;
    use std::rc::Rc;

    fn counter_callback(counter: &Rc<Cell<usize>>) -> ReadyCallback {
        let counter = counter.clone();
        Rc::new(move || {
            counter.set(counter.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn deferred_tasks_run_in_order_on_later_turns() {
        let reactor = Rc::new(MioReactor::try_new().unwrap());
        let log = Rc::new(RefCell::new(Vec::new()));

        for it in 0..3 {
            let log = log.clone();
            reactor.schedule_soon(Box::new(move || log.borrow_mut().push(it)));
        }
        {
            let log = log.clone();
            let inner_reactor = reactor.clone();
            reactor.schedule_soon(Box::new(move || {
                let log = log.clone();
                inner_reactor.schedule_soon(Box::new(move || log.borrow_mut().push(99)));
            }));
        }

        assert!(log.borrow().is_empty());
        assert_eq!(
            reactor.run_once(Some(Duration::ZERO)).unwrap(),
            Continuation::Continue
        );
        // The task queued during the turn has not run yet.
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(reactor.pending_tasks(), 1);

        reactor.run().unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2, 99]);
    }

    #[test]
    fn idle_reactor_stops() {
        let reactor = MioReactor::try_new().unwrap();
        assert_eq!(reactor.run_once(None).unwrap(), Continuation::Stop);
    }

    #[test]
    fn readiness_is_level_triggered() {
        let reactor = MioReactor::try_new().unwrap();
        let (read_end, write_end) = rustix::pipe::pipe().unwrap();
        let fired = Rc::new(Cell::new(0));

        reactor
            .register_reader(read_end.as_raw_fd(), counter_callback(&fired))
            .unwrap();
        rustix::io::write(&write_end, b"unread").unwrap();

        // The callback never drains the pipe, so it fires every turn.
        for expected in 1..=3 {
            reactor.run_once(Some(Duration::from_secs(1))).unwrap();
            assert_eq!(fired.get(), expected);
        }
    }

    #[test]
    fn writer_fires_until_unregistered() {
        let reactor = MioReactor::try_new().unwrap();
        let (_read_end, write_end) = rustix::pipe::pipe().unwrap();
        let fd = write_end.as_raw_fd();
        let fired = Rc::new(Cell::new(0));

        reactor.register_writer(fd, counter_callback(&fired)).unwrap();
        assert!(reactor.has_writer(fd));
        reactor.run_once(Some(Duration::from_secs(1))).unwrap();
        reactor.run_once(Some(Duration::from_secs(1))).unwrap();
        assert_eq!(fired.get(), 2);

        assert!(reactor.unregister_writer(fd).unwrap());
        assert!(!reactor.unregister_writer(fd).unwrap());
        assert!(!reactor.has_writer(fd));
        assert_eq!(reactor.run_once(None).unwrap(), Continuation::Stop);
    }

    #[test]
    fn reader_and_writer_share_a_descriptor() {
        let reactor = MioReactor::try_new().unwrap();
        let (left, right) = rustix::net::socketpair(
            rustix::net::AddressFamily::UNIX,
            rustix::net::SocketType::STREAM,
            rustix::net::SocketFlags::CLOEXEC,
            None,
        )
        .unwrap();
        let fd = left.as_raw_fd();
        let reads = Rc::new(Cell::new(0));
        let writes = Rc::new(Cell::new(0));

        reactor.register_reader(fd, counter_callback(&reads)).unwrap();
        reactor.register_writer(fd, counter_callback(&writes)).unwrap();
        rustix::io::write(&right, b"x").unwrap();
        reactor.run_once(Some(Duration::from_secs(1))).unwrap();
        assert_eq!((reads.get(), writes.get()), (1, 1));

        // Dropping the writer keeps the reader armed.
        assert!(reactor.unregister_writer(fd).unwrap());
        reactor.run_once(Some(Duration::from_secs(1))).unwrap();
        assert_eq!((reads.get(), writes.get()), (2, 1));
    }

    #[test]
    fn callback_errors_propagate() {
        let reactor = MioReactor::try_new().unwrap();
        let (_read_end, write_end) = rustix::pipe::pipe().unwrap();
        reactor
            .register_writer(
                write_end.as_raw_fd(),
                Rc::new(|| Err(io::Error::other("boom"))),
            )
            .unwrap();
        let err = reactor.run_once(Some(Duration::from_secs(1))).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn regular_files_are_refused() {
        let path = std::env::temp_dir()
            .join(format!("r3bl_cmdline_reactor_{}.txt", std::process::id()));
        let file = std::fs::File::create(&path).unwrap();
        let reactor = MioReactor::try_new().unwrap();

        let err = reactor
            .register_reader(file.as_raw_fd(), Rc::new(|| Ok(())))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(!reactor.has_reader(file.as_raw_fd()));

        drop(file);
        let _unused = std::fs::remove_file(path);
    }

    #[test]
    fn stop_ends_run() {
        let reactor = Rc::new(MioReactor::try_new().unwrap());
        let (_read_end, write_end) = rustix::pipe::pipe().unwrap();
        let inner_reactor = reactor.clone();
        reactor
            .register_writer(
                write_end.as_raw_fd(),
                Rc::new(move || {
                    inner_reactor.stop();
                    Ok(())
                }),
            )
            .unwrap();
        reactor.run().unwrap();
        assert!(reactor.has_writer(write_end.as_raw_fd()));
    }

    #[test]
    #[serial]
    fn watched_signal_stops_run() {
        let reactor = MioReactor::try_new().unwrap();
        let (read_end, _write_end) = rustix::pipe::pipe().unwrap();
        let fired = Rc::new(Cell::new(0));
        reactor
            .register_reader(read_end.as_raw_fd(), counter_callback(&fired))
            .unwrap();
        reactor.stop_on_signals(&[SIGUSR1]).unwrap();
        assert_eq!(reactor.caught_signal(), None);

        // Handled on this thread before raise() returns, so the source is ready.
        signal_hook::low_level::raise(SIGUSR1).unwrap();
        reactor.run().unwrap();

        assert_eq!(reactor.caught_signal(), Some(SIGUSR1));
        assert_eq!(fired.get(), 0);
        assert!(reactor.has_reader(read_end.as_raw_fd()));
    }
}
