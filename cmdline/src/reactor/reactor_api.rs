// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{io, os::fd::RawFd, rc::Rc};

/// Work to run on a later turn of the loop.
pub type DeferredTask = Box<dyn FnOnce()>;

/// Called each turn the descriptor is ready. An error stops the loop and is returned from
/// whatever drove the turn.
pub type ReadyCallback = Rc<dyn Fn() -> io::Result<()>>;

/// The slice of an event loop that [`CmdlineTransport`](crate::CmdlineTransport) uses.
///
/// Readiness is level-triggered: a callback keeps firing every turn for as long as the
/// descriptor stays ready and the callback stays registered. At most one reader and one
/// writer callback exist per descriptor; registering again replaces the previous one.
pub trait Reactor {
    /// Queue `task` to run on a later turn, in FIFO order. Never runs it synchronously.
    fn schedule_soon(&self, task: DeferredTask);

    /// # Errors
    ///
    /// The OS can refuse to watch a descriptor, for example `EPERM` for regular files.
    fn register_reader(&self, fd: RawFd, callback: ReadyCallback) -> io::Result<()>;

    /// # Errors
    ///
    /// See [`register_reader()`](Self::register_reader).
    fn register_writer(&self, fd: RawFd, callback: ReadyCallback) -> io::Result<()>;

    /// Returns `false` if no reader was registered.
    ///
    /// # Errors
    ///
    /// The OS failed to update its interest list.
    fn unregister_reader(&self, fd: RawFd) -> io::Result<bool>;

    /// Returns `false` if no writer was registered.
    ///
    /// # Errors
    ///
    /// The OS failed to update its interest list.
    fn unregister_writer(&self, fd: RawFd) -> io::Result<bool>;
}
