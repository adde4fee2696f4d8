// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{DeferredTask, Reactor, ReadyCallback};
use std::{cell::{Cell, RefCell},
          collections::{HashMap, VecDeque},
          io,
          os::fd::RawFd};

/// A [`Reactor`] that never polls. Tests decide when deferred tasks run and which
/// descriptor is "ready".
#[derive(Default)]
#[allow(missing_debug_implementations)]
pub struct MockReactor {
    deferred: RefCell<VecDeque<DeferredTask>>,
    readers: RefCell<HashMap<RawFd, ReadyCallback>>,
    writers: RefCell<HashMap<RawFd, ReadyCallback>>,
    refusal: Cell<Option<io::ErrorKind>>,
}

impl MockReactor {
    /// Make every later registration fail with `kind`, the way `epoll` refuses regular
    /// files with `EPERM`.
    pub fn refuse_registrations(&self, kind: io::ErrorKind) { self.refusal.set(Some(kind)); }

    #[must_use]
    pub fn pending_tasks(&self) -> usize { self.deferred.borrow().len() }

    /// Run deferred tasks until none are left, including ones they schedule. Returns how
    /// many ran.
    pub fn run_deferred(&self) -> usize {
        let mut count = 0;
        loop {
            let task = self.deferred.borrow_mut().pop_front();
            let Some(task) = task else {
                return count;
            };
            task();
            count += 1;
        }
    }

    /// Invoke the reader callback for `fd` once. Returns `Ok(false)` if none is
    /// registered.
    ///
    /// # Errors
    ///
    /// Whatever the callback returns.
    pub fn fire_reader(&self, fd: RawFd) -> io::Result<bool> {
        let callback = self.readers.borrow().get(&fd).cloned();
        callback.map_or(Ok(false), |it| it().map(|()| true))
    }

    /// Invoke the writer callback for `fd` once. Returns `Ok(false)` if none is
    /// registered.
    ///
    /// # Errors
    ///
    /// Whatever the callback returns.
    pub fn fire_writer(&self, fd: RawFd) -> io::Result<bool> {
        let callback = self.writers.borrow().get(&fd).cloned();
        callback.map_or(Ok(false), |it| it().map(|()| true))
    }

    #[must_use]
    pub fn is_reader_registered(&self, fd: RawFd) -> bool {
        self.readers.borrow().contains_key(&fd)
    }

    #[must_use]
    pub fn is_writer_registered(&self, fd: RawFd) -> bool {
        self.writers.borrow().contains_key(&fd)
    }

    fn check_refusal(&self) -> io::Result<()> {
        match self.refusal.get() {
            Some(kind) => Err(kind.into()),
            None => Ok(()),
        }
    }
}

impl Reactor for MockReactor {
    fn schedule_soon(&self, task: DeferredTask) { self.deferred.borrow_mut().push_back(task); }

    fn register_reader(&self, fd: RawFd, callback: ReadyCallback) -> io::Result<()> {
        self.check_refusal()?;
        self.readers.borrow_mut().insert(fd, callback);
        Ok(())
    }

    fn register_writer(&self, fd: RawFd, callback: ReadyCallback) -> io::Result<()> {
        self.check_refusal()?;
        self.writers.borrow_mut().insert(fd, callback);
        Ok(())
    }

    fn unregister_reader(&self, fd: RawFd) -> io::Result<bool> {
        Ok(self.readers.borrow_mut().remove(&fd).is_some())
    }

    fn unregister_writer(&self, fd: RawFd) -> io::Result<bool> {
        Ok(self.writers.borrow_mut().remove(&fd).is_some())
    }
}
