// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use rustix::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::rc::Rc;

/// An OS descriptor that several stream views can refer to.
///
/// Process stdio is borrowed for `'static` and never closed here. Anything else is an
/// [`OwnedFd`] behind an [`Rc`], closed when the last view drops it.
#[derive(Debug, Clone)]
pub enum SharedFd {
    Process(BorrowedFd<'static>),
    Owned(Rc<OwnedFd>),
}

impl SharedFd {
    #[must_use]
    pub fn stdin() -> Self { SharedFd::Process(rustix::stdio::stdin()) }

    #[must_use]
    pub fn stdout() -> Self { SharedFd::Process(rustix::stdio::stdout()) }

    #[must_use]
    pub fn owned(fd: OwnedFd) -> Self { SharedFd::Owned(Rc::new(fd)) }

    #[must_use]
    pub fn as_raw_fd(&self) -> RawFd { self.as_fd().as_raw_fd() }
}

impl AsFd for SharedFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            SharedFd::Process(fd) => *fd,
            SharedFd::Owned(fd) => fd.as_fd(),
        }
    }
}

impl From<OwnedFd> for SharedFd {
    fn from(fd: OwnedFd) -> Self { SharedFd::owned(fd) }
}
