// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words openpt grantpt unlockpt ptsname noctty cloexec

use rustix::{fd::OwnedFd,
             fs::{Mode, OFlags},
             pty::OpenptFlags};
use std::io;

/// Both ends of a pseudo-terminal. The slave end is a real tty, so `isatty`,
/// `tcgetattr` and `ttyname` all work on it. Write to the master to "type" input.
#[derive(Debug)]
pub struct PtyPair {
    pub master: OwnedFd,
    pub slave: OwnedFd,
}

/// Open a new pseudo-terminal pair. Neither end becomes the controlling terminal.
///
/// # Errors
///
/// The OS ran out of ptys, or `/dev/ptmx` is not available.
pub fn open_pty_pair() -> io::Result<PtyPair> {
    let master =
        rustix::pty::openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY | OpenptFlags::CLOEXEC)?;
    rustix::pty::grantpt(&master)?;
    rustix::pty::unlockpt(&master)?;
    let name = rustix::pty::ptsname(&master, Vec::new())?;
    let slave = rustix::fs::open(
        name.as_c_str(),
        OFlags::RDWR | OFlags::NOCTTY | OFlags::CLOEXEC,
        Mode::empty(),
    )?;
    Ok(PtyPair { master, slave })
}

/// Open the slave end again, as a separate descriptor on the same device.
///
/// # Errors
///
/// The device could not be named or opened.
pub fn reopen_slave(pair: &PtyPair, flags: OFlags) -> io::Result<OwnedFd> {
    let name = rustix::pty::ptsname(&pair.master, Vec::new())?;
    Ok(rustix::fs::open(
        name.as_c_str(),
        flags | OFlags::NOCTTY | OFlags::CLOEXEC,
        Mode::empty(),
    )?)
}
