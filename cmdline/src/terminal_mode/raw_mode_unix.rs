// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Unix implementation using rustix's safe termios API.

// cspell:words termios tcgetattr tcsetattr icanon vmin vtime

use crate::CmdlineError;
use rustix::{fd::AsFd,
             termios::{self, LocalModes, OptionalActions, SpecialCodeIndex, Termios}};

/// Return from `read(2)` as soon as one byte is available.
pub const VMIN_RAW_MODE: u8 = 1;

/// No inter-byte timer.
pub const VTIME_RAW_MODE: u8 = 0;

/// Terminal attributes captured before [`enter_raw()`] changed them.
#[derive(Debug, Clone)]
pub struct SavedTerminalAttributes {
    termios: Termios,
}

impl SavedTerminalAttributes {
    #[must_use]
    pub fn termios(&self) -> &Termios { &self.termios }
}

/// Snapshot the terminal's attributes, then switch it to non-canonical input with
/// `VMIN=1, VTIME=0`. The change is applied after pending output drains.
///
/// # Errors
///
/// Returns [`CmdlineError::TerminalAttributes`] if the attributes cannot be read or
/// applied, for example because `fd` is not a terminal.
pub fn enter_raw(fd: impl AsFd) -> Result<SavedTerminalAttributes, CmdlineError> {
    let fd = fd.as_fd();
    let saved = termios::tcgetattr(fd).map_err(|errno| {
        CmdlineError::TerminalAttributes {
            action: "read",
            source: errno.into(),
        }
    })?;

    let mut raw = saved.clone();
    raw.local_modes.remove(LocalModes::ICANON);
    raw.special_codes[SpecialCodeIndex::VMIN] = VMIN_RAW_MODE;
    raw.special_codes[SpecialCodeIndex::VTIME] = VTIME_RAW_MODE;

    apply(fd, OptionalActions::Drain, &raw)?;
    Ok(SavedTerminalAttributes { termios: saved })
}

/// Put back the attributes captured by [`enter_raw()`]. Pending input is discarded.
///
/// # Errors
///
/// Returns [`CmdlineError::TerminalAttributes`] if the attributes cannot be applied.
pub fn restore(fd: impl AsFd, saved: &SavedTerminalAttributes) -> Result<(), CmdlineError> {
    apply(fd, OptionalActions::Flush, &saved.termios)
}

fn apply(
    fd: impl AsFd,
    when: OptionalActions,
    termios: &Termios,
) -> Result<(), CmdlineError> {
    termios::tcsetattr(fd, when, termios).map_err(|errno| {
        CmdlineError::TerminalAttributes {
            action: "apply",
            source: errno.into(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::open_pty_pair;
    use pretty_assertions::assert_eq;

    #[test]
    fn enter_and_restore_round_trip() {
        let pty = open_pty_pair().unwrap();
        let before = termios::tcgetattr(&pty.slave).unwrap();
        assert!(before.local_modes.contains(LocalModes::ICANON));

        let saved = enter_raw(&pty.slave).unwrap();
        let during = termios::tcgetattr(&pty.slave).unwrap();
        assert!(!during.local_modes.contains(LocalModes::ICANON));
        // Echo is left alone.
        assert_eq!(
            during.local_modes.contains(LocalModes::ECHO),
            before.local_modes.contains(LocalModes::ECHO)
        );
        assert_eq!(during.special_codes[SpecialCodeIndex::VMIN], VMIN_RAW_MODE);
        assert_eq!(during.special_codes[SpecialCodeIndex::VTIME], VTIME_RAW_MODE);

        restore(&pty.slave, &saved).unwrap();
        let after = termios::tcgetattr(&pty.slave).unwrap();
        assert_eq!(after.local_modes, before.local_modes);
        assert_eq!(
            after.special_codes[SpecialCodeIndex::VMIN],
            before.special_codes[SpecialCodeIndex::VMIN]
        );
    }

    #[test]
    fn pipes_are_not_terminals() {
        let (read_end, _write_end) = rustix::pipe::pipe().unwrap();
        assert!(matches!(
            enter_raw(&read_end),
            Err(CmdlineError::TerminalAttributes { action: "read", .. })
        ));
    }
}
