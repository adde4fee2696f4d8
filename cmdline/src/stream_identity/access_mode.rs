// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::CmdlineError;
use rustix::{fd::AsFd, fs::OFlags};

/// Which directions a stream can move bytes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    #[must_use]
    pub fn can_read(self) -> bool { matches!(self, AccessMode::Read | AccessMode::ReadWrite) }

    #[must_use]
    pub fn can_write(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }

    /// Query `fcntl(F_GETFL)` for the descriptor's access bits. Returns [`None`] if the
    /// descriptor is not open.
    pub fn query(fd: impl AsFd) -> Option<Self> {
        let flags = rustix::fs::fcntl_getfl(fd).ok()?;
        Some(if flags.contains(OFlags::RDWR) {
            AccessMode::ReadWrite
        } else if flags.contains(OFlags::WRONLY) {
            AccessMode::Write
        } else {
            AccessMode::Read
        })
    }
}

/// A validated open mode, always stored in its canonical binary form (`"rb"`, `"wb"`,
/// `"r+b"`, `"ab"`, ...).
///
/// ```
/// use r3bl_cmdline::{AccessMode, OpenMode};
///
/// let mode = OpenMode::parse("w+t").unwrap();
/// assert_eq!(mode.as_str(), "w+b");
/// assert_eq!(mode.access(), AccessMode::ReadWrite);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMode {
    mode: String,
    access: AccessMode,
}

impl OpenMode {
    /// Parse a mode string: exactly one of `r`, `w`, `x`, `a`, optionally `+`, optionally
    /// one of `b` or `t`. No character may repeat.
    ///
    /// # Errors
    ///
    /// Returns [`CmdlineError::InvalidMode`] for anything else.
    pub fn parse(mode: &str) -> Result<Self, CmdlineError> {
        let invalid = || CmdlineError::InvalidMode {
            mode: mode.to_string(),
        };

        let mut primary = None;
        let mut plus = false;
        let mut kind = None;

        for ch in mode.chars() {
            match ch {
                'r' | 'w' | 'x' | 'a' if primary.is_none() => primary = Some(ch),
                '+' if !plus => plus = true,
                'b' | 't' if kind.is_none() => kind = Some(ch),
                _ => return Err(invalid()),
            }
        }

        let primary = primary.ok_or_else(invalid)?;
        let access = match (primary, plus) {
            (_, true) => AccessMode::ReadWrite,
            ('r', false) => AccessMode::Read,
            (_, false) => AccessMode::Write,
        };

        let mut canonical = String::with_capacity(3);
        canonical.push(primary);
        if plus {
            canonical.push('+');
        }
        canonical.push('b');

        Ok(Self {
            mode: canonical,
            access,
        })
    }

    /// The canonical mode for a bare access direction.
    #[must_use]
    pub fn from_access(access: AccessMode) -> Self {
        let mode = match access {
            AccessMode::Read => "rb",
            AccessMode::Write => "wb",
            AccessMode::ReadWrite => "r+b",
        };
        Self {
            mode: mode.to_string(),
            access,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str { &self.mode }

    #[must_use]
    pub fn access(&self) -> AccessMode { self.access }
}

impl std::fmt::Display for OpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("r", "rb", AccessMode::Read)]
    #[test_case("rb", "rb", AccessMode::Read)]
    #[test_case("rt", "rb", AccessMode::Read)]
    #[test_case("w", "wb", AccessMode::Write)]
    #[test_case("x", "xb", AccessMode::Write)]
    #[test_case("a", "ab", AccessMode::Write)]
    #[test_case("r+", "r+b", AccessMode::ReadWrite)]
    #[test_case("b+w", "w+b", AccessMode::ReadWrite)]
    #[test_case("a+t", "a+b", AccessMode::ReadWrite)]
    fn valid_modes(input: &str, canonical: &str, access: AccessMode) {
        let mode = OpenMode::parse(input).unwrap();
        assert_eq!(mode.as_str(), canonical);
        assert_eq!(mode.access(), access);
    }

    #[test_case("")]
    #[test_case("b")]
    #[test_case("+")]
    #[test_case("rw")]
    #[test_case("rr")]
    #[test_case("r++")]
    #[test_case("rbt")]
    #[test_case("rbb")]
    #[test_case("q")]
    #[test_case("rU")]
    fn invalid_modes(input: &str) {
        assert!(matches!(
            OpenMode::parse(input),
            Err(CmdlineError::InvalidMode { ref mode }) if mode == input
        ));
    }

    #[test]
    fn default_modes_from_access() {
        assert_eq!(OpenMode::from_access(AccessMode::Read).as_str(), "rb");
        assert_eq!(OpenMode::from_access(AccessMode::Write).as_str(), "wb");
        assert_eq!(OpenMode::from_access(AccessMode::ReadWrite).as_str(), "r+b");
    }

    #[test]
    fn query_pipe_ends() {
        let (read_end, write_end) = rustix::pipe::pipe().unwrap();
        assert_eq!(AccessMode::query(&read_end), Some(AccessMode::Read));
        assert_eq!(AccessMode::query(&write_end), Some(AccessMode::Write));
    }
}
