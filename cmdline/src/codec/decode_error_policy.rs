// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::DecodeErrorPolicy::{Replace, Strict};

/// What a text view does when it meets bytes that are invalid in its encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorPolicy {
    /// Substitute U+FFFD. Used for ttys so an interactive session survives bad input.
    Replace,
    /// Fail the read. Used for pipes and files so corruption surfaces early.
    Strict,
}

impl DecodeErrorPolicy {
    #[must_use]
    pub fn for_tty(is_tty: bool) -> Self { if is_tty { Replace } else { Strict } }
}
