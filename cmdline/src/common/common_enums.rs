// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Control flow signal for loops.
///
/// Returned by [`MioReactor::run_once()`] so callers driving the reactor by hand know
/// whether another turn can make progress.
///
/// [`MioReactor::run_once()`]: crate::MioReactor::run_once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Continue to the next iteration.
    #[default]
    Continue,

    /// Stop processing and exit the loop.
    Stop,
}
