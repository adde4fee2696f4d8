// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Non-canonical ("cbreak-like") input for a tty, and putting it back afterwards.
//!
//! Unlike full raw mode this only clears `ICANON`: bytes are delivered as soon as they
//! are typed, while echo and signal generation (`Ctrl+C`) keep working.

// Attach sources.
pub mod raw_mode_unix;

// Re-export.
pub use raw_mode_unix::*;
