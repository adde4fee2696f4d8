// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Doubles for driving the transport deterministically in tests: a reactor you turn by
//! hand, raw streams that replay a script, a protocol that records what it saw, and
//! pseudo-terminal pairs.

// Attach sources.
pub mod mock_reactor;
pub mod protocol_recorder;
pub mod pty_fixtures;
pub mod scripted_raw_stream;

// Re-export.
pub use mock_reactor::*;
pub use protocol_recorder::*;
pub use pty_fixtures::*;
pub use scripted_raw_stream::*;
