// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! End-to-end tests for [`CmdlineTransport`].
//!
//! - [`test_transport_state_machine`] turns a [`MockReactor`] by hand over scripted raw
//!   streams, so every read, write and registration is deterministic.
//! - [`test_pipe_round_trip`] runs the real [`MioReactor`] over OS pipes.
//! - [`test_pty_terminal`] uses pseudo-terminals for raw mode and terminal detection.
//!
//! [`CmdlineTransport`]: crate::CmdlineTransport
//! [`MioReactor`]: crate::MioReactor
//! [`MockReactor`]: crate::test_fixtures::MockReactor

#[cfg(any(test, doc))]
pub mod test_pipe_round_trip;
#[cfg(any(test, doc))]
pub mod test_pty_terminal;
#[cfg(any(test, doc))]
pub mod test_transport_state_machine;
