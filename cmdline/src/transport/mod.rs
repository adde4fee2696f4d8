// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The transport state machine and the [`Protocol`] it drives.

// Attach sources.
pub mod cmdline_transport;
pub mod connect_console;
pub mod line_assembler;
pub mod outbound_queue;
pub mod protocol;
pub mod transport_config;

// Re-export.
pub use cmdline_transport::*;
pub use connect_console::*;
pub use line_assembler::*;
pub use outbound_queue::*;
pub use protocol::*;
pub use transport_config::*;

// Tests.
pub mod integration_tests;
