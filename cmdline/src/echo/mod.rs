// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The `cmdline_echo` demo: every line read from stdin is written back to stdout as its
//! debug representation. Useful for trying the transport against a real terminal, a
//! pipe, or a redirected file.

// Attach sources.
pub mod clap_config;
pub mod echo_protocol;
pub mod launcher;

// Re-export.
pub use clap_config::*;
pub use echo_protocol::*;
pub use launcher::*;
