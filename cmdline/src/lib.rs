// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words termios ttyname

//! # `r3bl_cmdline`
//!
//! Terminal-aware, non-blocking, line-oriented stdio for interactive command line
//! programs. You hand it two handles (usually the process's `stdin` and `stdout`) and a
//! [`Protocol`]; it hands your protocol one decoded line at a time and accepts text
//! writes that are delivered whenever the output descriptor is ready.
//!
//! ```text
//! ┌──────────┐ readable ┌───────────────────┐ bytes  ┌───────────────────┐
//! │ Reactor  ├─────────▶│ CmdlineTransport  ├───────▶│ LineAssembler     │
//! │ (mio)    │ writable │  - OutboundQueue  │        │  + Incremental-   │
//! │          ├─────────▶│  - Incremental-   │        │    Decoder        │
//! │          │◀─────────┤    Encoder        │        └─────────┬─────────┘
//! └──────────┘ schedule └─────────▲─────────┘                  │ lines
//!               _soon             │ write(text)                ▼
//!                           ┌─────┴─────────────────────────────────┐
//!                           │ Protocol (your code)                  │
//!                           └───────────────────────────────────────┘
//! ```
//!
//! The pieces, leaves first:
//!
//! - [`stream_identity`] normalizes an arbitrary handle ([`StreamHandle`]) into a
//!   [`StreamDescriptor`]: descriptor, tty flag, encoding, and a consistent raw /
//!   buffered / text layer stack.
//! - [`codec`] provides the [`IncrementalDecoder`] and [`IncrementalEncoder`].
//! - [`terminal_mode`] switches a tty into non-canonical input and restores it.
//! - [`reactor`] defines the [`Reactor`] contract and ships [`MioReactor`].
//! - [`transport`] is the [`CmdlineTransport`] state machine and the [`Protocol`] trait.
//!
//! ## Usage
//!
//! ```no_run
//! use miette::IntoDiagnostic;
//! use r3bl_cmdline::{CmdlineTransport, MioReactor, Protocol, StreamHandle,
//!                    TransportConfig, connect_console};
//! use std::rc::Rc;
//!
//! #[derive(Default)]
//! struct Shout { transport: Option<CmdlineTransport> }
//!
//! impl Protocol for Shout {
//!     fn connection_made(&mut self, transport: CmdlineTransport) {
//!         self.transport = Some(transport);
//!     }
//!     fn data_received(&mut self, line: String) {
//!         if let Some(transport) = &self.transport {
//!             let _unused = transport.write(&format!("{}\n", line.to_uppercase()));
//!         }
//!     }
//! }
//!
//! # fn main() -> miette::Result<()> {
//! let reactor = Rc::new(MioReactor::try_new().into_diagnostic()?);
//! let (transport, _protocol) = connect_console(
//!     reactor.clone(),
//!     Shout::default,
//!     StreamHandle::stdin(),
//!     StreamHandle::stdout(),
//!     &TransportConfig::default(),
//! )?;
//! reactor.run().into_diagnostic()?;
//! transport.close()?;
//! # Ok(())
//! # }
//! ```

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules (re-exported below to provide clean public API).
pub mod codec;
pub mod common;
pub mod echo;
pub mod global_constants;
pub mod log;
pub mod reactor;
pub mod stream_identity;
pub mod terminal_mode;
pub mod test_fixtures;
pub mod transport;

// Re-export stable public API using glob imports for ergonomic, flat API surface.
pub use codec::*;
pub use common::*;
pub use global_constants::*;
pub use log::*;
pub use reactor::*;
pub use stream_identity::*;
pub use terminal_mode::*;
pub use transport::*;
