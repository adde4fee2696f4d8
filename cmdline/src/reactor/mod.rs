// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The event loop contract the transport is written against, plus a single-threaded
//! implementation on top of [`mio`].

// Attach sources.
pub mod mio_reactor;
pub mod reactor_api;

// Re-export.
pub use mio_reactor::*;
pub use reactor_api::*;
